//! 4.C Remote Copy Channel.
//!
//! Streams a whole file in either direction between local memory and a
//! remote path, using the secure-copy subprotocol the transport provides.
//! Allocation, negotiation, per-chunk I/O, and trailing protocol-ack
//! failures all collapse into a single opaque per-transfer error; the
//! channel is always closed on both the success and failure paths.

use std::io::{Read, Write};

use crate::error::CoreError;

/// Pulls the full contents of the remote file at `remote_path`.
pub fn copy_in(session: &ssh2::Session, remote_path: &str) -> Result<Vec<u8>, CoreError> {
    let (mut channel, stat) = session
        .scp_recv(remote_path.as_ref())
        .map_err(|e| CoreError::RemoteCopy(format!("pull request failed for {remote_path}: {e}")))?;

    let size = stat.size() as usize;
    let mut buf = vec![0u8; size];
    channel
        .read_exact(&mut buf)
        .map_err(|e| CoreError::RemoteCopy(format!("read failed for {remote_path}: {e}")))?;

    // Consume the trailing EOF-request the protocol sends after the payload.
    let _ = channel.send_eof();
    let _ = channel.wait_eof();
    let _ = channel.close();
    let _ = channel.wait_close();

    Ok(buf)
}

/// Pushes `data` to a new remote file at `remote_path`, mode `rw` for the
/// owner only.
pub fn copy_out(session: &ssh2::Session, remote_path: &str, data: &[u8]) -> Result<(), CoreError> {
    let mut channel = session
        .scp_send(remote_path.as_ref(), 0o600, data.len() as u64, None)
        .map_err(|e| CoreError::RemoteCopy(format!("push init failed for {remote_path}: {e}")))?;

    channel
        .write_all(data)
        .map_err(|e| CoreError::RemoteCopy(format!("write failed for {remote_path}: {e}")))?;

    channel
        .send_eof()
        .map_err(|e| CoreError::RemoteCopy(format!("eof failed for {remote_path}: {e}")))?;
    let _ = channel.wait_eof();
    let _ = channel.close();
    let _ = channel.wait_close();

    Ok(())
}

#[cfg(test)]
mod tests {
    // As with `command.rs`, the `ssh2::Session`-backed transfer functions
    // require a live transport and are exercised indirectly through the
    // `RemoteSession` fakes used by `cache.rs`'s tests.
}
