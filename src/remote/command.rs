//! 4.B Remote Command Channel.
//!
//! Runs a single short textual command over a fresh, session-multiplexed
//! `ssh2` channel and captures its output into a bounded buffer. Exactly one
//! command per channel; the channel is always closed, whether the command
//! succeeded or failed.

use std::io::Read;

use crate::error::CoreError;

/// Executes `command` on `session`, returning its captured stdout.
///
/// Every failure mode enumerated in 4.B — channel allocation, channel open,
/// request-exec, and read failures — collapses into a single
/// `CoreError::RemoteCommand`; the caller never sees which step failed,
/// matching the spec's "opaque remote command failed status".
///
/// Output is capped at `max_bytes`: unlike the C original's fixed
/// `BUF_SIZE` buffer (a latent truncation bug noted in the Design Notes),
/// overflowing the cap is a hard `CoreError::Parse` rather than a silent
/// truncation.
pub fn exec(session: &ssh2::Session, command: &str, max_bytes: usize) -> Result<Vec<u8>, CoreError> {
    let mut channel = session
        .channel_session()
        .map_err(|e| CoreError::RemoteCommand(format!("channel allocation failed: {e}")))?;

    channel
        .exec(command)
        .map_err(|e| CoreError::RemoteCommand(format!("request-exec failed: {e}")))?;

    let mut output = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let read = channel
            .read(&mut chunk)
            .map_err(|e| CoreError::RemoteCommand(format!("read failed: {e}")))?;
        if read == 0 {
            break;
        }
        output.extend_from_slice(&chunk[..read]);
        if output.len() > max_bytes {
            // Drain and close the channel before reporting the overflow so
            // the remote side doesn't block on a half-read pipe.
            let _ = channel.close();
            let _ = channel.wait_close();
            return Err(CoreError::Parse(format!(
                "remote command output exceeded {max_bytes} bytes"
            )));
        }
    }

    let _ = channel.send_eof();
    let _ = channel.close();
    let _ = channel.wait_close();

    Ok(output)
}

#[cfg(test)]
mod tests {
    // `exec` talks directly to an `ssh2::Session`, which requires a live
    // transport to construct; it is exercised through `RemoteSession` fakes
    // in `cache.rs` and `stat.rs` instead of here.
}
