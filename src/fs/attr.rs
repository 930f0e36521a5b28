//! `getattr`, `setattr` (covering `chmod`/`chown`/`truncate`/`utime`), and
//! `access` — the single-path metadata operations of §4.F.

use fuser::{FileAttr, TimeOrNow};
use std::os::unix::fs::MetadataExt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::prelude::*;

/// Builds a `FileAttr` straight from the local scratch file's own metadata,
/// for replies that must reflect a change (e.g. `ftruncate`) not yet flushed
/// to the remote host (4.F "Data operations" — local until `release`).
fn attr_from_local_metadata(ino: u64, meta: &std::fs::Metadata) -> FileAttr {
    FileAttr {
        ino,
        size: meta.size(),
        blocks: meta.blocks(),
        atime: UNIX_EPOCH + Duration::from_secs(meta.atime().max(0) as u64),
        mtime: UNIX_EPOCH + Duration::from_secs(meta.mtime().max(0) as u64),
        ctime: UNIX_EPOCH + Duration::from_secs(meta.ctime().max(0) as u64),
        crtime: UNIX_EPOCH,
        kind: FileType::RegularFile,
        perm: (meta.mode() & 0o7777) as u16,
        nlink: meta.nlink() as u32,
        uid: meta.uid(),
        gid: meta.gid(),
        rdev: meta.rdev() as u32,
        blksize: meta.blksize() as u32,
        flags: 0,
    }
}

fn reply_stat(fs: &FsState, ino: u64, reply: ReplyAttr) {
    let Some(remote_path) = fs.remote_path(ino) else {
        reply.error(ENOENT);
        return;
    };
    match remote_stat::stat(fs.session.as_ref(), &remote_path) {
        Ok(record) => reply.attr(&fs.tunables.attr_ttl(), &attr_from_record(ino, &record)),
        Err(e) => reply.error(e.to_errno()),
    }
}

pub fn getattr(fs: &mut FsState, ino: u64, reply: ReplyAttr) {
    reply_stat(fs, ino, reply);
}

fn epoch_seconds(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

fn time_or_now_to_secs(t: TimeOrNow) -> i64 {
    match t {
        TimeOrNow::SpecificTime(t) => epoch_seconds(t),
        TimeOrNow::Now => epoch_seconds(SystemTime::now()),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn setattr(
    fs: &mut FsState,
    ino: u64,
    mode: Option<u32>,
    uid: Option<u32>,
    gid: Option<u32>,
    size: Option<u64>,
    atime: Option<TimeOrNow>,
    mtime: Option<TimeOrNow>,
    fh: Option<u64>,
    reply: ReplyAttr,
) {
    let Some(remote_path) = fs.remote_path(ino) else {
        reply.error(ENOENT);
        return;
    };

    if let Some(size) = size {
        if let Some(fh) = fh {
            // `ftruncate`: operates on the already-materialised scratch file
            // directly, no remote traffic (4.F "Data operations").
            let result = fs.handles.with_mut(fh, |handle| -> Result<(), CoreError> {
                let file = handle.as_file().ok_or_else(|| CoreError::Argument("ftruncate on a directory handle".into()))?;
                file.set_len(size).map_err(CoreError::from)
            });
            match result {
                Some(Ok(())) => {}
                Some(Err(e)) => {
                    reply.error(e.to_errno());
                    return;
                }
                None => {
                    reply.error(EINVAL);
                    return;
                }
            }
        } else if let Err(e) = truncate_by_path(fs, &remote_path, size) {
            reply.error(e.to_errno());
            return;
        }
    }

    if let Some(mode) = mode {
        let command = format!("chmod {:o} {}", mode & 0o7777, shell_quote(&remote_path));
        if let Err(e) = fs.session.exec(&command) {
            reply.error(e.to_errno());
            return;
        }
    }

    if uid.is_some() || gid.is_some() {
        let spec = match (uid, gid) {
            (Some(u), Some(g)) => format!("{u}:{g}"),
            (Some(u), None) => format!("{u}"),
            (None, Some(g)) => format!(":{g}"),
            (None, None) => unreachable!(),
        };
        let command = format!("chown {spec} {}", shell_quote(&remote_path));
        if let Err(e) = fs.session.exec(&command) {
            reply.error(e.to_errno());
            return;
        }
    }

    if let Some(atime) = atime {
        let command = format!(
            "touch -a -d @{} {}",
            time_or_now_to_secs(atime),
            shell_quote(&remote_path)
        );
        if let Err(e) = fs.session.exec(&command) {
            reply.error(e.to_errno());
            return;
        }
    }

    if let Some(mtime) = mtime {
        let command = format!(
            "touch -m -d @{} {}",
            time_or_now_to_secs(mtime),
            shell_quote(&remote_path)
        );
        if let Err(e) = fs.session.exec(&command) {
            reply.error(e.to_errno());
            return;
        }
    }

    match fh {
        // A remote stat here would still report the pre-truncation size:
        // the scratch file's truncation isn't flushed until `release`. Reply
        // from the handle's own metadata instead so the size is current.
        Some(fh) => {
            let result = fs.handles.with(fh, |handle| -> Result<FileAttr, CoreError> {
                let file = handle
                    .as_file()
                    .ok_or_else(|| CoreError::Argument("setattr on a directory handle".into()))?;
                let meta = file.metadata().map_err(CoreError::from)?;
                Ok(attr_from_local_metadata(ino, &meta))
            });
            match result {
                Some(Ok(attr)) => reply.attr(&fs.tunables.attr_ttl(), &attr),
                Some(Err(e)) => reply.error(e.to_errno()),
                None => reply.error(EINVAL),
            }
        }
        None => reply_stat(fs, ino, reply),
    }
}

fn truncate_by_path(fs: &FsState, remote_path: &str, size: u64) -> Result<(), CoreError> {
    let command = format!("truncate -s {size} {}", shell_quote(remote_path));
    fs.session.exec(&command)?;
    Ok(())
}

pub fn access(fs: &mut FsState, ino: u64, mask: i32, reply: ReplyEmpty) {
    let Some(remote_path) = fs.remote_path(ino) else {
        reply.error(ENOENT);
        return;
    };
    // `test` reports accessibility as an exit status; over a command
    // channel that only returns captured stdout, the absence-of-error
    // convention (4.B) is all we have: probe with a fixed stat instead and
    // treat a failed stat as inaccessible.
    let _ = mask;
    match remote_stat::stat(fs.session.as_ref(), &remote_path) {
        Ok(_) => reply.ok(),
        Err(e) => reply.error(e.to_errno()),
    }
}
