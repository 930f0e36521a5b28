//! `open`, `read`, `write`, `flush`, `fsync`, `release` — the data
//! operations of §4.F. Everything past `open` touches only the local
//! scratch file; no remote traffic happens until `release` drives the
//! cache's ref count to zero.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};

use libc::EBADF;

use super::prelude::*;
use crate::handle::FileHandle;

pub fn open(fs: &mut FsState, ino: u64, flags: i32, reply: ReplyOpen) {
    let Some(remote_path) = fs.remote_path(ino) else {
        reply.error(ENOENT);
        return;
    };

    let local_path = match fs.cache.cache_open(fs.session.as_ref(), &remote_path) {
        Ok(path) => path,
        Err(e) => {
            reply.error(e.to_errno());
            return;
        }
    };

    match OpenOptions::new().read(true).write(true).open(&local_path) {
        Ok(file) => {
            let fh = fs.handles.insert(FileHandle::File { remote_path, file });
            reply.opened(fh, 0);
        }
        Err(e) => {
            // The scratch file was materialised but couldn't be reopened
            // locally; undo the cache_open so no entry is left dangling.
            let _ = fs.cache.cache_close(fs.session.as_ref(), &remote_path);
            reply.error(e.raw_os_error().unwrap_or(EIO));
        }
    }

    let _ = flags;
}

pub fn read(fs: &mut FsState, fh: u64, offset: i64, size: u32, reply: ReplyData) {
    let result = fs.handles.with_mut(fh, |handle| -> std::io::Result<Vec<u8>> {
        let file = handle.as_file_mut().ok_or(std::io::ErrorKind::InvalidInput)?;
        file.seek(SeekFrom::Start(offset.max(0) as u64))?;
        let mut buf = vec![0u8; size as usize];
        let read = file.read(&mut buf)?;
        buf.truncate(read);
        Ok(buf)
    });

    match result {
        Some(Ok(buf)) => reply.data(&buf),
        Some(Err(e)) => reply.error(e.raw_os_error().unwrap_or(EIO)),
        None => reply.error(EBADF),
    }
}

pub fn write(fs: &mut FsState, fh: u64, offset: i64, data: &[u8], reply: ReplyWrite) {
    let result = fs.handles.with_mut(fh, |handle| -> std::io::Result<u32> {
        let file = handle.as_file_mut().ok_or(std::io::ErrorKind::InvalidInput)?;
        file.seek(SeekFrom::Start(offset.max(0) as u64))?;
        file.write_all(data)?;
        Ok(data.len() as u32)
    });

    match result {
        Some(Ok(written)) => reply.written(written),
        Some(Err(e)) => reply.error(e.raw_os_error().unwrap_or(EIO)),
        None => reply.error(EBADF),
    }
}

pub fn flush(fs: &mut FsState, fh: u64, reply: ReplyEmpty) {
    let result = fs.handles.with_mut(fh, |handle| -> std::io::Result<()> {
        let file = handle.as_file_mut().ok_or(std::io::ErrorKind::InvalidInput)?;
        file.sync_data()
    });

    match result {
        Some(Ok(())) => reply.ok(),
        Some(Err(e)) => reply.error(e.raw_os_error().unwrap_or(EIO)),
        None => reply.ok(), // flush on a directory handle is a no-op, not an error
    }
}

pub fn fsync(fs: &mut FsState, fh: u64, reply: ReplyEmpty) {
    flush(fs, fh, reply);
}

pub fn release(fs: &mut FsState, fh: u64, reply: ReplyEmpty) {
    let Some(handle) = fs.handles.remove(fh) else {
        reply.error(EBADF);
        return;
    };
    let remote_path = handle.remote_path().to_string();
    drop(handle);

    match fs.cache.cache_close(fs.session.as_ref(), &remote_path) {
        Ok(()) => reply.ok(),
        Err(e) => reply.error(e.to_errno()),
    }
}
