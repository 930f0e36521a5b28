//! `create`, `mkdir`, `mknod` — the name-creating metadata operations.
//!
//! `mknod` dispatches on the requested file type rather than assuming a
//! regular file, a case the distilled wire format left implicit but which a
//! complete remote-command mapping must cover.

use std::fs::OpenOptions;

use super::prelude::*;
use crate::handle::FileHandle;

fn resolve_child(fs: &FsState, parent: u64, name: &OsStr) -> Option<(String, String)> {
    let parent_path = fs.path_of(parent)?.to_string();
    let child_path = FsState::child_mount_path(&parent_path, name);
    let remote_absolute = full_path(&fs.remote_root, &child_path)?;
    Some((child_path, remote_absolute))
}

pub fn create(fs: &mut FsState, parent: u64, name: &OsStr, mode: u32, _flags: i32, reply: ReplyCreate) {
    let Some((child_path, remote_absolute)) = resolve_child(fs, parent, name) else {
        reply.error(ENOENT);
        return;
    };

    let command = format!(
        "touch {} && chmod {:o} {}",
        shell_quote(&remote_absolute),
        mode & 0o7777,
        shell_quote(&remote_absolute)
    );
    if let Err(e) = fs.session.exec(&command) {
        reply.error(e.to_errno());
        return;
    }

    let local_path = match fs.cache.cache_open(fs.session.as_ref(), &remote_absolute) {
        Ok(path) => path,
        Err(e) => {
            reply.error(e.to_errno());
            return;
        }
    };

    let file = match OpenOptions::new().read(true).write(true).open(&local_path) {
        Ok(file) => file,
        Err(e) => {
            let _ = fs.cache.cache_close(fs.session.as_ref(), &remote_absolute);
            reply.error(e.raw_os_error().unwrap_or(EIO));
            return;
        }
    };

    match remote_stat::stat(fs.session.as_ref(), &remote_absolute) {
        Ok(record) => {
            let ino = fs.intern(&child_path);
            let fh = fs.handles.insert(FileHandle::File {
                remote_path: remote_absolute,
                file,
            });
            reply.created(&fs.tunables.attr_ttl(), &attr_from_record(ino, &record), 0, fh, 0);
        }
        Err(e) => reply.error(e.to_errno()),
    }
}

pub fn mkdir(fs: &mut FsState, parent: u64, name: &OsStr, mode: u32, reply: ReplyEntry) {
    let Some((child_path, remote_absolute)) = resolve_child(fs, parent, name) else {
        reply.error(ENOENT);
        return;
    };

    let command = format!("mkdir -m {:o} {}", mode & 0o7777, shell_quote(&remote_absolute));
    if let Err(e) = fs.session.exec(&command) {
        reply.error(e.to_errno());
        return;
    }

    match remote_stat::stat(fs.session.as_ref(), &remote_absolute) {
        Ok(record) => {
            let ino = fs.intern(&child_path);
            reply.entry(&fs.tunables.entry_ttl(), &attr_from_record(ino, &record), 0);
        }
        Err(e) => reply.error(e.to_errno()),
    }
}

pub fn mknod(fs: &mut FsState, parent: u64, name: &OsStr, mode: u32, rdev: u32, reply: ReplyEntry) {
    let Some((child_path, remote_absolute)) = resolve_child(fs, parent, name) else {
        reply.error(ENOENT);
        return;
    };

    let perm = mode & 0o7777;
    let quoted = shell_quote(&remote_absolute);
    let command = match mode & libc::S_IFMT {
        libc::S_IFIFO => format!("mkfifo -m {perm:o} {quoted}"),
        libc::S_IFCHR => format!("mknod -m {perm:o} {quoted} c {} {}", major(rdev), minor(rdev)),
        libc::S_IFBLK => format!("mknod -m {perm:o} {quoted} b {} {}", major(rdev), minor(rdev)),
        _ => format!("touch {quoted} && chmod {perm:o} {quoted}"),
    };

    if let Err(e) = fs.session.exec(&command) {
        reply.error(e.to_errno());
        return;
    }

    match remote_stat::stat(fs.session.as_ref(), &remote_absolute) {
        Ok(record) => {
            let ino = fs.intern(&child_path);
            reply.entry(&fs.tunables.entry_ttl(), &attr_from_record(ino, &record), 0);
        }
        Err(e) => reply.error(e.to_errno()),
    }
}

fn major(rdev: u32) -> u32 {
    (rdev >> 8) & 0xfff
}

fn minor(rdev: u32) -> u32 {
    rdev & 0xff
}
