//! `lookup`, `opendir`, `readdir`, `releasedir` — directory enumeration and
//! the one data-bearing "metadata-only" operation, `lookup`, which resolves
//! a name within a parent into an inode plus attributes.

use super::prelude::*;
use crate::handle::{DirEntry, DirState, FileHandle};
use fuser::FileType;
use libc::EBADF;

fn file_type_char(c: &str) -> FileType {
    match c {
        "d" => FileType::Directory,
        "l" => FileType::Symlink,
        "c" => FileType::CharDevice,
        "b" => FileType::BlockDevice,
        "p" => FileType::NamedPipe,
        "s" => FileType::Socket,
        _ => FileType::RegularFile,
    }
}

/// Lists a remote directory's immediate children in one remote command,
/// returning name and coarse type per entry (§4.F: "issue a single remote
/// command constructed from a fixed template").
fn list_remote_dir(fs: &FsState, remote_path: &str) -> Result<Vec<DirEntry>, CoreError> {
    let command = format!(
        "find {} -mindepth 1 -maxdepth 1 -printf '%f\\t%y\\n'",
        shell_quote(remote_path)
    );
    let output = fs.session.exec(&command)?;
    let text = String::from_utf8_lossy(&output);
    let mut entries = Vec::new();
    for line in text.lines() {
        let Some((name, type_char)) = line.rsplit_once('\t') else {
            continue;
        };
        entries.push(DirEntry {
            name: name.to_string(),
            kind: file_type_char(type_char),
        });
    }
    Ok(entries)
}

pub fn lookup(fs: &mut FsState, parent: u64, name: &OsStr, reply: ReplyEntry) {
    let Some(parent_path) = fs.path_of(parent).map(str::to_string) else {
        reply.error(ENOENT);
        return;
    };
    let child_path = FsState::child_mount_path(&parent_path, name);
    let Some(remote_absolute) = full_path(&fs.remote_root, &child_path) else {
        reply.error(ENOENT);
        return;
    };

    match remote_stat::stat(fs.session.as_ref(), &remote_absolute) {
        Ok(record) => {
            let ino = fs.intern(&child_path);
            reply.entry(&fs.tunables.entry_ttl(), &attr_from_record(ino, &record), 0);
        }
        Err(e) => reply.error(e.to_errno()),
    }
}

pub fn opendir(fs: &mut FsState, ino: u64, _flags: i32, reply: ReplyOpen) {
    let Some(remote_path) = fs.remote_path(ino) else {
        reply.error(ENOENT);
        return;
    };
    match list_remote_dir(fs, &remote_path) {
        Ok(entries) => {
            let handle = FileHandle::Dir {
                remote_path,
                state: DirState { entries },
            };
            let fh = fs.handles.insert(handle);
            reply.opened(fh, 0);
        }
        Err(e) => reply.error(e.to_errno()),
    }
}

pub fn readdir(fs: &mut FsState, fh: u64, offset: i64, reply: ReplyDirectory) {
    let Some(parent_path) = fs.handles.with(fh, |h| h.remote_path().to_string()) else {
        reply.error(EBADF);
        return;
    };
    let Some(mount_relative_parent) = strip_remote_root(&fs.remote_root, &parent_path) else {
        reply.error(EIO);
        return;
    };

    let entries = match fs.handles.with(fh, |h| match h {
        FileHandle::Dir { state, .. } => Some(state.entries.clone()),
        FileHandle::File { .. } => None,
    }) {
        Some(Some(entries)) => entries,
        _ => {
            reply.error(EBADF);
            return;
        }
    };

    for (i, entry) in entries.iter().enumerate().skip(offset as usize) {
        let child_path = FsState::child_mount_path(&mount_relative_parent, OsStr::new(&entry.name));
        let ino = fs.intern(&child_path);
        let buffer_full = reply.add(ino, (i + 1) as i64, entry.kind, &entry.name);
        if buffer_full {
            reply.ok();
            return;
        }
    }

    reply.ok();
}

pub fn releasedir(fs: &mut FsState, fh: u64, reply: ReplyEmpty) {
    fs.handles.remove(fh);
    reply.ok();
}

fn strip_remote_root(remote_root: &str, remote_absolute: &str) -> Option<String> {
    let rest = remote_absolute.strip_prefix(remote_root)?;
    if rest.is_empty() {
        Some("/".to_string())
    } else {
        Some(rest.to_string())
    }
}
