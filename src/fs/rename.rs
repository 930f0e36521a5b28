//! `rename`, `link`, `symlink`, `readlink`.

use super::prelude::*;

pub fn rename(fs: &mut FsState, parent: u64, name: &OsStr, newparent: u64, newname: &OsStr, reply: ReplyEmpty) {
    let Some(parent_path) = fs.path_of(parent).map(str::to_string) else {
        reply.error(ENOENT);
        return;
    };
    let Some(newparent_path) = fs.path_of(newparent).map(str::to_string) else {
        reply.error(ENOENT);
        return;
    };
    let old_child = FsState::child_mount_path(&parent_path, name);
    let new_child = FsState::child_mount_path(&newparent_path, newname);
    let Some(old_remote) = full_path(&fs.remote_root, &old_child) else {
        reply.error(ENOENT);
        return;
    };
    let Some(new_remote) = full_path(&fs.remote_root, &new_child) else {
        reply.error(ENOENT);
        return;
    };

    let command = format!("mv -T {} {}", shell_quote(&old_remote), shell_quote(&new_remote));
    match fs.session.exec(&command) {
        Ok(_) => {
            fs.rename_path(&old_child, &new_child);
            reply.ok();
        }
        Err(e) => reply.error(e.to_errno()),
    }
}

pub fn link(fs: &mut FsState, ino: u64, newparent: u64, newname: &OsStr, reply: ReplyEntry) {
    let Some(remote_target) = fs.remote_path(ino) else {
        reply.error(ENOENT);
        return;
    };
    let Some(newparent_path) = fs.path_of(newparent).map(str::to_string) else {
        reply.error(ENOENT);
        return;
    };
    let new_child = FsState::child_mount_path(&newparent_path, newname);
    let Some(new_remote) = full_path(&fs.remote_root, &new_child) else {
        reply.error(ENOENT);
        return;
    };

    let command = format!("ln {} {}", shell_quote(&remote_target), shell_quote(&new_remote));
    if let Err(e) = fs.session.exec(&command) {
        reply.error(e.to_errno());
        return;
    }

    match remote_stat::stat(fs.session.as_ref(), &new_remote) {
        Ok(record) => {
            let new_ino = fs.intern(&new_child);
            reply.entry(&fs.tunables.entry_ttl(), &attr_from_record(new_ino, &record), 0);
        }
        Err(e) => reply.error(e.to_errno()),
    }
}

pub fn symlink(fs: &mut FsState, parent: u64, link_name: &OsStr, target: &std::path::Path, reply: ReplyEntry) {
    let Some(parent_path) = fs.path_of(parent).map(str::to_string) else {
        reply.error(ENOENT);
        return;
    };
    let child_path = FsState::child_mount_path(&parent_path, link_name);
    let Some(remote_absolute) = full_path(&fs.remote_root, &child_path) else {
        reply.error(ENOENT);
        return;
    };

    let command = format!(
        "ln -s {} {}",
        shell_quote(&target.to_string_lossy()),
        shell_quote(&remote_absolute)
    );
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

pub fn readlink(fs: &mut FsState, ino: u64, reply: ReplyData) {
    let Some(remote_path) = fs.remote_path(ino) else {
        reply.error(ENOENT);
        return;
    };

    let command = format!("readlink {}", shell_quote(&remote_path));
    match fs.session.exec(&command) {
        Ok(output) => {
            let target = String::from_utf8_lossy(&output);
            reply.data(target.trim_end_matches('\n').as_bytes());
        }
        Err(e) => reply.error(e.to_errno()),
    }
}
