//! `unlink`, `rmdir`.

use super::prelude::*;

fn resolve_child(fs: &FsState, parent: u64, name: &OsStr) -> Option<(String, String)> {
    let parent_path = fs.path_of(parent)?.to_string();
    let child_path = FsState::child_mount_path(&parent_path, name);
    let remote_absolute = full_path(&fs.remote_root, &child_path)?;
    Some((child_path, remote_absolute))
}

pub fn unlink(fs: &mut FsState, parent: u64, name: &OsStr, reply: ReplyEmpty) {
    let Some((child_path, remote_absolute)) = resolve_child(fs, parent, name) else {
        reply.error(ENOENT);
        return;
    };

    let command = format!("rm -f {}", shell_quote(&remote_absolute));
    match fs.session.exec(&command) {
        Ok(_) => {
            fs.forget_path(&child_path);
            reply.ok();
        }
        Err(e) => reply.error(e.to_errno()),
    }
}

pub fn rmdir(fs: &mut FsState, parent: u64, name: &OsStr, reply: ReplyEmpty) {
    let Some((child_path, remote_absolute)) = resolve_child(fs, parent, name) else {
        reply.error(ENOENT);
        return;
    };

    let command = format!("rmdir {}", shell_quote(&remote_absolute));
    match fs.session.exec(&command) {
        Ok(_) => {
            fs.forget_path(&child_path);
            reply.ok();
        }
        Err(e) => reply.error(e.to_errno()),
    }
}
