//! `setxattr`, `getxattr`, `listxattr`, `removexattr`.
//!
//! The spec pins the `stat`/copy wire formats but leaves extended-attribute
//! commands as "a fixed template" without naming one; these use the GNU
//! `attr` package's `setfattr`/`getfattr`, the standard Linux remote-shell
//! tools for the job (see DESIGN.md).

use super::prelude::*;

pub fn setxattr(fs: &mut FsState, ino: u64, name: &OsStr, value: &[u8], reply: ReplyEmpty) {
    let Some(remote_path) = fs.remote_path(ino) else {
        reply.error(ENOENT);
        return;
    };
    let name = name.to_string_lossy();
    let value = String::from_utf8_lossy(value);
    let command = format!(
        "setfattr -n {} -v {} {}",
        shell_quote(&name),
        shell_quote(&value),
        shell_quote(&remote_path)
    );
    match fs.session.exec(&command) {
        Ok(_) => reply.ok(),
        Err(e) => reply.error(e.to_errno()),
    }
}

pub fn getxattr(fs: &mut FsState, ino: u64, name: &OsStr, size: u32, reply: ReplyXattr) {
    let Some(remote_path) = fs.remote_path(ino) else {
        reply.error(ENOENT);
        return;
    };
    let name = name.to_string_lossy();
    let command = format!(
        "getfattr --only-values -n {} {}",
        shell_quote(&name),
        shell_quote(&remote_path)
    );
    match fs.session.exec(&command) {
        Ok(value) if value.is_empty() => reply.error(ENODATA),
        Ok(value) => {
            if size == 0 {
                reply.size(value.len() as u32);
            } else if value.len() > size as usize {
                reply.error(libc::ERANGE);
            } else {
                reply.data(&value);
            }
        }
        Err(e) => reply.error(e.to_errno()),
    }
}

pub fn listxattr(fs: &mut FsState, ino: u64, size: u32, reply: ReplyXattr) {
    let Some(remote_path) = fs.remote_path(ino) else {
        reply.error(ENOENT);
        return;
    };
    let command = format!("getfattr -m - --absolute-names {}", shell_quote(&remote_path));
    let output = match fs.session.exec(&command) {
        Ok(output) => output,
        Err(e) => {
            reply.error(e.to_errno());
            return;
        }
    };

    let text = String::from_utf8_lossy(&output);
    let mut names: Vec<u8> = Vec::new();
    for line in text.lines() {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let name = line.split('=').next().unwrap_or(line);
        names.extend_from_slice(name.as_bytes());
        names.push(0);
    }

    if size == 0 {
        reply.size(names.len() as u32);
    } else if names.len() > size as usize {
        reply.error(libc::ERANGE);
    } else {
        reply.data(&names);
    }
}

pub fn removexattr(fs: &mut FsState, ino: u64, name: &OsStr, reply: ReplyEmpty) {
    let Some(remote_path) = fs.remote_path(ino) else {
        reply.error(ENOENT);
        return;
    };
    let name = name.to_string_lossy();
    let command = format!("setfattr -x {} {}", shell_quote(&name), shell_quote(&remote_path));
    match fs.session.exec(&command) {
        Ok(_) => reply.ok(),
        Err(e) => reply.error(e.to_errno()),
    }
}
