//! `statfs`.

use super::prelude::*;

pub fn statfs(fs: &mut FsState, ino: u64, reply: ReplyStatfs) {
    let Some(remote_path) = fs.remote_path(ino) else {
        reply.error(ENOENT);
        return;
    };

    let command = format!("stat -f -c \"%s %b %f %a %c %d\" {}", shell_quote(&remote_path));
    let output = match fs.session.exec(&command) {
        Ok(output) => output,
        Err(e) => {
            reply.error(e.to_errno());
            return;
        }
    };

    let text = String::from_utf8_lossy(&output);
    let mut fields = text.trim().split_whitespace();
    let parsed: Option<(u64, u64, u64, u64, u64, u64)> = (|| {
        Some((
            fields.next()?.parse().ok()?,
            fields.next()?.parse().ok()?,
            fields.next()?.parse().ok()?,
            fields.next()?.parse().ok()?,
            fields.next()?.parse().ok()?,
            fields.next()?.parse().ok()?,
        ))
    })();

    match parsed {
        Some((bsize, blocks, bfree, bavail, files, ffree)) => {
            reply.statfs(blocks, bfree, bavail, files, ffree, bsize as u32, 255, bsize as u32);
        }
        None => reply.error(EIO),
    }
}
