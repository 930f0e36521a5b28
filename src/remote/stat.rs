//! 4.D Remote Metadata Probe.
//!
//! Parses the output of two fixed `stat` commands into a structured
//! [`AttributeRecord`]. All twelve fields of the first query and the one
//! field of the second must parse; a partial parse is an error with no
//! partial write to the record.

use crate::error::CoreError;
use crate::remote::session::RemoteSession;
use crate::shell::shell_quote;

/// A structured file-status record populated verbatim from remote `stat`
/// output (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeRecord {
    pub dev: u64,
    pub ino: u64,
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u64,
    pub size: i64,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
    pub blocks: i64,
    pub blksize: i64,
}

fn stat_command(remote_absolute: &str) -> String {
    format!(
        "stat -c \"%d %i %f %h %u %g %t %s %X %Y %Z %b\" {}",
        shell_quote(remote_absolute)
    )
}

fn statfs_command(remote_absolute: &str) -> String {
    format!("stat -f -c \"%s\" {}", shell_quote(remote_absolute))
}

/// Parses the whitespace-separated twelve-field output of the first `stat`
/// command, in the literal order the command string produces:
/// `dev ino mode nlink uid gid rdev size atime mtime ctime blocks`.
fn parse_stat_fields(output: &str) -> Result<(u64, u64, u32, u32, u32, u32, u64, i64, i64, i64, i64, i64), CoreError> {
    let mut fields = output.split_whitespace();
    let mut next = || {
        fields
            .next()
            .ok_or_else(|| CoreError::Parse(format!("expected 12 fields, got fewer: {output:?}")))
    };

    let dev = next()?.parse::<u64>().map_err(|e| CoreError::Parse(e.to_string()))?;
    let ino = next()?.parse::<u64>().map_err(|e| CoreError::Parse(e.to_string()))?;
    let mode = u32::from_str_radix(next()?, 16).map_err(|e| CoreError::Parse(e.to_string()))?;
    let nlink = next()?.parse::<u32>().map_err(|e| CoreError::Parse(e.to_string()))?;
    let uid = next()?.parse::<u32>().map_err(|e| CoreError::Parse(e.to_string()))?;
    let gid = next()?.parse::<u32>().map_err(|e| CoreError::Parse(e.to_string()))?;
    let rdev = u64::from_str_radix(next()?, 16).map_err(|e| CoreError::Parse(e.to_string()))?;
    let size = next()?.parse::<i64>().map_err(|e| CoreError::Parse(e.to_string()))?;
    let atime = next()?.parse::<i64>().map_err(|e| CoreError::Parse(e.to_string()))?;
    let mtime = next()?.parse::<i64>().map_err(|e| CoreError::Parse(e.to_string()))?;
    let ctime = next()?.parse::<i64>().map_err(|e| CoreError::Parse(e.to_string()))?;
    let blocks = next()?.parse::<i64>().map_err(|e| CoreError::Parse(e.to_string()))?;

    if fields.next().is_some() {
        return Err(CoreError::Parse(format!("expected exactly 12 fields: {output:?}")));
    }

    Ok((dev, ino, mode, nlink, uid, gid, rdev, size, atime, mtime, ctime, blocks))
}

/// Issues both remote `stat` commands via the Command Channel and composes
/// the result. Any exec failure or parse failure yields an error; no
/// partially populated record is ever returned.
pub fn stat(session: &dyn RemoteSession, remote_absolute: &str) -> Result<AttributeRecord, CoreError> {
    let output = session.exec(&stat_command(remote_absolute))?;
    let output = String::from_utf8_lossy(&output);
    let trimmed = output.trim_end_matches('\0').trim();
    // A remote `stat` on a path that doesn't exist writes its complaint to
    // stderr and leaves stdout empty; the command channel only captures
    // stdout (4.B), so empty output is the observable signature of "not
    // found" and is reported distinctly from a malformed-but-present reply.
    if trimmed.is_empty() {
        return Err(CoreError::NotFound(remote_absolute.to_string()));
    }
    let (dev, ino, mode, nlink, uid, gid, rdev, size, atime, mtime, ctime, blocks) = parse_stat_fields(trimmed)?;

    let blksize_output = session.exec(&statfs_command(remote_absolute))?;
    let blksize_output = String::from_utf8_lossy(&blksize_output);
    let blksize = blksize_output
        .trim_end_matches('\0')
        .trim()
        .parse::<i64>()
        .map_err(|e| CoreError::Parse(format!("filesystem block size: {e}")))?;

    Ok(AttributeRecord {
        dev,
        ino,
        mode,
        nlink,
        uid,
        gid,
        rdev,
        size,
        atime,
        mtime,
        ctime,
        blocks,
        blksize,
    })
}

/// Renders an [`AttributeRecord`] the way the two fixed `stat` commands
/// would, for round-trip testing (§8: `stat_parse(stat_format(r)) == r`).
#[cfg(test)]
fn stat_format(r: &AttributeRecord) -> (String, String) {
    (
        format!(
            "{} {} {:x} {} {} {} {:x} {} {} {} {} {}",
            r.dev, r.ino, r.mode, r.nlink, r.uid, r.gid, r.rdev, r.size, r.atime, r.mtime, r.ctime, r.blocks
        ),
        format!("{}", r.blksize),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::session::FakeSession;

    fn sample_record() -> AttributeRecord {
        AttributeRecord {
            dev: 64512,
            ino: 131081,
            mode: 0o100644,
            nlink: 1,
            uid: 1000,
            gid: 1000,
            rdev: 0,
            size: 10,
            atime: 1_700_000_000,
            mtime: 1_700_000_001,
            ctime: 1_700_000_002,
            blocks: 8,
            blksize: 4096,
        }
    }

    #[test]
    fn stat_round_trip() {
        let record = sample_record();
        let (stat_output, statfs_output) = stat_format(&record);

        let fake = FakeSession::new();
        fake.set_command_response(&stat_command("/root/a.txt"), stat_output);
        fake.set_command_response(&statfs_command("/root/a.txt"), statfs_output);

        let parsed = stat(&fake, "/root/a.txt").unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn attribute_round_trip_scenario() {
        // §8 scenario 1: size 10, mode 0100644, uid/gid 1000.
        let record = AttributeRecord {
            size: 10,
            mode: 0o100644,
            uid: 1000,
            gid: 1000,
            ..sample_record()
        };
        let (stat_output, statfs_output) = stat_format(&record);
        let fake = FakeSession::new();
        fake.set_command_response(&stat_command("/root/a.txt"), stat_output);
        fake.set_command_response(&statfs_command("/root/a.txt"), statfs_output);

        let parsed = stat(&fake, "/root/a.txt").unwrap();
        assert_eq!(parsed.size, 10);
        assert_eq!(parsed.mode, 0o100644);
        assert_eq!(parsed.uid, 1000);
        assert_eq!(parsed.gid, 1000);
    }

    #[test]
    fn eleven_tokens_is_a_parse_error() {
        let fake = FakeSession::new();
        fake.set_command_response(
            &stat_command("/root/a.txt"),
            "64512 131081 81a4 1 1000 1000 0 10 1700000000 1700000001 1700000002".to_string(),
        );
        fake.set_command_response(&statfs_command("/root/a.txt"), "4096".to_string());

        let err = stat(&fake, "/root/a.txt").unwrap_err();
        assert!(matches!(err, CoreError::Parse(_)));
    }

    #[test]
    fn thirteen_tokens_is_also_a_parse_error() {
        let fake = FakeSession::new();
        fake.set_command_response(
            &stat_command("/root/a.txt"),
            "64512 131081 81a4 1 1000 1000 0 10 1700000000 1700000001 1700000002 8 99".to_string(),
        );
        fake.set_command_response(&statfs_command("/root/a.txt"), "4096".to_string());

        let err = stat(&fake, "/root/a.txt").unwrap_err();
        assert!(matches!(err, CoreError::Parse(_)));
    }
}
