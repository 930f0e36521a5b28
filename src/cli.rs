//! Command-line surface (§6): `<program> [mount options...]
//! user@host:/remote/root /local/mount /path/to/logfile`.
//!
//! The last three positional arguments are the remote endpoint, the local
//! mount point, and the log sink path; anything before them is passed
//! through to the kernel-facing collaborator (`fuser`) as a raw mount
//! option.

use std::path::PathBuf;

use clap::Parser;

use crate::error::CoreError;

#[derive(Parser, Debug)]
#[command(
    name = "remote-fs",
    version,
    about = "Mounts a directory tree reachable over SSH as a local FUSE filesystem"
)]
pub struct Args {
    /// Mount options passed through to the kernel-facing collaborator,
    /// e.g. `-o allow_other`. Never interpreted by the core itself.
    #[arg(short = 'o', long = "option", value_name = "OPTION")]
    pub mount_options: Vec<String>,

    /// Optional TOML file of tunables (cache size, command buffer cap,
    /// kernel TTLs). Falls back to built-in defaults when absent.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// `user@host:/remote/root`.
    pub endpoint: String,

    /// Local directory to mount the remote tree onto.
    pub mountpoint: PathBuf,

    /// File to which structured trace events are written.
    pub logfile: PathBuf,
}

impl Args {
    /// Parses `argv`, mapping clap's own exit-on-error behaviour into the
    /// core's own argument-error type so callers (and tests) can observe it
    /// uniformly rather than having the process exit from inside parsing.
    pub fn parse_from_args<I, T>(argv: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Args::try_parse_from(argv).map_err(|e| CoreError::Argument(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_positional_arguments() {
        let args = Args::parse_from_args([
            "remote-fs",
            "alice@example.com:/srv/data",
            "/mnt/remote",
            "/var/log/remote-fs.log",
        ])
        .unwrap();
        assert_eq!(args.endpoint, "alice@example.com:/srv/data");
        assert_eq!(args.mountpoint, PathBuf::from("/mnt/remote"));
        assert_eq!(args.logfile, PathBuf::from("/var/log/remote-fs.log"));
        assert!(args.mount_options.is_empty());
    }

    #[test]
    fn collects_repeated_mount_options() {
        let args = Args::parse_from_args([
            "remote-fs",
            "-o",
            "allow_other",
            "-o",
            "default_permissions",
            "alice@example.com:/srv/data",
            "/mnt/remote",
            "/var/log/remote-fs.log",
        ])
        .unwrap();
        assert_eq!(args.mount_options, vec!["allow_other", "default_permissions"]);
    }

    #[test]
    fn missing_positional_arguments_is_an_argument_error() {
        let err = Args::parse_from_args(["remote-fs", "alice@example.com:/srv/data"]).unwrap_err();
        assert!(matches!(err, CoreError::Argument(_)));
    }
}
