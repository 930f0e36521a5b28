//! Error kinds surfaced by the core, and their mapping onto `libc` errno
//! values returned to the FUSE kernel collaborator.

use thiserror::Error;

/// One variant per error kind in the error handling design.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("session error: {0}")]
    Session(String),

    #[error("remote command failed: {0}")]
    RemoteCommand(String),

    #[error("remote copy failed: {0}")]
    RemoteCopy(String),

    #[error("failed to parse remote stat output: {0}")]
    Parse(String),

    #[error("cache is full")]
    CacheFull,

    #[error("local I/O error: {0}")]
    LocalIo(#[from] std::io::Error),

    #[error("no such cache entry for {0}")]
    NotCached(String),

    #[error("remote path not found: {0}")]
    NotFound(String),
}

impl CoreError {
    /// Maps this error onto the single negative errno the dispatcher
    /// returns to the kernel collaborator. No operation leaks a partial
    /// result alongside a failure: this is always the entire reply.
    pub fn to_errno(&self) -> i32 {
        match self {
            CoreError::Argument(_) => libc::EINVAL,
            CoreError::Session(_) => libc::EIO,
            CoreError::RemoteCommand(_) => libc::EIO,
            CoreError::RemoteCopy(_) => libc::EIO,
            CoreError::Parse(_) => libc::EIO,
            // Suggested mapping for cache exhaustion (Design Notes, open
            // question on `bb_open` failure): surface as "too many open
            // files" rather than propagating the internal failure code.
            CoreError::CacheFull => libc::EMFILE,
            CoreError::LocalIo(e) => e.raw_os_error().unwrap_or(libc::EIO),
            CoreError::NotCached(_) => libc::EBADF,
            CoreError::NotFound(_) => libc::ENOENT,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
