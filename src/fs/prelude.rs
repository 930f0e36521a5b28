//! Common imports shared by every sibling module under `fs/`.

pub use fuser::{
    FileType, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen,
    ReplyStatfs, ReplyWrite, ReplyXattr,
};

pub use libc::{EEXIST, EINVAL, EIO, ENOENT, ENOTDIR, ENOTEMPTY};
#[cfg(not(target_os = "macos"))]
pub use libc::ENODATA;
#[cfg(target_os = "macos")]
pub use libc::ENOATTR as ENODATA;

pub use std::ffi::OsStr;

pub use crate::error::CoreError;
pub use crate::fs::{attr_from_record, FsState};
pub use crate::path::full_path;
pub use crate::remote::stat as remote_stat;
pub use crate::shell::shell_quote;
