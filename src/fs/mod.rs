//! Root of the FUSE filesystem implementation.
//!
//! Defines `FsState`, the state shared by every dispatched operation, and
//! `FsWrapper`'s `impl Filesystem`, which is a pure router: every kernel
//! call lands here and is immediately forwarded to the matching function in
//! one of the sibling modules (`attr`, `dir`, `data`, `create`, `delete`,
//! `rename`, `xattr`, `statfs`).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, ReplyXattr, Request, TimeOrNow,
};
use std::ffi::OsStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::cache::CacheTable;
use crate::config::Tunables;
use crate::handle::HandleTable;
use crate::remote::{AttributeRecord, RemoteSession};

pub mod attr;
pub mod create;
pub mod data;
pub mod delete;
pub mod dir;
pub mod prelude;
pub mod rename;
pub mod statfs;
pub mod xattr;

/// Inode 1 is always the mount root and always maps to mount-relative path
/// `"/"`; nothing ever reassigns it.
pub const ROOT_INODE: u64 = 1;

/// All state one dispatched operation needs: the remote session, the
/// whole-file cache, the handle table, the kernel-TTL tunables, and the
/// inode bookkeeping the path-based remote protocol needs to satisfy
/// `fuser`'s inode-based trait (Design Notes, "Global mutable state" — this
/// is the explicit context value threaded into every operation instead of a
/// hidden singleton).
pub struct FsState {
    pub session: Arc<dyn RemoteSession>,
    pub remote_root: String,
    pub cache: CacheTable,
    pub handles: HandleTable,
    pub tunables: Tunables,
    inode_to_path: HashMap<u64, String>,
    path_to_inode: HashMap<String, u64>,
    next_inode: u64,
}

impl FsState {
    pub fn new(session: Arc<dyn RemoteSession>, remote_root: String, cache: CacheTable, tunables: Tunables) -> Self {
        let mut inode_to_path = HashMap::new();
        let mut path_to_inode = HashMap::new();
        inode_to_path.insert(ROOT_INODE, "/".to_string());
        path_to_inode.insert("/".to_string(), ROOT_INODE);

        Self {
            session,
            remote_root,
            cache,
            handles: HandleTable::new(),
            tunables,
            inode_to_path,
            path_to_inode,
            next_inode: ROOT_INODE + 1,
        }
    }

    /// The mount-relative path previously interned for `ino`, if any.
    pub fn path_of(&self, ino: u64) -> Option<&str> {
        self.inode_to_path.get(&ino).map(String::as_str)
    }

    /// Finds or assigns the inode for a mount-relative path, so that
    /// repeated lookups of the same path are stable for the life of the
    /// mount (fuser requires inode identity to remain valid between
    /// `lookup` and subsequent operations on the same entry).
    pub fn intern(&mut self, mount_relative: &str) -> u64 {
        if let Some(&ino) = self.path_to_inode.get(mount_relative) {
            return ino;
        }
        let ino = self.next_inode;
        self.next_inode += 1;
        self.inode_to_path.insert(ino, mount_relative.to_string());
        self.path_to_inode.insert(mount_relative.to_string(), ino);
        ino
    }

    /// Composes the remote absolute path for `ino`, or `None` if `ino` is
    /// unknown or the composition overflows `PATH_MAX` (4.A).
    pub fn remote_path(&self, ino: u64) -> Option<String> {
        crate::path::full_path(&self.remote_root, self.path_of(ino)?)
    }

    /// Joins a parent's mount-relative path with a child name.
    pub fn child_mount_path(parent: &str, name: &OsStr) -> String {
        let name = name.to_string_lossy();
        if parent == "/" {
            format!("/{name}")
        } else {
            format!("{parent}/{name}")
        }
    }

    pub fn forget_path(&mut self, mount_relative: &str) {
        if let Some(ino) = self.path_to_inode.remove(mount_relative) {
            self.inode_to_path.remove(&ino);
        }
    }

    /// Rewrites the interned path for `ino` and every descendant whose path
    /// is prefixed by the old path, following a successful `rename`.
    pub fn rename_path(&mut self, old: &str, new: &str) {
        let affected: Vec<(u64, String)> = self
            .inode_to_path
            .iter()
            .filter(|(_, p)| p.as_str() == old || p.starts_with(&format!("{old}/")))
            .map(|(&ino, p)| (ino, p.clone()))
            .collect();

        for (ino, old_path) in affected {
            let new_path = if old_path == old {
                new.to_string()
            } else {
                format!("{new}{}", &old_path[old.len()..])
            };
            self.path_to_inode.remove(&old_path);
            self.inode_to_path.insert(ino, new_path.clone());
            self.path_to_inode.insert(new_path, ino);
        }
    }
}

/// Builds a kernel `FileAttr` from a remote [`AttributeRecord`]. `ino` is
/// supplied separately since the record itself carries the remote `dev`/
/// `ino`, which are meaningless to the local kernel module.
pub fn attr_from_record(ino: u64, record: &AttributeRecord) -> FileAttr {
    let kind = file_type_from_mode(record.mode);
    FileAttr {
        ino,
        size: record.size.max(0) as u64,
        blocks: record.blocks.max(0) as u64,
        atime: systemtime_from_secs(record.atime),
        mtime: systemtime_from_secs(record.mtime),
        ctime: systemtime_from_secs(record.ctime),
        crtime: UNIX_EPOCH,
        kind,
        perm: (record.mode & 0o7777) as u16,
        nlink: record.nlink,
        uid: record.uid,
        gid: record.gid,
        rdev: record.rdev as u32,
        blksize: record.blksize.max(0) as u32,
        flags: 0,
    }
}

fn file_type_from_mode(mode: u32) -> FileType {
    match mode & libc::S_IFMT {
        libc::S_IFDIR => FileType::Directory,
        libc::S_IFLNK => FileType::Symlink,
        libc::S_IFCHR => FileType::CharDevice,
        libc::S_IFBLK => FileType::BlockDevice,
        libc::S_IFIFO => FileType::NamedPipe,
        libc::S_IFSOCK => FileType::Socket,
        _ => FileType::RegularFile,
    }
}

fn systemtime_from_secs(secs: i64) -> SystemTime {
    if secs >= 0 {
        UNIX_EPOCH + Duration::from_secs(secs as u64)
    } else {
        UNIX_EPOCH - Duration::from_secs((-secs) as u64)
    }
}

#[derive(Clone)]
pub struct FsWrapper(pub Arc<Mutex<FsState>>);

impl Filesystem for FsWrapper {
    fn init(&mut self, _req: &Request<'_>, _config: &mut fuser::KernelConfig) -> Result<(), libc::c_int> {
        tracing::info!("filesystem initialised");
        Ok(())
    }

    fn destroy(&mut self) {
        tracing::info!("filesystem unmounted");
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let mut fs = self.0.lock().unwrap();
        dir::lookup(&mut fs, parent, name, reply);
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        let mut fs = self.0.lock().unwrap();
        attr::getattr(&mut fs, ino, reply);
    }

    #[allow(clippy::too_many_arguments)]
    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let mut fs = self.0.lock().unwrap();
        attr::setattr(&mut fs, ino, mode, uid, gid, size, atime, mtime, fh, reply);
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
        let mut fs = self.0.lock().unwrap();
        rename::readlink(&mut fs, ino, reply);
    }

    fn mknod(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        rdev: u32,
        reply: ReplyEntry,
    ) {
        let mut fs = self.0.lock().unwrap();
        create::mknod(&mut fs, parent, name, mode, rdev, reply);
    }

    fn mkdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, mode: u32, _umask: u32, reply: ReplyEntry) {
        let mut fs = self.0.lock().unwrap();
        create::mkdir(&mut fs, parent, name, mode, reply);
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        delete::unlink(&mut fs, parent, name, reply);
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        delete::rmdir(&mut fs, parent, name, reply);
    }

    fn symlink(&mut self, _req: &Request<'_>, parent: u64, link_name: &OsStr, target: &std::path::Path, reply: ReplyEntry) {
        let mut fs = self.0.lock().unwrap();
        rename::symlink(&mut fs, parent, link_name, target, reply);
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let mut fs = self.0.lock().unwrap();
        rename::rename(&mut fs, parent, name, newparent, newname, reply);
    }

    fn link(&mut self, _req: &Request<'_>, ino: u64, newparent: u64, newname: &OsStr, reply: ReplyEntry) {
        let mut fs = self.0.lock().unwrap();
        rename::link(&mut fs, ino, newparent, newname, reply);
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let mut fs = self.0.lock().unwrap();
        data::open(&mut fs, ino, flags, reply);
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let mut fs = self.0.lock().unwrap();
        data::read(&mut fs, fh, offset, size, reply);
    }

    #[allow(clippy::too_many_arguments)]
    fn write(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        data_buf: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let mut fs = self.0.lock().unwrap();
        data::write(&mut fs, fh, offset, data_buf, reply);
    }

    fn flush(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        data::flush(&mut fs, fh, reply);
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        let mut fs = self.0.lock().unwrap();
        data::release(&mut fs, fh, reply);
    }

    fn fsync(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, _datasync: bool, reply: ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        data::fsync(&mut fs, fh, reply);
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let mut fs = self.0.lock().unwrap();
        dir::opendir(&mut fs, ino, flags, reply);
    }

    fn readdir(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, offset: i64, reply: ReplyDirectory) {
        let mut fs = self.0.lock().unwrap();
        dir::readdir(&mut fs, fh, offset, reply);
    }

    fn releasedir(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, _flags: i32, reply: ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        dir::releasedir(&mut fs, fh, reply);
    }

    fn fsyncdir(&mut self, _req: &Request<'_>, _ino: u64, _fh: u64, _datasync: bool, reply: ReplyEmpty) {
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyStatfs) {
        let mut fs = self.0.lock().unwrap();
        statfs::statfs(&mut fs, ino, reply);
    }

    fn setxattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        name: &OsStr,
        value: &[u8],
        _flags: i32,
        _position: u32,
        reply: ReplyEmpty,
    ) {
        let mut fs = self.0.lock().unwrap();
        xattr::setxattr(&mut fs, ino, name, value, reply);
    }

    fn getxattr(&mut self, _req: &Request<'_>, ino: u64, name: &OsStr, size: u32, reply: ReplyXattr) {
        let mut fs = self.0.lock().unwrap();
        xattr::getxattr(&mut fs, ino, name, size, reply);
    }

    fn listxattr(&mut self, _req: &Request<'_>, ino: u64, size: u32, reply: ReplyXattr) {
        let mut fs = self.0.lock().unwrap();
        xattr::listxattr(&mut fs, ino, size, reply);
    }

    fn removexattr(&mut self, _req: &Request<'_>, ino: u64, name: &OsStr, reply: ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        xattr::removexattr(&mut fs, ino, name, reply);
    }

    fn access(&mut self, _req: &Request<'_>, ino: u64, mask: i32, reply: ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        attr::access(&mut fs, ino, mask, reply);
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        flags: i32,
        reply: ReplyCreate,
    ) {
        let mut fs = self.0.lock().unwrap();
        create::create(&mut fs, parent, name, mode, flags, reply);
    }
}
