//! Open file/directory handles.
//!
//! The source encodes both a local file descriptor and an open-directory
//! iterator into the same unsigned integer field and casts between them
//! (Design Notes, "Raw handles as integers"). This carries an explicit
//! tagged variant instead, and nothing in the crate casts a `Dir` handle
//! into a `File` one or vice versa.

use std::collections::HashMap;
use std::fs::File;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use fuser::FileType;

/// One directory entry as returned by a remote listing: just enough for the
/// kernel's `readdir` filler, which only needs a name and a coarse type —
/// full attributes are fetched lazily through a subsequent `lookup`.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub kind: FileType,
}

/// Iterator state for an open directory: the full listing, fetched once at
/// `opendir`. Resumable `readdir` calls after the filler signals saturation
/// (§4.F "Special cases") are driven by the kernel-supplied offset, not by
/// mutable state here.
#[derive(Debug)]
pub struct DirState {
    pub entries: Vec<DirEntry>,
}

/// A single open handle: either a materialised scratch file or directory
/// iterator state. The remote path is retained on both variants so
/// `release`/`releasedir` can address the cache table without re-deriving
/// it from the mount-relative path.
pub enum FileHandle {
    File { remote_path: String, file: File },
    Dir { remote_path: String, state: DirState },
}

impl FileHandle {
    /// Borrows the open file, or `None` if this handle is a directory.
    pub fn as_file(&self) -> Option<&File> {
        match self {
            FileHandle::File { file, .. } => Some(file),
            FileHandle::Dir { .. } => None,
        }
    }

    pub fn as_file_mut(&mut self) -> Option<&mut File> {
        match self {
            FileHandle::File { file, .. } => Some(file),
            FileHandle::Dir { .. } => None,
        }
    }

    pub fn as_dir_mut(&mut self) -> Option<&mut DirState> {
        match self {
            FileHandle::Dir { state, .. } => Some(state),
            FileHandle::File { .. } => None,
        }
    }

    pub fn remote_path(&self) -> &str {
        match self {
            FileHandle::File { remote_path, .. } => remote_path,
            FileHandle::Dir { remote_path, .. } => remote_path,
        }
    }
}

/// Issues and owns small integer handle ids, exactly the "small integer
/// referring to the local scratch file" the dispatcher is required to hand
/// back after a successful `open` (§6).
#[derive(Default)]
pub struct HandleTable {
    next_id: AtomicU64,
    handles: Mutex<HashMap<u64, FileHandle>>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            handles: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, handle: FileHandle) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handles.lock().unwrap().insert(id, handle);
        id
    }

    pub fn remove(&self, id: u64) -> Option<FileHandle> {
        self.handles.lock().unwrap().remove(&id)
    }

    pub fn with<R>(&self, id: u64, f: impl FnOnce(&FileHandle) -> R) -> Option<R> {
        self.handles.lock().unwrap().get(&id).map(f)
    }

    pub fn with_mut<R>(&self, id: u64, f: impl FnOnce(&mut FileHandle) -> R) -> Option<R> {
        self.handles.lock().unwrap().get_mut(&id).map(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn file_handle_does_not_expose_dir_accessors() {
        let f = NamedTempFile::new().unwrap();
        let handle = FileHandle::File {
            remote_path: "/a".to_string(),
            file: f.reopen().unwrap(),
        };
        assert!(handle.as_file().is_some());
    }

    #[test]
    fn dir_handle_does_not_expose_file_accessors() {
        let mut handle = FileHandle::Dir {
            remote_path: "/a".to_string(),
            state: DirState { entries: vec![] },
        };
        assert!(handle.as_file().is_none());
        assert!(handle.as_dir_mut().is_some());
    }

    #[test]
    fn handle_table_round_trips_ids() {
        let table = HandleTable::new();
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"x").unwrap();
        let id = table.insert(FileHandle::File {
            remote_path: "/a".to_string(),
            file: f.reopen().unwrap(),
        });
        assert!(table.with(id, |h| h.remote_path().to_string()).is_some());
        assert!(table.remove(id).is_some());
        assert!(table.remove(id).is_none());
    }
}
