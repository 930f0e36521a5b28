//! 4.E Whole-File Cache.
//!
//! Maps remote absolute paths to local scratch files with reference counts:
//! materialises on first open, flushes and discards on last close. See §8 for
//! the invariants this module is built to satisfy.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::CoreError;
use crate::remote::RemoteSession;

/// One currently-materialised remote file.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub remote_path: String,
    pub local_path: PathBuf,
    pub ref_count: usize,
}

struct Inner {
    entries: HashMap<String, CacheEntry>,
    max: usize,
}

/// `remote_path -> CacheEntry`, bounded at `max` simultaneously live entries
/// (§3, `CACHE_MAX`). All lookup-plus-mutation happens under one lock,
/// matching §5's "single mutual-exclusion region spanning lookup-plus-
/// mutation".
pub struct CacheTable {
    inner: Mutex<Inner>,
    scratch_dir: PathBuf,
    next_scratch_id: AtomicU64,
}

impl CacheTable {
    pub fn new(max: usize, scratch_dir: PathBuf) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                max,
            }),
            scratch_dir,
            next_scratch_id: AtomicU64::new(0),
        }
    }

    fn fresh_scratch_path(&self) -> PathBuf {
        let id = self.next_scratch_id.fetch_add(1, Ordering::Relaxed);
        self.scratch_dir.join(format!("remote-fs-{}-{id}", std::process::id()))
    }

    /// `cache_open`: returns the local scratch path backing `remote_path`,
    /// materialising it via `copy_in` on first open.
    ///
    /// A failed materialisation leaves no entry behind (§7 policy): the
    /// scratch file is written before the entry is inserted, so any I/O or
    /// remote-copy failure simply returns an error with the table untouched.
    pub fn cache_open(&self, session: &dyn RemoteSession, remote_path: &str) -> Result<PathBuf, CoreError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(entry) = inner.entries.get_mut(remote_path) {
            entry.ref_count += 1;
            return Ok(entry.local_path.clone());
        }

        if inner.entries.len() >= inner.max {
            return Err(CoreError::CacheFull);
        }

        let local_path = self.fresh_scratch_path();
        let contents = session.copy_in(remote_path)?;
        fs::write(&local_path, &contents)?;

        inner.entries.insert(
            remote_path.to_string(),
            CacheEntry {
                remote_path: remote_path.to_string(),
                local_path: local_path.clone(),
                ref_count: 1,
            },
        );

        Ok(local_path)
    }

    /// `cache_close`: decrements the entry's ref count; on reaching zero,
    /// flushes the scratch file back via `copy_out`, removes the entry, and
    /// unlinks the scratch file regardless of flush outcome (a failed flush
    /// still must not leave a stale entry, per §7).
    pub fn cache_close(&self, session: &dyn RemoteSession, remote_path: &str) -> Result<(), CoreError> {
        let local_path = {
            let mut inner = self.inner.lock().unwrap();
            let entry = inner
                .entries
                .get_mut(remote_path)
                .ok_or_else(|| CoreError::NotCached(remote_path.to_string()))?;
            entry.ref_count -= 1;
            if entry.ref_count > 0 {
                return Ok(());
            }
            let local_path = entry.local_path.clone();
            inner.entries.remove(remote_path);
            local_path
        };

        let contents = fs::read(&local_path)?;
        let flush_result = session.copy_out(remote_path, &contents);
        let _ = fs::remove_file(&local_path);
        flush_result
    }

    /// Current number of live entries, for tests and `statfs`-adjacent
    /// introspection.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up the local scratch path for an already-open remote path
    /// without touching the ref count, for data operations that hold a
    /// handle but need to re-derive the path (e.g. `fgetattr`).
    pub fn local_path_of(&self, remote_path: &str) -> Option<PathBuf> {
        self.inner
            .lock()
            .unwrap()
            .entries
            .get(remote_path)
            .map(|e| e.local_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::FakeSession;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_fixture(session: &FakeSession, remote_path: &str, contents: &[u8]) {
        session.set_file(remote_path, contents.to_vec());
    }

    #[test]
    fn first_open_materialises_from_remote() {
        let dir = tempdir().unwrap();
        let table = CacheTable::new(2, dir.path().to_path_buf());
        let session = FakeSession::new();
        write_fixture(&session, "/root/b.txt", b"hello");

        let local = table.cache_open(&session, "/root/b.txt").unwrap();
        assert_eq!(fs::read(&local).unwrap(), b"hello");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn second_open_coalesces_ref_count_and_shares_path() {
        let dir = tempdir().unwrap();
        let table = CacheTable::new(2, dir.path().to_path_buf());
        let session = FakeSession::new();
        write_fixture(&session, "/root/b.txt", b"hello");

        let first = table.cache_open(&session, "/root/b.txt").unwrap();
        let second = table.cache_open(&session, "/root/b.txt").unwrap();
        assert_eq!(first, second);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn write_back_flushes_only_on_last_close() {
        let dir = tempdir().unwrap();
        let table = CacheTable::new(2, dir.path().to_path_buf());
        let session = FakeSession::new();
        write_fixture(&session, "/root/b.txt", b"hello");

        let local = table.cache_open(&session, "/root/b.txt").unwrap();
        table.cache_open(&session, "/root/b.txt").unwrap();

        fs::write(&local, b"WORLD").unwrap();

        table.cache_close(&session, "/root/b.txt").unwrap();
        // First close: ref count 2 -> 1, no flush yet.
        assert_eq!(session.get_file("/root/b.txt").unwrap(), b"hello");
        assert_eq!(table.len(), 1);

        table.cache_close(&session, "/root/b.txt").unwrap();
        // Second close: ref count 1 -> 0, flush happens.
        assert_eq!(session.get_file("/root/b.txt").unwrap(), b"WORLD");
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn reopen_after_full_release_repulls_from_remote() {
        let dir = tempdir().unwrap();
        let table = CacheTable::new(2, dir.path().to_path_buf());
        let session = FakeSession::new();
        write_fixture(&session, "/root/b.txt", b"hello");

        table.cache_open(&session, "/root/b.txt").unwrap();
        table.cache_close(&session, "/root/b.txt").unwrap();

        session.set_file("/root/b.txt", b"changed on remote".to_vec());
        let local = table.cache_open(&session, "/root/b.txt").unwrap();
        assert_eq!(fs::read(&local).unwrap(), b"changed on remote");
    }

    #[test]
    fn cache_full_rejects_new_distinct_path_and_leaves_existing_entries() {
        let dir = tempdir().unwrap();
        let table = CacheTable::new(2, dir.path().to_path_buf());
        let session = FakeSession::new();
        write_fixture(&session, "/root/a.txt", b"a");
        write_fixture(&session, "/root/b.txt", b"b");
        write_fixture(&session, "/root/c.txt", b"c");

        table.cache_open(&session, "/root/a.txt").unwrap();
        table.cache_open(&session, "/root/b.txt").unwrap();

        let err = table.cache_open(&session, "/root/c.txt").unwrap_err();
        assert!(matches!(err, CoreError::CacheFull));
        assert_eq!(table.len(), 2);

        table.cache_close(&session, "/root/a.txt").unwrap();
        table.cache_close(&session, "/root/b.txt").unwrap();
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn close_on_absent_entry_is_an_error() {
        let dir = tempdir().unwrap();
        let table = CacheTable::new(2, dir.path().to_path_buf());
        let session = FakeSession::new();

        let err = table.cache_close(&session, "/root/never-opened.txt").unwrap_err();
        assert!(matches!(err, CoreError::NotCached(_)));
    }

    #[test]
    fn scratch_paths_are_never_reused_across_entries() {
        let dir = tempdir().unwrap();
        let table = CacheTable::new(4, dir.path().to_path_buf());
        let session = FakeSession::new();
        write_fixture(&session, "/root/a.txt", b"a");
        write_fixture(&session, "/root/b.txt", b"b");

        let a = table.cache_open(&session, "/root/a.txt").unwrap();
        let b = table.cache_open(&session, "/root/b.txt").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn write_then_reopen_round_trip() {
        let dir = tempdir().unwrap();
        let table = CacheTable::new(2, dir.path().to_path_buf());
        let session = FakeSession::new();
        write_fixture(&session, "/root/b.txt", b"hello");

        let local = table.cache_open(&session, "/root/b.txt").unwrap();
        let mut f = fs::OpenOptions::new().write(true).open(&local).unwrap();
        f.write_all(b"WORLD").unwrap();
        drop(f);
        table.cache_close(&session, "/root/b.txt").unwrap();

        let local2 = table.cache_open(&session, "/root/b.txt").unwrap();
        assert_eq!(fs::read(&local2).unwrap(), b"WORLD");
    }
}
