//! LMDB-backed record store.
//!
//! A thin wrapper around a heed environment holding a single unnamed
//! database of raw byte records. The store is single-writer (enforced by
//! LMDB's own locking), readers get snapshot isolation, and the map size is
//! a hard budget: writes past it fail rather than growing the file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use heed::types::Bytes;
use heed::{Database, Env, EnvFlags, EnvOpenOptions, RoTxn, RwTxn};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store size budget exhausted (map full)")]
    Capacity,

    #[error("no store found at {0}")]
    NotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("LMDB error: {0}")]
    Lmdb(heed::Error),
}

impl From<heed::Error> for StoreError {
    fn from(err: heed::Error) -> Self {
        match err {
            heed::Error::Mdb(heed::MdbError::MapFull) => StoreError::Capacity,
            heed::Error::Io(err) => StoreError::Io(err),
            other => StoreError::Lmdb(other),
        }
    }
}

/// Commit durability mode.
///
/// `Relaxed` opens the environment with `NO_SYNC | NO_META_SYNC | MAP_ASYNC
/// | WRITE_MAP`: commits are atomic and visible immediately, but reach disk
/// on the OS's schedule, so a hard crash can lose the tail of committed
/// work. `Full` keeps LMDB's fsync-per-commit default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Durability {
    /// fsync on every commit.
    Full,
    /// Asynchronous flush; the bulk-load default.
    #[default]
    Relaxed,
}

/// Handle on an open store.
#[derive(Debug)]
pub struct Store {
    env: Env,
    db: Database<Bytes, Bytes>,
}

impl Store {
    /// Create (or open) a store at `path` with a hard size budget in bytes.
    ///
    /// The directory is created if absent. At most one `Store` may have the
    /// environment open for writing at a time.
    pub fn create(
        path: &Path,
        map_size: usize,
        durability: Durability,
    ) -> Result<Self, StoreError> {
        fs::create_dir_all(path)?;
        let mut options = EnvOpenOptions::new();
        options.map_size(map_size);
        if durability == Durability::Relaxed {
            unsafe {
                options.flags(
                    EnvFlags::NO_SYNC
                        | EnvFlags::NO_META_SYNC
                        | EnvFlags::MAP_ASYNC
                        | EnvFlags::WRITE_MAP,
                );
            }
        }
        let env = unsafe { options.open(path)? };
        let mut wtxn = env.write_txn()?;
        let db = env.create_database(&mut wtxn, None)?;
        wtxn.commit()?;
        debug!(path = %path.display(), map_size, ?durability, "opened store for writing");
        Ok(Self { env, db })
    }

    /// Open an existing store for reading only.
    ///
    /// Safe to use while a writer is active; the reader observes only
    /// committed data.
    pub fn open_read_only(path: &Path) -> Result<Self, StoreError> {
        if !path.is_dir() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }
        let mut options = EnvOpenOptions::new();
        unsafe {
            options.flags(EnvFlags::READ_ONLY);
        }
        let env = unsafe { options.open(path)? };
        let db = {
            let rtxn = env.read_txn()?;
            env.open_database(&rtxn, None)?
                .ok_or_else(|| StoreError::NotFound(path.to_path_buf()))?
        };
        Ok(Self { env, db })
    }

    /// Start a write transaction. Blocks if another writer holds the lock.
    pub fn begin_write(&self) -> Result<WriteTxn<'_>, StoreError> {
        Ok(WriteTxn {
            txn: self.env.write_txn()?,
            db: self.db,
        })
    }

    /// Start a read-only snapshot.
    pub fn read_txn(&self) -> Result<RoTxn<'_>, StoreError> {
        Ok(self.env.read_txn()?)
    }

    /// Iterate all records in lexicographic key-byte order.
    pub fn iter<'txn>(
        &self,
        rtxn: &'txn RoTxn<'_>,
    ) -> Result<impl Iterator<Item = Result<(&'txn [u8], &'txn [u8]), StoreError>>, StoreError>
    {
        Ok(self.db.iter(rtxn)?.map(|item| item.map_err(StoreError::from)))
    }

    /// Look up a single record.
    pub fn get<'txn>(
        &self,
        rtxn: &'txn RoTxn<'_>,
        key: &[u8],
    ) -> Result<Option<&'txn [u8]>, StoreError> {
        Ok(self.db.get(rtxn, key)?)
    }

    /// Number of committed records.
    pub fn len(&self, rtxn: &RoTxn<'_>) -> Result<u64, StoreError> {
        Ok(self.db.len(rtxn)?)
    }

    /// Release the environment. Dropping the handle has the same effect;
    /// this just makes the single close point explicit. All transactions
    /// must be finished first.
    pub fn close(self) {
        drop(self);
    }
}

/// The open write transaction. Staged records become visible to readers
/// only at `commit`; at most one of these exists per store at a time.
pub struct WriteTxn<'env> {
    txn: RwTxn<'env>,
    db: Database<Bytes, Bytes>,
}

impl WriteTxn<'_> {
    /// Stage a record. An existing record under the same key is overwritten.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        Ok(self.db.put(&mut self.txn, key, value)?)
    }

    /// Atomically apply every staged record.
    pub fn commit(self) -> Result<(), StoreError> {
        Ok(self.txn.commit()?)
    }

    /// Discard every staged record.
    pub fn abort(self) {
        self.txn.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEST_MAP_SIZE: usize = 16 * 1024 * 1024;

    fn open(dir: &TempDir) -> Store {
        Store::create(&dir.path().join("store"), TEST_MAP_SIZE, Durability::Relaxed).unwrap()
    }

    #[test]
    fn put_commit_get() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        let mut txn = store.begin_write().unwrap();
        txn.put(b"k1", b"v1").unwrap();
        txn.commit().unwrap();

        let rtxn = store.read_txn().unwrap();
        assert_eq!(store.get(&rtxn, b"k1").unwrap(), Some(&b"v1"[..]));
        assert_eq!(store.len(&rtxn).unwrap(), 1);
    }

    #[test]
    fn abort_discards_staged_records() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        let mut txn = store.begin_write().unwrap();
        txn.put(b"k1", b"v1").unwrap();
        txn.abort();

        let rtxn = store.read_txn().unwrap();
        assert_eq!(store.len(&rtxn).unwrap(), 0);
    }

    #[test]
    fn snapshot_does_not_see_uncommitted_writes() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        let mut txn = store.begin_write().unwrap();
        txn.put(b"k1", b"v1").unwrap();

        // Snapshot taken while the write txn is still pending.
        let rtxn = store.read_txn().unwrap();
        assert_eq!(store.len(&rtxn).unwrap(), 0);
        drop(rtxn);

        txn.commit().unwrap();
        let rtxn = store.read_txn().unwrap();
        assert_eq!(store.len(&rtxn).unwrap(), 1);
    }

    #[test]
    fn cursor_is_key_ordered() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        let mut txn = store.begin_write().unwrap();
        for key in ["b", "a", "c/z", "c/a"] {
            txn.put(key.as_bytes(), b"v").unwrap();
        }
        txn.commit().unwrap();

        let rtxn = store.read_txn().unwrap();
        let keys: Vec<Vec<u8>> = store
            .iter(&rtxn)
            .unwrap()
            .map(|item| item.unwrap().0.to_vec())
            .collect();
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c/a".to_vec(), b"c/z".to_vec()]);
    }

    #[test]
    fn last_write_wins_on_duplicate_key() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        let mut txn = store.begin_write().unwrap();
        txn.put(b"k", b"first").unwrap();
        txn.put(b"k", b"second").unwrap();
        txn.commit().unwrap();

        let rtxn = store.read_txn().unwrap();
        assert_eq!(store.get(&rtxn, b"k").unwrap(), Some(&b"second"[..]));
        assert_eq!(store.len(&rtxn).unwrap(), 1);
    }

    #[test]
    fn exceeding_map_size_is_capacity_error() {
        let dir = TempDir::new().unwrap();
        // Budget far smaller than the value being written.
        let store =
            Store::create(&dir.path().join("tiny"), 64 * 1024, Durability::Full).unwrap();

        let big = vec![0u8; 1024 * 1024];
        let mut txn = store.begin_write().unwrap();
        let err = txn.put(b"big", &big).unwrap_err();
        assert!(matches!(err, StoreError::Capacity));
    }

    #[test]
    fn open_read_only_missing_store_fails() {
        let dir = TempDir::new().unwrap();
        let err = Store::open_read_only(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
