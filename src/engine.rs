//! Engine Module
//!
//! The transactional key-value engine that coordinates the log and the
//! memtable.
//!
//! ## Responsibilities
//! - Read-only transactions over a pinned snapshot
//! - Serialized read-write transactions that commit all-or-nothing
//! - Crash recovery on open
//! - Log compaction once the log outgrows its threshold

use std::collections::BTreeMap;
use std::fs;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::config::StoreOptions;
use crate::error::Result;
use crate::lock::FileLock;
use crate::memtable::{is_empty_range, Direction, MemTable};
use crate::wal::{Operation, WalRecovery, WalWriter};

/// Key range handed to [`KvRead::seek`]
pub type KeyRange<'a> = (Bound<&'a [u8]>, Bound<&'a [u8]>);

/// Read access shared by both transaction kinds
pub trait KvRead {
    /// Value stored under `key`
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// First pair inside `range` when scanning in `direction`
    fn seek(&self, range: KeyRange<'_>, direction: Direction) -> Option<(Vec<u8>, Vec<u8>)>;
}

/// The storage engine behind one file
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (`update`): Serialized by `write_lock`
///   - Only ONE read-write transaction at a time
///   - Commit order: WAL append → memtable apply → publish version
///
/// - **Reads** (`view` / `begin_read`): never take `write_lock`
///   - Each reader pins the committed version current when it began
///   - Versions are pruned only once no pinned reader can see them
pub struct Engine {
    /// File and durability options
    options: StoreOptions,

    /// The log (exclusive access needed for append and compaction)
    wal: Mutex<WalWriter>,

    /// Multi-version committed state (internal RwLock)
    memtable: MemTable,

    /// Serializes read-write transactions
    write_lock: Mutex<()>,

    /// Latest committed version
    committed: AtomicU64,

    /// Pinned snapshot versions -> reader count
    readers: Mutex<BTreeMap<u64, usize>>,

    /// Exclusive ownership of the file; released last
    _lock: FileLock,
}

impl Engine {
    const COMPACT_SUFFIX: &'static str = "compact";

    /// Open or create the store file described by `options`
    ///
    /// On startup:
    /// 1. Create the parent directory and lock the file
    /// 2. Remove a checkpoint left behind by an interrupted compaction
    /// 3. Recover the valid prefix of the log, cutting off a torn tail
    /// 4. Replay it into the memtable
    pub fn open(options: StoreOptions) -> Result<Self> {
        if let Some(parent) = options.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let lock = FileLock::acquire(&options.path, options.lock_timeout)?;

        let compact_path = Self::compact_path(&options.path);
        if compact_path.exists() {
            tracing::warn!(
                "Removing unfinished compaction file {}",
                compact_path.display()
            );
            fs::remove_file(&compact_path)?;
        }

        let memtable = MemTable::new();
        let mut last_lsn = 0;

        if options.path.exists() {
            let (entries, recovery) = WalRecovery::recover(&options.path)?;
            if recovery.entries_recovered > 0 || recovery.entries_corrupted > 0 {
                tracing::info!(
                    "Recovered {}: {} entries, {} corrupted, last_lsn={}",
                    options.path.display(),
                    recovery.entries_recovered,
                    recovery.entries_corrupted,
                    recovery.last_lsn
                );
            }
            for entry in entries {
                memtable.apply(&entry.operations, entry.lsn);
            }
            last_lsn = recovery.last_lsn;
            memtable.prune(last_lsn);
        }

        let wal = WalWriter::open(&options.path, options.sync, last_lsn)?;

        Ok(Self {
            options,
            wal: Mutex::new(wal),
            memtable,
            write_lock: Mutex::new(()),
            committed: AtomicU64::new(last_lsn),
            readers: Mutex::new(BTreeMap::new()),
            _lock: lock,
        })
    }

    /// Open a store file with default options
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(StoreOptions::new(path))
    }

    /// Begin a read-only transaction on the current snapshot
    pub fn begin_read(&self) -> ReadTxn<'_> {
        let mut readers = self.readers.lock();
        let version = self.committed.load(Ordering::Acquire);
        *readers.entry(version).or_insert(0) += 1;
        ReadTxn {
            engine: self,
            version,
        }
    }

    /// Run `f` inside a read-only transaction
    pub fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ReadTxn<'_>) -> Result<T>,
    {
        let txn = self.begin_read();
        f(&txn)
    }

    /// Run `f` inside a read-write transaction
    ///
    /// The transaction commits iff `f` returns `Ok`; on `Err` every pending
    /// write is discarded and the error is returned unchanged. A failed log
    /// append also discards the transaction and leaves committed data intact.
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut WriteTxn<'_>) -> Result<T>,
    {
        let _write_guard = self.write_lock.lock();

        let mut txn = WriteTxn {
            engine: self,
            version: self.committed.load(Ordering::Acquire),
            pending: BTreeMap::new(),
        };

        let out = f(&mut txn)?;
        let operations = txn.into_operations();
        if operations.is_empty() {
            return Ok(out);
        }

        let lsn = self.wal.lock().append(operations.clone())?;
        self.memtable.apply(&operations, lsn);
        self.committed.store(lsn, Ordering::Release);
        tracing::trace!("Committed LSN {} ({} operations)", lsn, operations.len());

        self.prune();
        self.maybe_compact();
        Ok(out)
    }

    /// Rewrite the log as a single checkpoint of the committed state
    pub fn compact(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        self.compact_internal()
    }

    /// Internal compaction (called with write lock held)
    fn compact_internal(&self) -> Result<()> {
        let version = self.committed.load(Ordering::Acquire);
        if version == 0 {
            return Ok(());
        }
        let operations: Vec<Operation> = self
            .memtable
            .snapshot(version)
            .into_iter()
            .map(|(key, value)| Operation::Put { key, value })
            .collect();

        let compact_path = Self::compact_path(&self.options.path);
        let mut wal = self.wal.lock();
        let before = wal.size();
        let after = WalWriter::write_checkpoint(&compact_path, version, operations)?;
        wal.replace_with(&compact_path)?;

        tracing::info!(
            "Compacted {} from {} to {} bytes at version {}",
            self.options.path.display(),
            before,
            after,
            version
        );
        Ok(())
    }

    /// Compact after a commit; the commit already succeeded, so a failure
    /// here is logged and retried on the next commit.
    fn maybe_compact(&self) {
        let size = self.wal.lock().size();
        if size > self.options.compaction_threshold {
            if let Err(e) = self.compact_internal() {
                tracing::error!("Compaction of {} failed: {}", self.options.path.display(), e);
            }
        }
    }

    /// Drop versions older than the oldest pinned snapshot
    fn prune(&self) {
        let horizon = {
            let readers = self.readers.lock();
            let committed = self.committed.load(Ordering::Acquire);
            readers
                .keys()
                .next()
                .copied()
                .map_or(committed, |oldest| oldest.min(committed))
        };
        self.memtable.prune(horizon);
    }

    fn release(&self, version: u64) {
        let mut readers = self.readers.lock();
        if let Some(count) = readers.get_mut(&version) {
            *count -= 1;
            if *count == 0 {
                readers.remove(&version);
            }
        }
    }

    fn compact_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".");
        name.push(Self::COMPACT_SUFFIX);
        PathBuf::from(name)
    }

    /// Force the log to disk regardless of the sync strategy
    pub fn sync(&self) -> Result<()> {
        self.wal.lock().sync()
    }

    /// Close the engine gracefully
    ///
    /// Syncs the log to disk
    pub fn close(self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        self.wal.lock().sync()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Path of the store file
    pub fn path(&self) -> &Path {
        &self.options.path
    }

    /// Latest committed version
    pub fn committed_version(&self) -> u64 {
        self.committed.load(Ordering::Acquire)
    }

    /// Current log size in bytes
    pub fn log_size(&self) -> u64 {
        self.wal.lock().size()
    }

    /// Live keys at the latest version
    pub fn entry_count(&self) -> usize {
        self.memtable.entry_count(self.committed_version())
    }

    /// Versions held in memory, including ones kept for pinned readers
    pub fn version_count(&self) -> usize {
        self.memtable.version_count()
    }

    /// Number of open read transactions
    pub fn active_readers(&self) -> usize {
        self.readers.lock().values().sum()
    }
}

/// A read-only transaction pinned to one committed version
pub struct ReadTxn<'a> {
    engine: &'a Engine,
    version: u64,
}

impl ReadTxn<'_> {
    /// Version this transaction reads
    pub fn version(&self) -> u64 {
        self.version
    }
}

impl KvRead for ReadTxn<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.engine.memtable.get_at(key, self.version)
    }

    fn seek(&self, range: KeyRange<'_>, direction: Direction) -> Option<(Vec<u8>, Vec<u8>)> {
        self.engine.memtable.seek_at(range, self.version, direction)
    }
}

impl Drop for ReadTxn<'_> {
    fn drop(&mut self) {
        self.engine.release(self.version);
    }
}

/// A read-write transaction: reads see the base snapshot plus own writes
pub struct WriteTxn<'a> {
    engine: &'a Engine,
    version: u64,
    /// Pending writes; `None` is a delete
    pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl WriteTxn<'_> {
    /// Stage a put
    pub fn put(&mut self, key: &[u8], value: Vec<u8>) {
        self.pending.insert(key.to_vec(), Some(value));
    }

    /// Stage a delete
    pub fn delete(&mut self, key: &[u8]) {
        self.pending.insert(key.to_vec(), None);
    }

    /// Base version this transaction builds on
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of staged writes
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn into_operations(self) -> Vec<Operation> {
        self.pending
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => Operation::Put { key, value },
                None => Operation::Delete { key },
            })
            .collect()
    }
}

impl KvRead for WriteTxn<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.pending.get(key) {
            Some(staged) => staged.clone(),
            None => self.engine.memtable.get_at(key, self.version),
        }
    }

    fn seek(&self, range: KeyRange<'_>, direction: Direction) -> Option<(Vec<u8>, Vec<u8>)> {
        let (mut lower, mut upper): (Bound<Vec<u8>>, Bound<Vec<u8>>) =
            (range.0.map(<[u8]>::to_vec), range.1.map(<[u8]>::to_vec));

        loop {
            let bounds = (
                lower.as_ref().map(Vec::as_slice),
                upper.as_ref().map(Vec::as_slice),
            );
            if is_empty_range(bounds) {
                return None;
            }

            let base = self.engine.memtable.seek_at(bounds, self.version, direction);
            let mut staged = self.pending.range::<[u8], _>(bounds);
            let staged = match direction {
                Direction::Forward => staged.next(),
                Direction::Backward => staged.next_back(),
            };

            let (key, value) = match (base, staged) {
                (None, None) => return None,
                (Some(base), None) => return Some(base),
                (None, Some((k, v))) => (k.clone(), v.clone()),
                (Some(base), Some((k, v))) => {
                    let staged_first = match direction {
                        Direction::Forward => k.as_slice() <= base.0.as_slice(),
                        Direction::Backward => k.as_slice() >= base.0.as_slice(),
                    };
                    if !staged_first {
                        return Some(base);
                    }
                    (k.clone(), v.clone())
                }
            };

            if let Some(value) = value {
                return Some((key, value));
            }

            // Staged delete shadows this key: continue past it.
            match direction {
                Direction::Forward => lower = Bound::Excluded(key),
                Direction::Backward => upper = Bound::Excluded(key),
            }
        }
    }
}
