//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{LarigotError, Result};
use super::{Operation, WalEntry};

/// Writes entries to the WAL file
pub struct WalWriter {
    file: File,
    path: PathBuf,
    current_lsn: u64,
    sync_strategy: WalSyncStrategy,
    /// Entries appended since the last fsync
    unsynced: usize,
    /// Current file length
    size: u64,
    /// Set when the log file could not be reopened after a replace; every
    /// later write fails with this reason
    closed: Option<String>,
}

impl WalWriter {
    /// Open or create a WAL file, continuing after `last_lsn`
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy, last_lsn: u64) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        let size = file.seek(SeekFrom::End(0))?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            current_lsn: last_lsn,
            sync_strategy,
            unsynced: 0,
            size,
            closed: None,
        })
    }

    /// Append one transaction to the WAL and return its LSN
    ///
    /// Either the whole entry is written (and synced per strategy) or the
    /// file is cut back to its previous length and an error is returned.
    pub fn append(&mut self, operations: Vec<Operation>) -> Result<u64> {
        self.check_open()?;
        let lsn = self.current_lsn + 1;
        let frame = WalEntry::new(lsn, operations).encode()?;

        if let Err(e) = self.write_frame(&frame) {
            self.rollback();
            return Err(LarigotError::WalWrite(format!(
                "append of LSN {} failed: {}",
                lsn, e
            )));
        }

        self.size += frame.len() as u64;
        self.current_lsn = lsn;
        Ok(lsn)
    }

    fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<()> {
        self.file.write_all(frame)?;
        let unsynced = self.unsynced + 1;
        let due = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => unsynced >= count,
        };
        if due {
            self.file.sync_data()?;
        }
        self.unsynced = if due { 0 } else { unsynced };
        Ok(())
    }

    fn check_open(&self) -> Result<()> {
        match &self.closed {
            Some(reason) => Err(LarigotError::WalWrite(format!(
                "{} is closed: {}",
                self.path.display(),
                reason
            ))),
            None => Ok(()),
        }
    }

    /// Undo a partial append so later entries are not written after garbage
    fn rollback(&mut self) {
        if let Err(e) = self
            .file
            .set_len(self.size)
            .and_then(|_| self.file.seek(SeekFrom::Start(self.size)).map(|_| ()))
        {
            tracing::error!(
                "Failed to roll back partial append to {}: {}",
                self.path.display(),
                e
            );
        }
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.check_open()?;
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Entries appended since the last fsync
    pub fn unsynced(&self) -> usize {
        self.unsynced
    }

    /// Get the current LSN
    pub fn current_lsn(&self) -> u64 {
        self.current_lsn
    }

    /// Current file length in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a single-entry log holding a full checkpoint to `path`
    ///
    /// The file is synced before returning; the caller renames it into place.
    pub fn write_checkpoint(path: &Path, lsn: u64, operations: Vec<Operation>) -> Result<u64> {
        let frame = WalEntry::new(lsn, operations).encode()?;
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        file.write_all(&frame)?;
        file.sync_all()?;
        Ok(frame.len() as u64)
    }

    /// Atomically replace this log with a checkpoint file and continue
    /// appending to it
    ///
    /// If the rename succeeds but the new file cannot be opened, the writer
    /// is closed: the old handle points at an unlinked file.
    pub fn replace_with(&mut self, checkpoint: &Path) -> Result<()> {
        self.check_open()?;
        self.file.sync_all()?;
        fs::rename(checkpoint, &self.path)?;
        if let Some(dir) = self.path.parent() {
            // Directory fsync makes the rename durable; not supported everywhere.
            if let Ok(d) = File::open(dir) {
                let _ = d.sync_all();
            }
        }

        match Self::open(&self.path, self.sync_strategy, self.current_lsn) {
            Ok(reopened) => {
                *self = reopened;
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    "Failed to reopen {} after replace, closing log: {}",
                    self.path.display(),
                    e
                );
                self.closed = Some(e.to_string());
                Err(e)
            }
        }
    }
}
