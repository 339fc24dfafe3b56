//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::{LarigotError, Result};
use super::{WalEntry, WalReader};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted entries dropped (0 or 1: everything after the
    /// first bad entry is unreachable)
    pub entries_corrupted: u64,

    /// Last valid LSN
    pub last_lsn: u64,

    /// Offset just past the last valid entry
    pub valid_len: u64,

    /// Whether the WAL was truncated (partial writes removed)
    pub was_truncated: bool,
}

impl WalRecovery {
    /// Recover entries from a WAL file
    ///
    /// This will:
    /// 1. Read entries until the first torn or corrupt one
    /// 2. Truncate the file after the last valid entry
    /// 3. Return all valid entries in order
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let (entries, mut result, file_len) = Self::scan(path)?;

        if result.valid_len < file_len {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(result.valid_len)?;
            file.sync_all()?;
            result.was_truncated = true;
            tracing::warn!(
                "Truncated log {} from {} to {} bytes",
                path.display(),
                file_len,
                result.valid_len
            );
        }

        Ok((entries, result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let (_, result, _) = Self::scan(path)?;
        Ok(result)
    }

    fn scan(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult, u64)> {
        let mut reader = WalReader::open(path)?;
        let file_len = reader.file_len();
        let mut entries = Vec::new();
        let mut result = RecoveryResult::default();

        loop {
            match reader.next_entry() {
                Ok(Some(entry)) => {
                    if entry.lsn <= result.last_lsn {
                        tracing::warn!(
                            "Non-monotonic LSN {} after {} in {}",
                            entry.lsn,
                            result.last_lsn,
                            path.display()
                        );
                        result.entries_corrupted += 1;
                        break;
                    }
                    result.last_lsn = entry.lsn;
                    result.entries_recovered += 1;
                    result.valid_len = reader.position();
                    entries.push(entry);
                }
                Ok(None) => break,
                Err(LarigotError::WalCorruption(reason)) => {
                    tracing::warn!("Log {} damaged: {}", path.display(), reason);
                    result.entries_corrupted += 1;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok((entries, result, file_len))
    }
}
