//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{LarigotError, Result};
use super::{WalEntry, HEADER_SIZE};

/// Reads entries from the WAL file
pub struct WalReader {
    reader: BufReader<File>,
    /// Offset just past the last entry read successfully
    position: u64,
    /// File length at open time
    file_len: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
            file_len,
        })
    }

    /// Read the next entry from the WAL
    ///
    /// Returns:
    /// - `Ok(Some(entry))` — a complete entry with a valid checksum
    /// - `Ok(None)` — clean end of file
    /// - `Err(WalCorruption)` — torn or damaged entry at `position()`
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        let remaining = self.file_len - self.position;
        if remaining == 0 {
            return Ok(None);
        }
        if remaining < HEADER_SIZE as u64 {
            return Err(LarigotError::WalCorruption(format!(
                "truncated header at offset {}",
                self.position
            )));
        }

        let mut header = [0u8; HEADER_SIZE];
        self.read_exact_or_corrupt(&mut header)?;

        let lsn = u64::from_le_bytes(header[0..8].try_into().map_err(corrupt_header)?);
        let crc = u32::from_le_bytes(header[8..12].try_into().map_err(corrupt_header)?);
        let len = u32::from_le_bytes(header[12..16].try_into().map_err(corrupt_header)?) as u64;

        if len > remaining - HEADER_SIZE as u64 {
            return Err(LarigotError::WalCorruption(format!(
                "truncated payload at offset {}: need {} bytes, {} left",
                self.position,
                len,
                remaining - HEADER_SIZE as u64
            )));
        }

        let mut payload = vec![0u8; len as usize];
        self.read_exact_or_corrupt(&mut payload)?;

        let entry = WalEntry::decode(lsn, crc, &payload)?;
        self.position += HEADER_SIZE as u64 + len;
        Ok(Some(entry))
    }

    /// Offset just past the last valid entry
    pub fn position(&self) -> u64 {
        self.position
    }

    /// File length at open time
    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    /// Iterate over all valid entries
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }

    fn read_exact_or_corrupt(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.reader.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(LarigotError::WalCorruption(
                format!("unexpected end of log at offset {}", self.position),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

fn corrupt_header<E>(_: E) -> LarigotError {
    LarigotError::WalCorruption("malformed header".to_string())
}

/// Iterator over WAL entries; stops after the first error
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
