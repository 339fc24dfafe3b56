//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries.

use serde::{Deserialize, Serialize};

use crate::error::{LarigotError, Result};

/// Header size: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// A single entry in the WAL: one committed transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// Every operation of the transaction, in the order they take effect
    pub operations: Vec<Operation>,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Put a key-value pair
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },
}

impl Operation {
    /// The key this operation touches
    pub fn key(&self) -> &[u8] {
        match self {
            Operation::Put { key, .. } | Operation::Delete { key } => key,
        }
    }
}

impl WalEntry {
    /// Create an entry stamped with the current time
    pub fn new(lsn: u64, operations: Vec<Operation>) -> Self {
        Self {
            lsn,
            operations,
            timestamp: chrono::Utc::now().timestamp_millis().max(0) as u64,
        }
    }

    /// Serialize into the on-disk frame: header followed by payload
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self)?;
        let len = u32::try_from(payload.len()).map_err(|_| {
            LarigotError::WalWrite(format!("entry of {} bytes is too large", payload.len()))
        })?;
        let crc = crc32fast::hash(&payload);

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
        frame.extend_from_slice(&self.lsn.to_le_bytes());
        frame.extend_from_slice(&crc.to_le_bytes());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&payload);
        Ok(frame)
    }

    /// Decode a payload whose header has already been read
    pub fn decode(header_lsn: u64, crc: u32, payload: &[u8]) -> Result<Self> {
        let actual = crc32fast::hash(payload);
        if actual != crc {
            return Err(LarigotError::WalCorruption(format!(
                "CRC mismatch for LSN {}: expected {:08x}, got {:08x}",
                header_lsn, crc, actual
            )));
        }

        let entry: WalEntry = bincode::deserialize(payload)
            .map_err(|e| LarigotError::WalCorruption(format!("undecodable entry: {}", e)))?;

        if entry.lsn != header_lsn {
            return Err(LarigotError::WalCorruption(format!(
                "header LSN {} does not match entry LSN {}",
                header_lsn, entry.lsn
            )));
        }

        Ok(entry)
    }
}
