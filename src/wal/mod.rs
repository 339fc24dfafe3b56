//! Write-Ahead Log (WAL) Module
//!
//! The log IS the store file: every committed transaction is appended as one
//! entry, and the in-memory table is rebuilt from it on open.
//!
//! ## Responsibilities
//! - Append one entry per committed transaction (all of its operations)
//! - CRC32 checksums for corruption detection
//! - Log Sequence Numbers (LSN) for ordering; an LSN doubles as the commit version
//! - Crash recovery: replay the valid prefix, cut off a torn tail
//! - Checkpoint files for compaction
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Entry 1                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Entry 2                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//! All header integers are little-endian. `Data` is the bincode encoding of a
//! [`WalEntry`]; the CRC covers `Data` only.

mod entry;
mod writer;
mod reader;
mod recovery;

pub use entry::{WalEntry, Operation, HEADER_SIZE};
pub use writer::WalWriter;
pub use reader::{WalReader, WalIterator};
pub use recovery::{WalRecovery, RecoveryResult};
