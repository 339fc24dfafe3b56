//! MemTable Module
//!
//! In-memory, multi-version copy of the store's committed state.
//!
//! ## Responsibilities
//! - Serve snapshot reads at any pinned version
//! - Apply each committed transaction under one version number
//! - Ordered range scans (bucket cursors are built on them)
//! - Prune versions no reader can see any more
//! - Produce the visible state for log compaction
//!
//! ## Data Structure Choice
//! BTreeMap wrapped in RwLock, each key holding its versions oldest first:
//! - Ordered keys (required for cursors and checkpoints)
//! - Readers only take the read lock; the single writer takes the write lock
//!   for the duration of one `apply`

mod table;

pub use table::{is_empty_range, Direction, MemTable};

/// Entry stored in the MemTable
#[derive(Debug, Clone, PartialEq)]
pub enum MemTableEntry {
    /// A live value
    Value(Vec<u8>),

    /// A tombstone (deleted key)
    Tombstone,
}
