//! Sequence Store
//!
//! Hierarchical namespaces ("buckets"), per-bucket sequences, ordered cursors
//! and record encoding, layered over the engine's flat ordered key space.
//!
//! ## Key Layout
//! ```text
//! path component   := 0x01 | len: u16 BE | name bytes
//! bucket prefix    := component*
//! bucket marker    := prefix | 0x00 | 'b'
//! sequence counter := prefix | 0x00 | 's'     (u64 BE)
//! record           := prefix | 0x02 | key
//! ```
//! A bucket's records form one contiguous key range that contains neither its
//! metadata nor its nested buckets, so cursors see only that bucket's keys.

mod bucket;
pub mod codec;
mod cursor;
pub mod keys;

pub use bucket::{BucketPath, BucketRead, BucketWrite};
pub use cursor::{Cursor, CursorIter};
pub use keys::{encode_id, parse_id};
