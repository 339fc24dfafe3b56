//! Full-Text Search
//!
//! A keyword index over post text kept in its own store file, fed
//! asynchronously by a single indexing worker.
//!
//! ## Components
//! - [`tokenizer`]: lowercase alphanumeric terms and the `+must -not` query syntax
//! - [`bm25`]: ranking
//! - [`SearchIndex`]: inverted index persisted through a second [`Engine`](crate::engine::Engine)
//! - [`IndexPipeline`]: bounded queue + one worker thread
//! - [`rebuild`]: full scan used when the index is missing or incomplete
//!
//! The index is eventually consistent with the board: a post becomes
//! searchable once the worker has processed its task. The index's ready
//! marker is unset from pipeline start until a shutdown that lost nothing,
//! so a crash or a dropped task means a full rebuild at the next start.

pub mod bm25;
mod index;
mod pipeline;
mod rebuild;
pub mod tokenizer;

pub use index::{SearchHit, SearchIndex};
pub use pipeline::{IndexPipeline, PipelineStats};
pub use rebuild::rebuild;

/// One post to (re)index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTask {
    pub post_id: u64,
    pub thread_id: u64,
    pub author: String,
    pub text: String,
}
