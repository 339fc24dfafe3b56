//! # larigot
//!
//! The storage and identity core of a certificate-authenticated bulletin board:
//! - A transactional key-value engine over one append-only log file
//! - Multi-entity records with secondary indices kept consistent per transaction
//! - Caller identity and privilege resolved from a client certificate fingerprint
//! - A keyword index fed asynchronously off the write path
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Outer listener (not in crate)               │
//! │          (fingerprint, path, raw query) -> Response         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Protocol Router                        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                          Board                              │
//! │     identity · threads/posts · users · moderation · query   │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │ one txn per write                │ after commit
//!            ▼                                  ▼
//!   ┌─────────────────┐                ┌─────────────────┐
//!   │  Store (buckets)│                │ Index pipeline  │
//!   └────────┬────────┘                │ (worker thread) │
//!            │                         └────────┬────────┘
//!            ▼                                  ▼
//!   ┌─────────────────┐                ┌─────────────────┐
//!   │ Engine          │                │ Search index    │
//!   │ WAL + MemTable  │                │ (own Engine)    │
//!   └─────────────────┘                └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod lock;
pub mod wal;
pub mod memtable;
pub mod engine;
pub mod store;

pub mod model;
pub mod clock;
pub mod notify;
pub mod board;
pub mod search;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{AuthError, ErrorKind, LarigotError, Result, ValidationError};
pub use config::{Config, ConfigBuilder, PasswordCost, WalSyncStrategy};
pub use engine::Engine;
pub use board::{Board, Identity};
pub use protocol::{Request, Response, Router, Status};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of larigot
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
