//! Protocol Module
//!
//! Request/response values exchanged with the outer listener, and the router
//! that turns a request into board operations.
//!
//! The listener owns the wire: it accepts the TLS connection, reads the
//! request line, computes the client certificate fingerprint and writes the
//! formatted response. This module never touches a socket.
//!
//! ## Request
//! ```text
//! ┌──────────────────┬───────────────────┬──────────────────────┐
//! │ fingerprint?     │ path (escaped)    │ query (raw, escaped) │
//! └──────────────────┴───────────────────┴──────────────────────┘
//! ```
//!
//! ## Response
//! ```text
//! ┌──────────┬───────────────────────────┬─────────────────────┐
//! │ Status   │ meta (mime or message)    │ body lines (20 only)│
//! └──────────┴───────────────────────────┴─────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 10 / 11: input / sensitive input, meta is the prompt
//! - 20: success, meta is the mime type
//! - 30: redirect, meta is the target
//! - 40: temporary failure (internal faults)
//! - 51: not found
//! - 59: bad request (validation, rejected no-ops)
//! - 60 / 61: certificate required / not authorised

pub mod escape;
mod request;
mod response;
mod router;

pub use request::Request;
pub use response::{Response, Status, GEMINI_MIME};
pub use router::Router;
