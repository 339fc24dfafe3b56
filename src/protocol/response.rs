//! Response definitions
//!
//! Represents responses to clients, and the mapping from errors to statuses.

use crate::error::{AuthError, ErrorKind, LarigotError};

/// Mime type of every success body
pub const GEMINI_MIME: &str = "text/gemini";

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Input = 10,
    SensitiveInput = 11,
    Success = 20,
    Redirect = 30,
    TemporaryFailure = 40,
    NotFound = 51,
    BadRequest = 59,
    CertificateRequired = 60,
    CertificateNotAuthorised = 61,
}

impl Status {
    /// Two-digit numeric code
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Mime type for success, prompt for input, target for redirects,
    /// message otherwise
    pub meta: String,

    /// Body lines, only present on success
    pub body: Vec<String>,
}

impl Response {
    fn new(status: Status, meta: impl Into<String>) -> Self {
        Self {
            status,
            meta: meta.into(),
            body: Vec::new(),
        }
    }

    /// Create a success response with a body
    pub fn success(body: Vec<String>) -> Self {
        Self {
            status: Status::Success,
            meta: GEMINI_MIME.to_string(),
            body,
        }
    }

    /// Ask the client for a line of input
    pub fn input(prompt: impl Into<String>) -> Self {
        Self::new(Status::Input, prompt)
    }

    /// Ask for input that should not be echoed
    pub fn sensitive_input(prompt: impl Into<String>) -> Self {
        Self::new(Status::SensitiveInput, prompt)
    }

    pub fn redirect(target: impl Into<String>) -> Self {
        Self::new(Status::Redirect, target)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(Status::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Status::NotFound, message)
    }

    pub fn temporary_failure(message: impl Into<String>) -> Self {
        Self::new(Status::TemporaryFailure, message)
    }

    pub fn certificate_required() -> Self {
        Self::new(Status::CertificateRequired, "Client certificate required")
    }

    pub fn not_authorised(message: impl Into<String>) -> Self {
        Self::new(Status::CertificateNotAuthorised, message)
    }

    /// Map an error onto a status
    ///
    /// Internal faults are logged here and never leak their detail.
    pub fn from_error(err: &LarigotError) -> Self {
        match err.kind() {
            ErrorKind::Validation | ErrorKind::Rejected => Self::bad_request(err.to_string()),
            ErrorKind::NotFound => Self::not_found(capitalize(&err.to_string())),
            ErrorKind::Unauthorized => match err {
                LarigotError::Unauthorized(AuthError::CertificateRequired) => {
                    Self::certificate_required()
                }
                _ => Self::not_authorised(err.to_string()),
            },
            ErrorKind::Internal => {
                tracing::error!("Request failed: {}", err);
                Self::temporary_failure("Internal error")
            }
        }
    }

    /// Whether this is a success response
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

impl From<LarigotError> for Response {
    fn from(err: LarigotError) -> Self {
        Self::from_error(&err)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
