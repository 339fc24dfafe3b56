//! Error types for larigot
//!
//! Provides a unified error type for all operations, plus the classification
//! the request layer uses to pick a response status.

use thiserror::Error;

use crate::model::MuteStatus;

/// Result type alias using LarigotError
pub type Result<T> = std::result::Result<T, LarigotError>;

/// Unified error type for larigot operations
#[derive(Debug, Error)]
pub enum LarigotError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    #[error("WAL write failed: {0}")]
    WalWrite(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    /// Another handle holds the store file.
    #[error("Store file {} is locked by another process", .0.display())]
    Locked(std::path::PathBuf),

    /// An index or primary namespace that must exist is missing.
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Request Errors
    // -------------------------------------------------------------------------
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    #[error("Post has already been reported. Thank you.")]
    AlreadyReported,

    // -------------------------------------------------------------------------
    // Collaborator Errors
    // -------------------------------------------------------------------------
    /// The write committed but the notification collaborator failed.
    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("Search index error: {0}")]
    Search(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

/// Input rejected before any mutation was attempted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Empty thread title is not allowed.")]
    TitleEmpty,

    #[error("Thread title is too long.")]
    TitleTooLong,

    #[error("Thread title contains an illegal character.")]
    TitleIllegalCharacter,

    #[error("Empty post is not allowed.")]
    PostEmpty,

    #[error("Empty username is not allowed.")]
    UsernameEmpty,

    #[error("Username is too long. Maximum length 24 characters.")]
    UsernameTooLong,

    #[error("Unallowed character in username")]
    UsernameIllegalCharacter,

    #[error("User with this name already exists")]
    UserAlreadyExists,

    #[error("Password too short. Minimum length 8 characters")]
    PasswordTooShort,

    #[error("Invalid mute duration: {0}")]
    MuteDuration(String),

    #[error("Bad input: {0}")]
    BadInput(String),
}

/// The caller exists but may not do this
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Client certificate required")]
    CertificateRequired,

    #[error("Certificate is not bound to any account")]
    NotLoggedIn,

    #[error("You are currently muted ({0})")]
    Muted(MuteStatus),

    #[error("Insufficient privilege")]
    InsufficientPrivilege,

    #[error("Thread is locked")]
    ThreadLocked,

    #[error("User not verified")]
    NotVerified,

    #[error("Login unsuccessful")]
    BadCredentials,
}

/// Coarse classification of every error, stable across layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad title, bad username/password, bad input
    Validation,
    /// Unknown thread, post, subforum or user
    NotFound,
    /// Not logged in, muted, locked thread, insufficient privilege
    Unauthorized,
    /// A defined no-op outcome such as reporting twice
    Rejected,
    /// Engine, I/O, serialization or consistency faults
    Internal,
}

impl LarigotError {
    /// Classify this error for the request layer
    pub fn kind(&self) -> ErrorKind {
        match self {
            LarigotError::Validation(_) => ErrorKind::Validation,
            LarigotError::NotFound(_) => ErrorKind::NotFound,
            LarigotError::Unauthorized(_) => ErrorKind::Unauthorized,
            LarigotError::AlreadyReported => ErrorKind::Rejected,
            LarigotError::Io(_)
            | LarigotError::WalCorruption(_)
            | LarigotError::WalWrite(_)
            | LarigotError::Storage(_)
            | LarigotError::Locked(_)
            | LarigotError::BucketNotFound(_)
            | LarigotError::Serialization(_)
            | LarigotError::Config(_)
            | LarigotError::Notification(_)
            | LarigotError::Search(_)
            | LarigotError::PasswordHash(_) => ErrorKind::Internal,
        }
    }
}

impl From<bincode::Error> for LarigotError {
    fn from(e: bincode::Error) -> Self {
        LarigotError::Serialization(e.to_string())
    }
}
