//! Common error types for omnidisk.

use thiserror::Error;

/// Top-level error type for storage operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Path is malformed, escapes the sandbox, or does not denote the
    /// expected kind of resource.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// No valid credential, or the backend rejected the credential and a
    /// refresh was not possible.
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    /// Network or HTTP-layer failure, not further classified.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Archive could not be created, written, or cleaned up.
    #[error("Invalid archive state: {0}")]
    InvalidArchive(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
