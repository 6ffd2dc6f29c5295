//! Error types for the state store

use thiserror::Error;

/// Errors that can occur during state store operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error, including a lock held by another process
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored bytes are not a valid snapshot
    #[error("invalid stored value: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Bucket was never created
    #[error("unknown bucket: {0}")]
    UnknownBucket(String),
}

/// Result type for state store operations
pub type Result<T> = std::result::Result<T, Error>;
