//! Storage error types.

use thiserror::Error;

/// Errors that can occur during storage operations.
///
/// A missing or expired key is not an error; operations report it through
/// `Option`/`bool` return values instead.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or opened.
    #[error("connection error: {0}")]
    Connection(String),

    /// A query or command failed.
    #[error("query failed: {0}")]
    Query(String),

    /// Invalid input (key, field name, TTL).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
