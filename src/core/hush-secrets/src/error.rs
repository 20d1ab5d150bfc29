//! Secrets engine error types.

use thiserror::Error;

/// Errors that can occur in the Secrets Engine.
#[derive(Debug, Error)]
pub enum SecretsError {
    /// Secret never existed, expired, or was already revealed.
    #[error("secret not found")]
    NotFound,

    /// Passphrase did not decrypt the secret. The secret is left in place.
    #[error("invalid passphrase")]
    InvalidPassphrase,

    /// Request rejected before touching the store.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The backing store could not be reached or failed the operation.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stored record could not be decoded.
    #[error("corrupt record: {0}")]
    CorruptRecord(String),

    /// Cryptographic error.
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl From<hush_crypto::CryptoError> for SecretsError {
    fn from(e: hush_crypto::CryptoError) -> Self {
        SecretsError::Crypto(e.to_string())
    }
}

impl From<hush_storage::StorageError> for SecretsError {
    fn from(e: hush_storage::StorageError) -> Self {
        match e {
            hush_storage::StorageError::InvalidInput(msg) => SecretsError::Validation(msg),
            other => SecretsError::StoreUnavailable(other.to_string()),
        }
    }
}
