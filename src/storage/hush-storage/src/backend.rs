//! Storage backend trait definition.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StorageError;

/// All fields of one hash.
pub type HashFields = HashMap<String, Vec<u8>>;

/// A key-value store of expiring hashes (Redis `HSET`/`EXPIRE` semantics).
///
/// Every key maps to a set of named byte-string fields and carries its own
/// deadline. Once the deadline passes the key and all of its fields are gone:
/// reads return `None` and deletes report `false`. Implementations enforce
/// expiry themselves.
#[async_trait]
pub trait HashStore: Send + Sync {
    /// Replaces the hash at `key` with `fields` and sets its TTL, as one
    /// atomic write. Readers never observe a partially written hash.
    async fn hset_with_expiry(
        &self,
        key: &str,
        fields: &[(&str, &[u8])],
        ttl: Duration,
    ) -> Result<(), StorageError>;

    /// Reads a single field. Does not touch the TTL.
    async fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Reads every field of a hash. Does not touch the TTL.
    async fn hgetall(&self, key: &str) -> Result<Option<HashFields>, StorageError>;

    /// Resets the TTL of a live key. Returns `false` if the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StorageError>;

    /// Deletes a key. Returns `true` only for the call that removed a live key.
    async fn del(&self, key: &str) -> Result<bool, StorageError>;

    /// Atomically reads and deletes a hash.
    ///
    /// Among concurrent callers on the same key at most one receives the fields.
    async fn take(&self, key: &str) -> Result<Option<HashFields>, StorageError>;

    /// Checks whether a live key exists.
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.hgetall(key).await?.is_some())
    }
}

/// Longest TTL any backend accepts (10 years).
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Rejects TTLs the backends cannot represent.
pub fn validate_ttl(ttl: Duration) -> Result<(), StorageError> {
    if ttl.is_zero() {
        return Err(StorageError::InvalidInput("ttl must be > 0".into()));
    }
    if ttl > MAX_TTL {
        return Err(StorageError::InvalidInput(format!(
            "ttl exceeds {} seconds",
            MAX_TTL.as_secs()
        )));
    }
    Ok(())
}
