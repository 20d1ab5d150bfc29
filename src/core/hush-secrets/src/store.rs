//! Record persistence on top of a [`HashStore`].
//!
//! Every operation is a single backend round trip, so atomicity comes from
//! the backend: `create` is one hash write with its TTL, `consume` is one
//! read-and-delete, and `remove` reports success to exactly one caller.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use hush_storage::HashStore;

use crate::error::SecretsError;
use crate::record::{ProtectionKind, SecretId, SecretRecord, FIELD_TYPE};

/// Stores and retrieves [`SecretRecord`]s.
#[derive(Clone)]
pub struct RecordStore {
    backend: Arc<dyn HashStore>,
}

impl RecordStore {
    /// Wraps a backend.
    pub fn new(backend: Arc<dyn HashStore>) -> Self {
        Self { backend }
    }

    /// Persists a record that disappears after `ttl`.
    pub async fn create(&self, record: &SecretRecord, ttl: Duration) -> Result<(), SecretsError> {
        let fields = record.to_fields();
        let borrowed: Vec<(&str, &[u8])> = fields
            .iter()
            .map(|(name, value)| (*name, value.as_slice()))
            .collect();

        self.backend
            .hset_with_expiry(&record.id.store_key(), &borrowed, ttl)
            .await?;

        debug!(id = %record.id, protection = %record.protection.kind(), "Record stored");
        Ok(())
    }

    /// Reads a record without consuming it.
    pub async fn read(&self, id: &SecretId) -> Result<Option<SecretRecord>, SecretsError> {
        match self.backend.hgetall(&id.store_key()).await? {
            Some(fields) => SecretRecord::from_fields(id.clone(), &fields).map(Some),
            None => Ok(None),
        }
    }

    /// Reads only the protection kind.
    pub async fn protection(&self, id: &SecretId) -> Result<Option<ProtectionKind>, SecretsError> {
        match self.backend.hget(&id.store_key(), FIELD_TYPE).await? {
            Some(code) => ProtectionKind::from_type_code(&code).map(Some),
            None => Ok(None),
        }
    }

    /// Reads and deletes a record in one atomic step.
    ///
    /// Among concurrent callers at most one gets `Some`.
    pub async fn consume(&self, id: &SecretId) -> Result<Option<SecretRecord>, SecretsError> {
        match self.backend.take(&id.store_key()).await? {
            Some(fields) => SecretRecord::from_fields(id.clone(), &fields).map(Some),
            None => Ok(None),
        }
    }

    /// Deletes a record. Returns `true` only for the caller that removed it.
    pub async fn remove(&self, id: &SecretId) -> Result<bool, SecretsError> {
        Ok(self.backend.del(&id.store_key()).await?)
    }
}
