//! In-process backend.
//!
//! Keeps hashes in a mutex-guarded map. Expired keys are dropped lazily on
//! access and in bulk by [`MemoryStore::purge_expired`]. Nothing survives a
//! restart, which suits development mode and tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use crate::backend::{validate_ttl, HashFields, HashStore};
use crate::error::StorageError;

struct Entry {
    fields: HashFields,
    deadline: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.deadline
    }
}

/// In-memory [`HashStore`].
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>, StorageError> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Connection("memory store lock poisoned".into()))
    }

    fn deadline(ttl: Duration) -> Result<Instant, StorageError> {
        Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| StorageError::InvalidInput("ttl out of range".into()))
    }

    /// Removes the entry at `key` if it has expired and returns the live one.
    fn live<'a>(map: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
        let now = Instant::now();
        if map.get(key).is_some_and(|e| !e.is_live(now)) {
            map.remove(key);
        }
        map.get_mut(key)
    }

    /// Drops every expired key. Returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize, StorageError> {
        let mut map = self.lock()?;
        let now = Instant::now();
        let before = map.len();
        map.retain(|_, entry| entry.is_live(now));
        let purged = before - map.len();
        if purged > 0 {
            debug!(purged, "Purged expired hashes");
        }
        Ok(purged)
    }

    /// Number of live keys.
    pub fn len(&self) -> Result<usize, StorageError> {
        let map = self.lock()?;
        let now = Instant::now();
        Ok(map.values().filter(|e| e.is_live(now)).count())
    }

    /// Returns `true` if no live keys are stored.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl HashStore for MemoryStore {
    async fn hset_with_expiry(
        &self,
        key: &str,
        fields: &[(&str, &[u8])],
        ttl: Duration,
    ) -> Result<(), StorageError> {
        validate_ttl(ttl)?;

        let deadline = Self::deadline(ttl)?;

        let fields = fields
            .iter()
            .map(|(name, value)| ((*name).to_string(), value.to_vec()))
            .collect();

        let mut map = self.lock()?;
        map.insert(key.to_string(), Entry { fields, deadline });
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let mut map = self.lock()?;
        Ok(Self::live(&mut map, key).and_then(|e| e.fields.get(field).cloned()))
    }

    async fn hgetall(&self, key: &str) -> Result<Option<HashFields>, StorageError> {
        let mut map = self.lock()?;
        Ok(Self::live(&mut map, key).map(|e| e.fields.clone()))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StorageError> {
        validate_ttl(ttl)?;
        let deadline = Self::deadline(ttl)?;

        let mut map = self.lock()?;
        match Self::live(&mut map, key) {
            Some(entry) => {
                entry.deadline = deadline;
                Ok(true)
            },
            None => Ok(false),
        }
    }

    async fn del(&self, key: &str) -> Result<bool, StorageError> {
        let mut map = self.lock()?;
        Ok(map
            .remove(key)
            .is_some_and(|e| e.is_live(Instant::now())))
    }

    async fn take(&self, key: &str) -> Result<Option<HashFields>, StorageError> {
        let mut map = self.lock()?;
        let now = Instant::now();
        Ok(map
            .remove(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.fields))
    }
}
