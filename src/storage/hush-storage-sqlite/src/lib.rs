//! # Hush Storage - SQLite Backend
//!
//! Durable [`HashStore`] on SQLite. Every hash is a row in `hash_keys`
//! carrying its deadline plus one row per field in `hash_fields`.
//!
//! Expired keys are invisible to every read the moment their deadline passes
//! and are physically removed on the next write.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use tracing::{debug, info};

use hush_storage::backend::validate_ttl;
use hush_storage::{HashFields, HashStore, StorageError};

/// SQLite storage backend.
///
/// The database lives at `{base_path}/{name}.db`.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

fn query_err(e: sqlx::Error) -> StorageError {
    StorageError::Query(e.to_string())
}

impl SqliteStore {
    /// Opens or creates a database.
    ///
    /// # Arguments
    ///
    /// * `base_path` - Directory where the database file is stored
    /// * `name` - Database name (must match `[a-z0-9_-]+`)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The name is invalid
    /// - The directory cannot be created
    /// - The database connection fails
    pub async fn open(base_path: impl AsRef<Path>, name: &str) -> Result<Self, StorageError> {
        Self::validate_name(name)?;

        let base = base_path.as_ref();
        std::fs::create_dir_all(base).map_err(|e| {
            StorageError::Connection(format!("failed to create directory: {e}"))
        })?;

        let db_path = base.join(format!("{name}.db"));
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        debug!(path = %db_path.display(), "Opening SQLite database");

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let store = Self { pool };

        store.migrate().await?;

        info!(name = %name, "SQLite store ready");

        Ok(store)
    }

    /// Validates that a database name is safe to use as a file name.
    ///
    /// Only allows: lowercase letters, digits, underscore, hyphen.
    fn validate_name(name: &str) -> Result<(), StorageError> {
        if name.is_empty() {
            return Err(StorageError::InvalidInput("name cannot be empty".into()));
        }

        if name.len() > 64 {
            return Err(StorageError::InvalidInput("name too long".into()));
        }

        let valid = name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');

        if !valid {
            return Err(StorageError::InvalidInput(
                "name must match [a-z0-9_-]+".into(),
            ));
        }

        Ok(())
    }

    /// Runs database migrations.
    async fn migrate(&self) -> Result<(), StorageError> {
        debug!("Running database migrations");

        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS hash_keys (
                key            TEXT PRIMARY KEY,
                expires_at_ms  INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS hash_fields (
                key    TEXT NOT NULL,
                field  TEXT NOT NULL,
                value  BLOB NOT NULL,
                PRIMARY KEY (key, field)
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_hash_keys_expiry ON hash_keys (expires_at_ms)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Connection(format!("migration failed: {e}")))?;
        }

        debug!("Migrations complete");

        Ok(())
    }

    /// Returns the current Unix time in milliseconds.
    fn now_ms() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }

    fn deadline_ms(ttl: Duration) -> i64 {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        Self::now_ms().saturating_add(ttl_ms)
    }

    async fn purge_in(tx: &mut Transaction<'_, Sqlite>, now: i64) -> Result<u64, StorageError> {
        sqlx::query(
            "DELETE FROM hash_fields WHERE key IN (SELECT key FROM hash_keys WHERE expires_at_ms <= ?)",
        )
        .bind(now)
        .execute(&mut **tx)
        .await
        .map_err(query_err)?;

        let purged = sqlx::query("DELETE FROM hash_keys WHERE expires_at_ms <= ?")
            .bind(now)
            .execute(&mut **tx)
            .await
            .map_err(query_err)?
            .rows_affected();

        Ok(purged)
    }

    /// Physically removes every expired hash. Returns how many were removed.
    pub async fn purge_expired(&self) -> Result<u64, StorageError> {
        let mut tx = self.pool.begin().await.map_err(query_err)?;
        let purged = Self::purge_in(&mut tx, Self::now_ms()).await?;
        tx.commit().await.map_err(query_err)?;

        if purged > 0 {
            debug!(purged, "Purged expired hashes");
        }
        Ok(purged)
    }
}

#[async_trait]
impl HashStore for SqliteStore {
    async fn hset_with_expiry(
        &self,
        key: &str,
        fields: &[(&str, &[u8])],
        ttl: Duration,
    ) -> Result<(), StorageError> {
        validate_ttl(ttl)?;

        let now = Self::now_ms();
        let mut tx = self.pool.begin().await.map_err(query_err)?;

        Self::purge_in(&mut tx, now).await?;

        sqlx::query("DELETE FROM hash_fields WHERE key = ?")
            .bind(key)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;

        sqlx::query(
            r#"
            INSERT INTO hash_keys (key, expires_at_ms)
            VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET expires_at_ms = excluded.expires_at_ms
            "#,
        )
        .bind(key)
        .bind(Self::deadline_ms(ttl))
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;

        for (field, value) in fields {
            sqlx::query("INSERT INTO hash_fields (key, field, value) VALUES (?, ?, ?)")
                .bind(key)
                .bind(*field)
                .bind(*value)
                .execute(&mut *tx)
                .await
                .map_err(query_err)?;
        }

        tx.commit().await.map_err(query_err)?;

        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let row: Option<(Vec<u8>,)> = sqlx::query_as(
            r#"
            SELECT f.value FROM hash_fields f
            JOIN hash_keys k ON k.key = f.key
            WHERE f.key = ? AND f.field = ? AND k.expires_at_ms > ?
            "#,
        )
        .bind(key)
        .bind(field)
        .bind(Self::now_ms())
        .fetch_optional(&self.pool)
        .await
        .map_err(query_err)?;

        Ok(row.map(|(v,)| v))
    }

    async fn hgetall(&self, key: &str) -> Result<Option<HashFields>, StorageError> {
        let rows: Vec<(Option<String>, Option<Vec<u8>>)> = sqlx::query_as(
            r#"
            SELECT f.field, f.value FROM hash_keys k
            LEFT JOIN hash_fields f ON f.key = k.key
            WHERE k.key = ? AND k.expires_at_ms > ?
            "#,
        )
        .bind(key)
        .bind(Self::now_ms())
        .fetch_all(&self.pool)
        .await
        .map_err(query_err)?;

        if rows.is_empty() {
            return Ok(None);
        }

        let fields: HashMap<String, Vec<u8>> = rows
            .into_iter()
            .filter_map(|(field, value)| Some((field?, value?)))
            .collect();

        Ok(Some(fields))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StorageError> {
        validate_ttl(ttl)?;

        let updated =
            sqlx::query("UPDATE hash_keys SET expires_at_ms = ? WHERE key = ? AND expires_at_ms > ?")
                .bind(Self::deadline_ms(ttl))
                .bind(key)
                .bind(Self::now_ms())
                .execute(&self.pool)
                .await
                .map_err(query_err)?
                .rows_affected();

        Ok(updated > 0)
    }

    async fn del(&self, key: &str) -> Result<bool, StorageError> {
        let mut tx = self.pool.begin().await.map_err(query_err)?;

        let removed = sqlx::query("DELETE FROM hash_keys WHERE key = ? AND expires_at_ms > ?")
            .bind(key)
            .bind(Self::now_ms())
            .execute(&mut *tx)
            .await
            .map_err(query_err)?
            .rows_affected();

        sqlx::query("DELETE FROM hash_fields WHERE key = ?")
            .bind(key)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;

        tx.commit().await.map_err(query_err)?;

        Ok(removed > 0)
    }

    async fn take(&self, key: &str) -> Result<Option<HashFields>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(query_err)?;

        // The key row is deleted first so the write lock is held before reading.
        let removed = sqlx::query("DELETE FROM hash_keys WHERE key = ? AND expires_at_ms > ?")
            .bind(key)
            .bind(Self::now_ms())
            .execute(&mut *tx)
            .await
            .map_err(query_err)?
            .rows_affected();

        let rows: Vec<(String, Vec<u8>)> = if removed > 0 {
            sqlx::query_as("SELECT field, value FROM hash_fields WHERE key = ?")
                .bind(key)
                .fetch_all(&mut *tx)
                .await
                .map_err(query_err)?
        } else {
            Vec::new()
        };

        sqlx::query("DELETE FROM hash_fields WHERE key = ?")
            .bind(key)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;

        tx.commit().await.map_err(query_err)?;

        if removed == 0 {
            return Ok(None);
        }

        Ok(Some(rows.into_iter().collect()))
    }
}
