//! Engine configuration.

use std::time::Duration;

use hush_crypto::kdf::DEFAULT_PBKDF2_ITERATIONS;
use hush_storage::MAX_TTL;

use crate::error::SecretsError;

/// Longest TTL accepted by default (7 days).
pub const DEFAULT_MAX_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Largest secret accepted by default (64 KiB).
pub const DEFAULT_MAX_SECRET_BYTES: usize = 64 * 1024;

/// Limits and cost parameters for [`SecretsEngine`](crate::SecretsEngine).
///
/// Loaded once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// PBKDF2 iterations for passphrase-protected secrets.
    pub kdf_iterations: u32,
    /// Upper bound on a secret's TTL.
    pub max_ttl: Duration,
    /// Upper bound on a secret's size in bytes.
    pub max_secret_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kdf_iterations: DEFAULT_PBKDF2_ITERATIONS,
            max_ttl: DEFAULT_MAX_TTL,
            max_secret_bytes: DEFAULT_MAX_SECRET_BYTES,
        }
    }
}

impl EngineConfig {
    /// Rejects settings under which no secret could ever be stored, and TTL
    /// limits the storage backends cannot honor.
    pub fn validate(&self) -> Result<(), SecretsError> {
        if self.kdf_iterations == 0 {
            return Err(SecretsError::Validation(
                "kdf_iterations must be > 0".into(),
            ));
        }
        if self.max_ttl.is_zero() {
            return Err(SecretsError::Validation("max_ttl must be > 0".into()));
        }
        if self.max_ttl > MAX_TTL {
            return Err(SecretsError::Validation(format!(
                "max_ttl must not exceed {} seconds",
                MAX_TTL.as_secs()
            )));
        }
        if self.max_secret_bytes == 0 {
            return Err(SecretsError::Validation(
                "max_secret_bytes must be > 0".into(),
            ));
        }
        Ok(())
    }
}
