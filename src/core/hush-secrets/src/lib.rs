//! # Hush Secrets Engine
//!
//! One-time secrets: each secret is encrypted, stored with a TTL, and
//! destroyed the first time it is successfully revealed.
//!
//! ## Lifecycle
//!
//! - [`SecretsEngine::submit`] encrypts and stores a secret, returning its id
//! - [`SecretsEngine::view`] tells whether a passphrase is needed, without
//!   consuming anything
//! - [`SecretsEngine::reveal`] decrypts, then deletes
//!
//! A secret is deleted only once it has been decrypted, so a wrong
//! passphrase or a mismatched master key leaves it in place.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod record;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use zeroize::Zeroizing;

use hush_crypto::random::{self, SALT_SIZE};
use hush_crypto::{aead, compose_key, CompositeKey, CryptoError, KeyInput, MasterKey};
use hush_storage::HashStore;

pub use config::EngineConfig;
pub use error::SecretsError;
pub use record::{Protection, ProtectionKind, SecretId, SecretRecord};
pub use store::RecordStore;

/// Creates, inspects and reveals one-time secrets.
pub struct SecretsEngine {
    store: RecordStore,
    master_key: Arc<MasterKey>,
    config: EngineConfig,
}

impl SecretsEngine {
    /// Creates an engine over `backend`.
    ///
    /// The master key is owned by the engine for its whole lifetime.
    pub fn new(
        backend: Arc<dyn HashStore>,
        master_key: MasterKey,
        config: EngineConfig,
    ) -> Result<Self, SecretsError> {
        config.validate()?;

        info!(
            kdf_iterations = config.kdf_iterations,
            max_ttl_secs = config.max_ttl.as_secs(),
            max_secret_bytes = config.max_secret_bytes,
            "Secrets engine initialized"
        );

        Ok(Self {
            store: RecordStore::new(backend),
            master_key: Arc::new(master_key),
            config,
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Encrypts and stores a secret. Returns the id needed to reveal it.
    ///
    /// An empty passphrase is treated as no passphrase.
    pub async fn submit(
        &self,
        secret: &str,
        passphrase: Option<&str>,
        ttl: Duration,
    ) -> Result<SecretId, SecretsError> {
        self.validate_submission(secret, ttl)?;

        let passphrase = passphrase.filter(|p| !p.is_empty());

        let (protection, key) = match passphrase {
            None => (Protection::Plaintext, self.master_only_key()?),
            Some(passphrase) => {
                let salt = random::generate_salt();
                let key = self.passphrase_key(passphrase, salt).await?;
                (Protection::Passphrase { salt }, key)
            },
        };

        let ciphertext = aead::encrypt_token(key.as_bytes(), secret)?;
        drop(key);

        let id = SecretId::generate();
        let record = SecretRecord::new(id.clone(), ciphertext, protection, ttl);
        self.store.create(&record, ttl).await?;

        info!(
            id = %id,
            protection = %record.protection.kind(),
            ttl_secs = ttl.as_secs(),
            "Secret submitted"
        );
        Ok(id)
    }

    /// Reports whether a secret needs a passphrase. Never consumes it.
    pub async fn view(&self, id: &str) -> Result<ProtectionKind, SecretsError> {
        let id = Self::parse_id(id)?;

        match self.store.protection(&id).await? {
            Some(kind) => {
                debug!(id = %id, protection = %kind, "Secret viewed");
                Ok(kind)
            },
            None => {
                debug!(id = %id, "Secret not found");
                Err(SecretsError::NotFound)
            },
        }
    }

    /// Decrypts a secret and destroys it.
    ///
    /// Exactly one caller ever receives the plaintext. Any failure to
    /// decrypt leaves the secret stored; a wrong passphrase returns
    /// [`SecretsError::InvalidPassphrase`]. A passphrase supplied for an
    /// unprotected secret is ignored.
    pub async fn reveal(
        &self,
        id: &str,
        passphrase: Option<&str>,
    ) -> Result<Zeroizing<String>, SecretsError> {
        let id = Self::parse_id(id)?;

        let record = self.store.read(&id).await?.ok_or_else(|| {
            debug!(id = %id, "Secret not found");
            SecretsError::NotFound
        })?;

        let plaintext = match record.protection {
            Protection::Plaintext => {
                let key = self.master_only_key()?;
                aead::decrypt_token(key.as_bytes(), &record.ciphertext).map_err(|e| {
                    error!(id = %id, error = %e, "Secret could not be decrypted");
                    SecretsError::from(e)
                })?
            },
            Protection::Passphrase { salt } => {
                let passphrase = passphrase.filter(|p| !p.is_empty()).ok_or_else(|| {
                    SecretsError::Validation("passphrase required".into())
                })?;
                let key = self.passphrase_key(passphrase, salt).await?;
                match aead::decrypt_token(key.as_bytes(), &record.ciphertext) {
                    Ok(plaintext) => plaintext,
                    Err(CryptoError::InvalidToken) => {
                        warn!(id = %id, "Invalid passphrase");
                        return Err(SecretsError::InvalidPassphrase);
                    },
                    Err(e) => return Err(e.into()),
                }
            },
        };

        // Only the caller whose delete lands gets the plaintext.
        if !self.store.remove(&id).await? {
            debug!(id = %id, "Secret revealed by a concurrent caller");
            return Err(SecretsError::NotFound);
        }

        info!(id = %id, protection = %record.protection.kind(), "Secret revealed");
        Ok(plaintext)
    }

    fn validate_submission(&self, secret: &str, ttl: Duration) -> Result<(), SecretsError> {
        if secret.is_empty() {
            return Err(SecretsError::Validation("secret cannot be empty".into()));
        }
        if secret.len() > self.config.max_secret_bytes {
            return Err(SecretsError::Validation(format!(
                "secret exceeds {} bytes",
                self.config.max_secret_bytes
            )));
        }
        if ttl.is_zero() {
            return Err(SecretsError::Validation("ttl must be > 0".into()));
        }
        if ttl > self.config.max_ttl {
            return Err(SecretsError::Validation(format!(
                "ttl exceeds {} seconds",
                self.config.max_ttl.as_secs()
            )));
        }
        Ok(())
    }

    fn parse_id(id: &str) -> Result<SecretId, SecretsError> {
        SecretId::parse(id).ok_or(SecretsError::NotFound)
    }

    fn master_only_key(&self) -> Result<CompositeKey, SecretsError> {
        Ok(compose_key(&self.master_key, KeyInput::Master)?)
    }

    /// Runs PBKDF2 on the blocking pool.
    async fn passphrase_key(
        &self,
        passphrase: &str,
        salt: [u8; SALT_SIZE],
    ) -> Result<CompositeKey, SecretsError> {
        let master = Arc::clone(&self.master_key);
        let passphrase = Zeroizing::new(passphrase.to_string());
        let iterations = self.config.kdf_iterations;

        let key = tokio::task::spawn_blocking(move || {
            compose_key(
                &master,
                KeyInput::Passphrase {
                    passphrase: &passphrase,
                    salt: &salt,
                    iterations,
                },
            )
        })
        .await
        .map_err(|e| SecretsError::Crypto(format!("key derivation task failed: {e}")))??;

        Ok(key)
    }
}
