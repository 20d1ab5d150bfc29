//! Secret records and their stored hash layout.
//!
//! A record is stored as one hash under `hush:{id}`:
//!
//! | field        | value                                        |
//! |--------------|----------------------------------------------|
//! | `secret`     | cipher token (URL-safe base64 text)          |
//! | `salt`       | URL-safe base64 salt, empty for plaintext    |
//! | `type`       | `0` plaintext, `1` passphrase protected      |
//! | `expires_at` | Unix milliseconds                            |

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;

use hush_crypto::random::{self, SALT_SIZE, SECRET_ID_BYTES};
use hush_storage::HashFields;

use crate::error::SecretsError;

const KEY_PREFIX: &str = "hush:";

const FIELD_SECRET: &str = "secret";
const FIELD_SALT: &str = "salt";
/// Name of the field holding the protection kind.
pub(crate) const FIELD_TYPE: &str = "type";
const FIELD_EXPIRES_AT: &str = "expires_at";

/// Opaque identifier of a secret: 128 random bits as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretId(String);

impl SecretId {
    /// Draws a fresh identifier from the OS CSPRNG.
    pub fn generate() -> Self {
        Self(random::generate_token(SECRET_ID_BYTES))
    }

    /// Parses a caller-supplied identifier.
    ///
    /// Returns `None` unless the input is exactly 32 lowercase hex characters.
    pub fn parse(s: &str) -> Option<Self> {
        let valid = s.len() == SECRET_ID_BYTES * 2
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(s.to_string()))
    }

    /// The identifier as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key of the backing hash.
    pub fn store_key(&self) -> String {
        format!("{KEY_PREFIX}{}", self.0)
    }
}

impl fmt::Display for SecretId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a secret needs a passphrase, without the salt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionKind {
    /// Revealed with the identifier alone.
    Plaintext,
    /// Revealed only with the right passphrase.
    Passphrase,
}

impl ProtectionKind {
    /// Lowercase name used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plaintext => "plaintext",
            Self::Passphrase => "passphrase",
        }
    }

    fn type_code(self) -> &'static [u8] {
        match self {
            Self::Plaintext => b"0",
            Self::Passphrase => b"1",
        }
    }

    /// Decodes the stored `type` field.
    pub(crate) fn from_type_code(code: &[u8]) -> Result<Self, SecretsError> {
        match code {
            b"0" => Ok(Self::Plaintext),
            b"1" => Ok(Self::Passphrase),
            other => Err(SecretsError::CorruptRecord(format!(
                "unknown protection type {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }
}

impl fmt::Display for ProtectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a secret is protected. A salt exists exactly when a passphrase does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Protection {
    /// Encrypted under the master key only.
    Plaintext,
    /// Encrypted under a key composed from the master key and a passphrase.
    Passphrase {
        /// Per-record KDF salt.
        salt: [u8; SALT_SIZE],
    },
}

impl Protection {
    /// Drops the salt.
    pub fn kind(&self) -> ProtectionKind {
        match self {
            Self::Plaintext => ProtectionKind::Plaintext,
            Self::Passphrase { .. } => ProtectionKind::Passphrase,
        }
    }

    fn encoded_salt(&self) -> String {
        match self {
            Self::Plaintext => String::new(),
            Self::Passphrase { salt } => URL_SAFE.encode(salt),
        }
    }

    fn decode(kind: ProtectionKind, salt_text: &str) -> Result<Self, SecretsError> {
        match (kind, salt_text.is_empty()) {
            (ProtectionKind::Plaintext, true) => Ok(Self::Plaintext),
            (ProtectionKind::Plaintext, false) => Err(SecretsError::CorruptRecord(
                "plaintext record carries a salt".into(),
            )),
            (ProtectionKind::Passphrase, true) => Err(SecretsError::CorruptRecord(
                "passphrase record has no salt".into(),
            )),
            (ProtectionKind::Passphrase, false) => {
                let bytes = URL_SAFE
                    .decode(salt_text)
                    .map_err(|e| SecretsError::CorruptRecord(format!("bad salt encoding: {e}")))?;
                let salt: [u8; SALT_SIZE] = bytes.try_into().map_err(|_| {
                    SecretsError::CorruptRecord(format!("salt must be {SALT_SIZE} bytes"))
                })?;
                Ok(Self::Passphrase { salt })
            },
        }
    }
}

/// One stored secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRecord {
    /// Lookup identifier.
    pub id: SecretId,
    /// Cipher token.
    pub ciphertext: String,
    /// Protection and salt.
    pub protection: Protection,
    /// Unix milliseconds after which the store drops the record.
    pub expires_at: u64,
}

impl SecretRecord {
    /// Builds a record expiring `ttl` from now.
    pub fn new(id: SecretId, ciphertext: String, protection: Protection, ttl: Duration) -> Self {
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        Self {
            id,
            ciphertext,
            protection,
            expires_at: now_ms().saturating_add(ttl_ms),
        }
    }

    /// Encodes the record as hash fields.
    pub(crate) fn to_fields(&self) -> Vec<(&'static str, Vec<u8>)> {
        vec![
            (FIELD_SECRET, self.ciphertext.as_bytes().to_vec()),
            (FIELD_SALT, self.protection.encoded_salt().into_bytes()),
            (FIELD_TYPE, self.protection.kind().type_code().to_vec()),
            (FIELD_EXPIRES_AT, self.expires_at.to_string().into_bytes()),
        ]
    }

    /// Decodes a stored hash.
    pub(crate) fn from_fields(id: SecretId, fields: &HashFields) -> Result<Self, SecretsError> {
        let text = |name: &str| -> Result<&str, SecretsError> {
            let raw = fields
                .get(name)
                .ok_or_else(|| SecretsError::CorruptRecord(format!("missing field {name}")))?;
            std::str::from_utf8(raw)
                .map_err(|_| SecretsError::CorruptRecord(format!("field {name} is not UTF-8")))
        };

        let kind = ProtectionKind::from_type_code(text(FIELD_TYPE)?.as_bytes())?;
        let protection = Protection::decode(kind, text(FIELD_SALT)?)?;

        let ciphertext = text(FIELD_SECRET)?;
        if ciphertext.is_empty() {
            return Err(SecretsError::CorruptRecord("empty ciphertext".into()));
        }

        let expires_at = text(FIELD_EXPIRES_AT)?
            .parse::<u64>()
            .map_err(|e| SecretsError::CorruptRecord(format!("bad expires_at: {e}")))?;

        Ok(Self {
            id,
            ciphertext: ciphertext.to_string(),
            protection,
            expires_at,
        })
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
