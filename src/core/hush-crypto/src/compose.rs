//! Key composition for one-time secrets.
//!
//! Decides which key material encrypts a given secret:
//!
//! - Unprotected secrets use a key expanded from the master key alone.
//! - Passphrase-protected secrets fold the master key and the PBKDF2 output
//!   together through HKDF-SHA256, salted with the record salt and bound to a
//!   dedicated context. Neither the passphrase nor the master key alone is
//!   enough to reproduce the key.
//!
//! The output depends only on the master key, the record's protection kind,
//! its salt and the supplied passphrase, so nothing beyond the record itself
//! has to be stored.

use zeroize::Zeroizing;

use crate::aead::KEY_SIZE;
use crate::error::CryptoError;
use crate::kdf::{derive_encryption_key, derive_passphrase_key};
use crate::keys::{CompositeKey, MasterKey};

/// HKDF context for secrets without a passphrase.
pub const PLAINTEXT_CONTEXT: &[u8] = b"hush-secret-v1:plaintext";

/// HKDF context for passphrase-protected secrets.
pub const PASSPHRASE_CONTEXT: &[u8] = b"hush-secret-v1:passphrase";

/// What the caller contributes besides the master key.
#[derive(Clone, Copy)]
pub enum KeyInput<'a> {
    /// No passphrase: the master key alone.
    Master,
    /// A passphrase together with the record salt.
    Passphrase {
        /// Caller-supplied passphrase.
        passphrase: &'a str,
        /// Salt stored with the record.
        salt: &'a [u8],
        /// PBKDF2 iteration count.
        iterations: u32,
    },
}

impl std::fmt::Debug for KeyInput<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Master => f.write_str("Master"),
            Self::Passphrase { iterations, .. } => f
                .debug_struct("Passphrase")
                .field("passphrase", &"[REDACTED]")
                .field("iterations", iterations)
                .finish_non_exhaustive(),
        }
    }
}

/// Produces the cipher key for one secret.
///
/// For [`KeyInput::Passphrase`] this runs PBKDF2 and is expensive.
pub fn compose_key(master: &MasterKey, input: KeyInput<'_>) -> Result<CompositeKey, CryptoError> {
    let key = match input {
        KeyInput::Master => derive_encryption_key(master.as_bytes(), None, PLAINTEXT_CONTEXT)?,
        KeyInput::Passphrase {
            passphrase,
            salt,
            iterations,
        } => {
            let derived = derive_passphrase_key(passphrase, salt, iterations, KEY_SIZE)?;

            let mut ikm = Zeroizing::new(Vec::with_capacity(master.as_bytes().len() + KEY_SIZE));
            ikm.extend_from_slice(master.as_bytes());
            ikm.extend_from_slice(&derived);

            derive_encryption_key(&ikm, Some(salt), PASSPHRASE_CONTEXT)?
        },
    };

    CompositeKey::from_bytes(&*key)
}
