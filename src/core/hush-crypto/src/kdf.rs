//! Key derivation functions.
//!
//! - PBKDF2-HMAC-SHA256 stretches a human passphrase into key material.
//! - HKDF-SHA256 (RFC 5869) expands and binds existing key material to a context.

use hkdf::Hkdf;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::aead::KEY_SIZE;
use crate::error::CryptoError;
use crate::random::SALT_SIZE;

/// Default PBKDF2 iteration count for passphrase derivation.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 480_000;

/// Derives key material from a passphrase using PBKDF2-HMAC-SHA256.
///
/// Deterministic: the same `(passphrase, salt, iterations, length)` always
/// yields the same output. Deliberately slow; run it off latency-sensitive
/// threads.
///
/// # Arguments
///
/// * `passphrase` - Human supplied passphrase
/// * `salt` - Random salt, at least 16 bytes
/// * `iterations` - PBKDF2 round count (must be > 0)
/// * `length` - Desired output length in bytes
pub fn derive_passphrase_key(
    passphrase: &str,
    salt: &[u8],
    iterations: u32,
    length: usize,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if length == 0 {
        return Err(CryptoError::InvalidInput(
            "output length must be > 0".to_string(),
        ));
    }

    if iterations == 0 {
        return Err(CryptoError::InvalidInput(
            "iteration count must be > 0".to_string(),
        ));
    }

    if salt.len() < SALT_SIZE {
        return Err(CryptoError::InvalidInput(format!(
            "salt must be at least {} bytes, got {}",
            SALT_SIZE,
            salt.len()
        )));
    }

    let mut okm = Zeroizing::new(vec![0u8; length]);
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, iterations, &mut okm);

    Ok(okm)
}

/// Derives a key using HKDF-SHA256.
///
/// HKDF is a two-step process:
/// 1. Extract: Creates a pseudorandom key from the input key material
/// 2. Expand: Generates output key material of desired length
///
/// # Arguments
///
/// * `ikm` - Input key material (the secret to derive from)
/// * `salt` - Optional salt value
/// * `info` - Context and application-specific information
/// * `length` - Desired output key length in bytes
pub fn derive_key(
    ikm: &[u8],
    salt: Option<&[u8]>,
    info: &[u8],
    length: usize,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if length == 0 {
        return Err(CryptoError::InvalidInput(
            "output length must be > 0".to_string(),
        ));
    }

    if length > 255 * 32 {
        return Err(CryptoError::InvalidInput(
            "output length too large for HKDF-SHA256".to_string(),
        ));
    }

    let hkdf = Hkdf::<Sha256>::new(salt, ikm);

    let mut okm = Zeroizing::new(vec![0u8; length]);
    hkdf.expand(info, &mut okm)
        .map_err(|_| CryptoError::KeyGenerationFailed("HKDF expansion failed".to_string()))?;

    Ok(okm)
}

/// Derives an AES-256 encryption key using HKDF-SHA256.
///
/// Convenience wrapper around `derive_key` that returns exactly 32 bytes.
pub fn derive_encryption_key(
    ikm: &[u8],
    salt: Option<&[u8]>,
    context: &[u8],
) -> Result<Zeroizing<[u8; KEY_SIZE]>, CryptoError> {
    let derived = derive_key(ikm, salt, context, KEY_SIZE)?;

    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    key.copy_from_slice(&derived);

    Ok(key)
}
