//! Secure key types with automatic memory zeroization.
//!
//! All key types implement `Zeroize` and `ZeroizeOnDrop` to ensure
//! sensitive key material is securely erased from memory when no longer needed.

use base64::{engine::general_purpose::URL_SAFE, Engine};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::aead::KEY_SIZE;
use crate::error::CryptoError;
use crate::random::generate_key;

/// Minimum accepted master key length in bytes.
pub const MIN_MASTER_KEY_SIZE: usize = KEY_SIZE;

/// The cipher key actually used for one secret.
///
/// Produced by [`crate::compose::compose_key`] and dropped as soon as the
/// encryption or decryption it serves has finished.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CompositeKey {
    bytes: [u8; KEY_SIZE],
}

impl CompositeKey {
    /// Creates a composite key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            )));
        }

        let mut key_bytes = [0u8; KEY_SIZE];
        key_bytes.copy_from_slice(bytes);

        Ok(Self { bytes: key_bytes })
    }

    /// Returns the raw key bytes.
    ///
    /// Use with caution - the returned slice is not zeroized automatically.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for CompositeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// The server-held master key.
///
/// Loaded once at startup and never written anywhere. Any length of at least
/// [`MIN_MASTER_KEY_SIZE`] bytes is accepted; it is only ever used as HKDF
/// input keying material.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    bytes: Vec<u8>,
}

impl MasterKey {
    /// Generates a new random master key.
    pub fn generate() -> Self {
        let key = generate_key();
        Self { bytes: key.to_vec() }
    }

    /// Creates a master key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is shorter than 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < MIN_MASTER_KEY_SIZE {
            return Err(CryptoError::InvalidKey(format!(
                "master key must be at least {} bytes, got {}",
                MIN_MASTER_KEY_SIZE,
                bytes.len()
            )));
        }

        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Decodes a master key from URL-safe base64 (the format printed by
    /// [`MasterKey::to_base64`]).
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let decoded = Zeroizing::new(
            URL_SAFE
                .decode(encoded.trim().as_bytes())
                .map_err(|e| CryptoError::InvalidKey(format!("invalid base64: {e}")))?,
        );
        Self::from_bytes(&decoded)
    }

    /// Encodes the key as URL-safe base64.
    pub fn to_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(URL_SAFE.encode(&self.bytes))
    }

    /// Returns the raw key bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
