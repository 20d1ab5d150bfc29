//! AES-256-GCM authenticated encryption.
//!
//! Two layers are provided. [`encrypt`] and [`decrypt`] work on raw bytes with
//! optional associated data. [`encrypt_token`] and [`decrypt_token`] wrap them
//! into a self-describing text token that can be stored or transported as-is.
//!
//! ## Token Format
//!
//! ```text
//! base64url( version (1) || issued_at (8, big endian) || nonce (12) || ciphertext || tag (16) )
//! ```
//!
//! The 9-byte header is authenticated as associated data, so neither the
//! version nor the timestamp can be altered without failing decryption.

use std::time::{SystemTime, UNIX_EPOCH};

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE, Engine};
use zeroize::{Zeroize, Zeroizing};

use crate::error::CryptoError;
use crate::random::generate_nonce;

/// Size of an AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;

/// Size of a GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Size of a GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Current token format version.
pub const TOKEN_VERSION: u8 = 0x01;

/// Version byte plus the issue timestamp.
const HEADER_SIZE: usize = 1 + 8;

fn check_key(key: &[u8]) -> Result<(), CryptoError> {
    if key.len() != KEY_SIZE {
        return Err(CryptoError::InvalidKey(format!(
            "expected {} bytes, got {}",
            KEY_SIZE,
            key.len()
        )));
    }
    Ok(())
}

/// Encrypts plaintext using AES-256-GCM.
///
/// The nonce is automatically generated and prepended to the ciphertext.
/// Format: `nonce (12 bytes) || ciphertext || tag (16 bytes)`
///
/// # Arguments
///
/// * `key` - 32-byte encryption key
/// * `plaintext` - Data to encrypt
/// * `associated_data` - Optional additional data to authenticate (not encrypted)
pub fn encrypt(
    key: &[u8],
    plaintext: &[u8],
    associated_data: Option<&[u8]>,
) -> Result<Vec<u8>, CryptoError> {
    check_key(key)?;

    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let nonce_bytes = generate_nonce();
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = match associated_data {
        Some(aad) => cipher
            .encrypt(
                nonce,
                aes_gcm::aead::Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?,
        None => cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?,
    };

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);

    Ok(result)
}

/// Decrypts ciphertext using AES-256-GCM.
///
/// Expects the nonce to be prepended to the ciphertext (as produced by `encrypt`).
/// Any authentication failure is reported as [`CryptoError::InvalidToken`].
///
/// # Returns
///
/// Decrypted plaintext wrapped in `Zeroizing` for automatic memory cleanup.
pub fn decrypt(
    key: &[u8],
    ciphertext: &[u8],
    associated_data: Option<&[u8]>,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    check_key(key)?;

    if ciphertext.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::InvalidToken);
    }

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

    let nonce = Nonce::from_slice(&ciphertext[..NONCE_SIZE]);
    let encrypted = &ciphertext[NONCE_SIZE..];

    let plaintext = match associated_data {
        Some(aad) => cipher
            .decrypt(
                nonce,
                aes_gcm::aead::Payload {
                    msg: encrypted,
                    aad,
                },
            )
            .map_err(|_| CryptoError::InvalidToken)?,
        None => cipher
            .decrypt(nonce, encrypted)
            .map_err(|_| CryptoError::InvalidToken)?,
    };

    Ok(Zeroizing::new(plaintext))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Seals a UTF-8 string into a URL-safe token stamped with the current time.
pub fn encrypt_token(key: &[u8], plaintext: &str) -> Result<String, CryptoError> {
    encrypt_token_at(key, plaintext, unix_now())
}

fn encrypt_token_at(key: &[u8], plaintext: &str, issued_at: u64) -> Result<String, CryptoError> {
    let mut header = [0u8; HEADER_SIZE];
    header[0] = TOKEN_VERSION;
    header[1..].copy_from_slice(&issued_at.to_be_bytes());

    let sealed = encrypt(key, plaintext.as_bytes(), Some(&header))?;

    let mut raw = Vec::with_capacity(HEADER_SIZE + sealed.len());
    raw.extend_from_slice(&header);
    raw.extend_from_slice(&sealed);

    Ok(URL_SAFE.encode(raw))
}

/// Opens a token produced by [`encrypt_token`].
///
/// Fails closed: every malformed, tampered or wrongly keyed token yields
/// [`CryptoError::InvalidToken`] and no plaintext.
pub fn decrypt_token(key: &[u8], token: &str) -> Result<Zeroizing<String>, CryptoError> {
    check_key(key)?;

    let raw = URL_SAFE
        .decode(token.as_bytes())
        .map_err(|_| CryptoError::InvalidToken)?;

    if raw.len() < HEADER_SIZE + NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::InvalidToken);
    }

    let (header, sealed) = raw.split_at(HEADER_SIZE);
    if header[0] != TOKEN_VERSION {
        return Err(CryptoError::InvalidToken);
    }

    let mut plaintext = decrypt(key, sealed, Some(header))?;

    let bytes = std::mem::take(&mut *plaintext);
    match String::from_utf8(bytes) {
        Ok(text) => Ok(Zeroizing::new(text)),
        Err(e) => {
            let mut bytes = e.into_bytes();
            bytes.zeroize();
            Err(CryptoError::InvalidToken)
        },
    }
}
