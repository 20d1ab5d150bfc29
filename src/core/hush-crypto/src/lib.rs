//! # Hush Crypto
//!
//! Cryptographic primitives for Hush one-time secrets.
//!
//! This crate provides:
//! - Passphrase stretching (PBKDF2-HMAC-SHA256) and key expansion (HKDF-SHA256)
//! - Key composition from the master key and an optional passphrase
//! - Authenticated encryption (AES-256-GCM) into self-describing tokens
//! - Secure random generation

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aead;
pub mod compose;
pub mod error;
pub mod kdf;
pub mod keys;
pub mod random;

pub use compose::{compose_key, KeyInput};
pub use error::CryptoError;
pub use keys::{CompositeKey, MasterKey};
