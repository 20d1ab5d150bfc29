//! # Hush Storage
//!
//! Storage abstraction layer for Hush backends.
//!
//! Secrets live in expiring hashes: one key per secret, a handful of named
//! fields, and a TTL enforced by the backend.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod memory;

pub use backend::{HashFields, HashStore, MAX_TTL};
pub use error::StorageError;
pub use memory::MemoryStore;
