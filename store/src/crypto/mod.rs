//! # Cryptographic Primitives
//!
//! Two small pieces: PIN-to-key derivation ([`kdf`]) and AES-256-GCM
//! sealing of stored values ([`encryption`]). Both are thin wrappers over
//! audited crates (`sha2`, `aes-gcm`).

pub mod encryption;
pub mod kdf;

pub use encryption::{open, seal, EncryptionError};
pub use kdf::{derive_key, StoreKey};
