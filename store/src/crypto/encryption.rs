//! # AES-256-GCM Row Sealing
//!
//! Every value written to the encrypted wallet store (rows and the schema
//! marker alike) is sealed here before it reaches `sled`, and opened here on
//! the way back.
//!
//! ## Wire format
//!
//! [`seal`] returns `nonce || ciphertext` as a single `Vec<u8>`: 12 bytes of
//! random nonce, then the ciphertext with its 16-byte tag appended. The row's
//! storage key is passed as additional authenticated data, so a sealed value
//! copied under a different key fails to open.
//!
//! Nonces are random 96-bit values from the OS RNG. A wallet store sees a
//! handful of writes per session, far below the birthday bound.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use thiserror::Error;

use crate::config::{AES_KEY_LENGTH, AES_NONCE_LENGTH, AES_TAG_LENGTH};

/// Errors from sealing or opening a value.
///
/// Opening failures carry no detail: a wrong key and a corrupted value
/// look the same from here.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncryptionError {
    #[error("encryption failed")]
    EncryptFailed,

    #[error("decryption failed -- wrong key or corrupted data")]
    DecryptFailed,

    #[error("sealed value too short: must be at least {} bytes", AES_NONCE_LENGTH + AES_TAG_LENGTH)]
    SealedTooShort,
}

/// Seal `plaintext` under `key`, authenticating `aad` alongside it.
pub fn seal(
    key: &[u8; AES_KEY_LENGTH],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| EncryptionError::EncryptFailed)?;

    let mut nonce_bytes = [0u8; AES_NONCE_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| EncryptionError::EncryptFailed)?;

    let mut out = Vec::with_capacity(AES_NONCE_LENGTH + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Open a value produced by [`seal`] with the same key and `aad`.
pub fn open(
    key: &[u8; AES_KEY_LENGTH],
    sealed: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    if sealed.len() < AES_NONCE_LENGTH + AES_TAG_LENGTH {
        return Err(EncryptionError::SealedTooShort);
    }

    let (nonce_bytes, ciphertext) = sealed.split_at(AES_NONCE_LENGTH);
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| EncryptionError::DecryptFailed)?;

    cipher
        .decrypt(
            Nonce::from_slice(nonce_bytes),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| EncryptionError::DecryptFailed)
}
