//! # PIN Key Derivation
//!
//! Turns the user's PIN into the 32-byte key that seals the wallet store.
//! The PIN is treated as opaque text and hashed with SHA-256 under a fixed
//! domain separator. The result is deterministic, so the same PIN always
//! reopens the same store, and it is never written anywhere.
//!
//! There is no failure mode here. A wrong PIN produces a perfectly good key
//! that simply does not open the store; the store manager reports that as an
//! open failure, indistinguishable from corruption.

use sha2::{Digest, Sha256};
use std::fmt;
use subtle::{Choice, ConstantTimeEq};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::{AES_KEY_LENGTH, KEY_DERIVATION_CONTEXT};

/// Symmetric key derived from a PIN. Zeroized on drop; compared in
/// constant time.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct StoreKey([u8; AES_KEY_LENGTH]);

impl ConstantTimeEq for StoreKey {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.0[..].ct_eq(&other.0[..])
    }
}

impl PartialEq for StoreKey {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl Eq for StoreKey {}

impl StoreKey {
    /// Raw key bytes, for handing to the cipher.
    pub fn as_bytes(&self) -> &[u8; AES_KEY_LENGTH] {
        &self.0
    }
}

// Key bytes never reach logs.
impl fmt::Debug for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StoreKey(..)")
    }
}

/// Derive the store key for `pin`.
///
/// ```
/// use plenteum_store::crypto::derive_key;
///
/// assert_eq!(derive_key("1234"), derive_key("1234"));
/// assert_ne!(derive_key("1234"), derive_key("1235"));
/// ```
pub fn derive_key(pin: &str) -> StoreKey {
    let mut hasher = Sha256::new();
    hasher.update(KEY_DERIVATION_CONTEXT);
    hasher.update((pin.len() as u64).to_be_bytes());
    hasher.update(pin.as_bytes());

    let mut key = [0u8; AES_KEY_LENGTH];
    key.copy_from_slice(&hasher.finalize());
    StoreKey(key)
}
