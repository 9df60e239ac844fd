//! Presence flag.
//!
//! A plaintext `sled` entry recording whether a wallet has ever been saved.
//! It is read at launch, before any PIN is known, to pick between the
//! "create / import" and "unlock" screens. Values are the strings `"true"`
//! and `"false"`.

use std::path::PathBuf;
use tracing::warn;

use super::db::shared_db;
use super::error::StoreResult;
use crate::config::{StorageConfig, PRESENCE_STORE};

#[derive(Clone, Debug)]
pub struct PresenceFlag {
    path: PathBuf,
    key: String,
}

impl PresenceFlag {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            path: config.store_path(PRESENCE_STORE),
            key: config.presence_flag_key.clone(),
        }
    }

    pub fn set(&self, value: bool) -> StoreResult<()> {
        let db = shared_db(&self.path)?;
        let text = if value { "true" } else { "false" };
        db.insert(self.key.as_bytes(), text.as_bytes())?;
        db.flush()?;
        Ok(())
    }

    /// The stored value, `None` if never set or not a boolean. Does not
    /// create the flag's directory.
    pub fn try_get(&self) -> StoreResult<Option<bool>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let db = shared_db(&self.path)?;
        let value = db.get(self.key.as_bytes())?;
        Ok(match value.as_deref() {
            Some(b"true") => Some(true),
            Some(b"false") => Some(false),
            _ => None,
        })
    }

    /// The stored value; `false` when unset or unreadable.
    pub fn get(&self) -> bool {
        match self.try_get() {
            Ok(value) => value.unwrap_or(false),
            Err(e) => {
                warn!(error = %e, "presence flag unreadable, assuming no wallet");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_flag_reads_false_without_creating_anything() {
        let dir = tempfile::tempdir().unwrap();
        let flag = PresenceFlag::new(&StorageConfig::new(dir.path()));
        assert_eq!(flag.try_get().unwrap(), None);
        assert!(!flag.get());
        assert!(!dir.path().join(PRESENCE_STORE).exists());
    }

    #[test]
    fn set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let flag = PresenceFlag::new(&StorageConfig::new(dir.path()));
        flag.set(true).unwrap();
        assert!(flag.get());
        flag.set(false).unwrap();
        assert_eq!(flag.try_get().unwrap(), Some(false));
    }

    #[test]
    fn repeated_writes_and_reads() {
        let dir = tempfile::tempdir().unwrap();
        let flag = PresenceFlag::new(&StorageConfig::new(dir.path()));
        for i in 0..200 {
            flag.set(i % 2 == 0).unwrap();
            assert_eq!(flag.try_get().unwrap(), Some(i % 2 == 0));
        }
    }

    #[test]
    fn flag_key_is_configurable() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StorageConfig::new(dir.path());
        PresenceFlag::new(&config).set(true).unwrap();

        config.presence_flag_key = "other_app_have_wallet".into();
        assert!(!PresenceFlag::new(&config).get());
    }

    #[test]
    fn garbage_value_reads_false() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::new(dir.path());
        shared_db(&config.store_path(PRESENCE_STORE))
            .unwrap()
            .insert(config.presence_flag_key.as_bytes(), b"yes".to_vec())
            .unwrap();
        assert!(!PresenceFlag::new(&config).get());
    }
}
