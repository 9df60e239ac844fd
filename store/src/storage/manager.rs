//! # Store Manager
//!
//! Owns the data root and the crash reporter, and is the only way to get at
//! a [`StoreHandle`]. [`StoreManager::with_store`] runs one
//! open → migrate → use → close cycle:
//!
//! ```text
//! with_store(schema, key, op)
//!   ├─ encrypted schema without key → KeyRequired
//!   ├─ finish or undo an interrupted compaction swap
//!   ├─ open sled dir <data_dir>/<store_id>
//!   ├─ check schema marker
//!   │    ├─ match / fresh store      → continue
//!   │    ├─ mismatch + Destructive   → drop dir, recreate empty
//!   │    └─ mismatch + Fail          → SchemaMismatch
//!   ├─ op(&handle)
//!   └─ close (flush), on every path
//! ```
//!
//! No handle outlives the call. The sled `Db` under it is shared and stays
//! open between operations; it is released only before its directory is
//! dropped, swapped or deleted.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::compaction::recover_interrupted_swap;
use super::db::{release_db, StoreHandle};
use super::error::{StoreError, StoreResult};
use super::presence::PresenceFlag;
use crate::config::{
    StorageConfig, COMPACTION_INFO_STORE, COMPACTION_SUFFIX, PAYEES_STORE, PREFERENCES_STORE,
    PRICE_DATA_STORE, RETIRED_SUFFIX, TRANSACTION_DETAILS_STORE, WALLET_STORE,
};
use crate::crypto::StoreKey;
use crate::reporter::{CrashReporter, TracingReporter};
use crate::schema::{price_data_schema, MigrationPolicy, StoreSchema};

/// Every directory `delete_all` removes. The presence flag is cleared
/// separately so it ends up `false` rather than unset.
const DATA_STORES: &[&str] = &[
    WALLET_STORE,
    PREFERENCES_STORE,
    PAYEES_STORE,
    PRICE_DATA_STORE,
    TRANSACTION_DETAILS_STORE,
    COMPACTION_INFO_STORE,
];

pub struct StoreManager {
    config: StorageConfig,
    reporter: Arc<dyn CrashReporter>,
}

impl std::fmt::Debug for StoreManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl StoreManager {
    pub fn new(config: StorageConfig, reporter: Arc<dyn CrashReporter>) -> Self {
        Self { config, reporter }
    }

    /// Manager that reports through `tracing`.
    pub fn with_tracing(config: StorageConfig) -> Self {
        Self::new(config, Arc::new(TracingReporter))
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn reporter(&self) -> &dyn CrashReporter {
        self.reporter.as_ref()
    }

    /// The presence flag under this manager's data root.
    pub fn presence(&self) -> PresenceFlag {
        PresenceFlag::new(&self.config)
    }

    /// Price cache schema for the configured currency list.
    pub fn price_schema(&self) -> StoreSchema {
        price_data_schema(&self.config.currencies)
    }

    /// Whether the store directory for `store_id` exists at all, once any
    /// interrupted compaction has been settled.
    pub fn store_exists(&self, store_id: &str) -> bool {
        let path = self.config.store_path(store_id);
        if let Err(e) = recover_interrupted_swap(&path) {
            warn!(store = %store_id, error = %e, "could not settle interrupted compaction");
        }
        path.exists()
    }

    // -----------------------------------------------------------------------
    // Open / Close
    // -----------------------------------------------------------------------

    fn open_store(&self, schema: &StoreSchema, key: Option<&StoreKey>) -> StoreResult<StoreHandle> {
        let key = match (schema.encrypted, key) {
            (true, None) => {
                return Err(StoreError::KeyRequired {
                    store: schema.store_id.clone(),
                })
            }
            (true, Some(key)) => Some(key.clone()),
            (false, _) => None,
        };

        let path = self.config.store_path(&schema.store_id);
        recover_interrupted_swap(&path)?;
        let handle = StoreHandle::open(&path, schema.clone(), key.clone())?;

        match handle.check_schema() {
            Ok(()) => Ok(handle),
            Err(StoreError::SchemaMismatch {
                store,
                expected,
                found,
            }) if schema.migration == MigrationPolicy::Destructive => {
                warn!(
                    store = %store,
                    %expected,
                    %found,
                    "schema mismatch, dropping store"
                );
                handle.close()?;
                release_db(&path);
                fs::remove_dir_all(&path)?;
                let fresh = StoreHandle::open(&path, schema.clone(), key)?;
                fresh.check_schema()?;
                info!(store = %store, "store recreated empty");
                Ok(fresh)
            }
            Err(e) => Err(e),
        }
    }

    /// Open the store described by `schema`, hand it to `op`, and close it
    /// again whatever `op` returns.
    ///
    /// `key` is required for encrypted schemas and ignored otherwise.
    pub fn with_store<T, F>(&self, schema: &StoreSchema, key: Option<&StoreKey>, op: F) -> StoreResult<T>
    where
        F: FnOnce(&StoreHandle) -> StoreResult<T>,
    {
        let handle = self.open_store(schema, key)?;
        let result = op(&handle);
        let closed = handle.close();
        match (result, closed) {
            (Err(e), _) => Err(e),
            (Ok(_), Err(e)) => Err(e),
            (Ok(value), Ok(())) => Ok(value),
        }
    }

    /// Fail-soft [`with_store`](Self::with_store): any failure is reported
    /// with `context` and `T::default()` comes back instead.
    pub fn with_store_soft<T, F>(
        &self,
        context: &str,
        schema: &StoreSchema,
        key: Option<&StoreKey>,
        op: F,
    ) -> T
    where
        T: Default,
        F: FnOnce(&StoreHandle) -> StoreResult<T>,
    {
        self.soften(context, self.with_store(schema, key, op))
    }

    /// Report the error of `result`, if any, and fall back to the default.
    pub fn soften<T: Default>(&self, context: &str, result: StoreResult<T>) -> T {
        match result {
            Ok(value) => value,
            Err(e) => {
                self.reporter.report(context, &e);
                T::default()
            }
        }
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    /// Remove every store, leftovers of interrupted compactions included,
    /// and clear the presence flag.
    pub fn delete_all(&self) -> StoreResult<()> {
        for store in DATA_STORES {
            let path = self.config.store_path(store);
            for dir in [
                sibling(&path, COMPACTION_SUFFIX),
                sibling(&path, RETIRED_SUFFIX),
                path,
            ] {
                release_db(&dir);
                remove_if_present(&dir)?;
            }
        }
        self.presence().set(false)?;
        info!(data_dir = %self.config.data_dir.display(), "all stores deleted");
        Ok(())
    }
}

/// `<dir>/<name>.<suffix>` next to `path`.
pub(crate) fn sibling(path: &Path, suffix: &str) -> std::path::PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{name}.{suffix}"))
}

pub(crate) fn remove_if_present(path: &Path) -> StoreResult<()> {
    if path.exists() {
        fs::remove_dir_all(path)?;
        debug!(path = %path.display(), "removed");
    }
    Ok(())
}
