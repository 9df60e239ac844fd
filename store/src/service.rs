//! # WalletStorage — the app-facing surface
//!
//! Async, fail-soft wrapper over [`StoreManager`]. Every method runs its
//! blocking sled work on tokio's blocking pool, reports any failure to the
//! configured [`CrashReporter`], and returns a benign value instead of an
//! error:
//!
//! | Returns        | On failure |
//! |----------------|------------|
//! | `bool` success | `false`    |
//! | `Option<T>`    | `None`     |
//! | `Vec<T>`       | empty      |
//!
//! Callers that need to tell failures apart use [`WalletStorage::manager`]
//! and get the [`StoreError`] directly.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::StorageConfig;
use crate::crypto::StoreKey;
use crate::model::{Payee, Preferences, PriceCache, TransactionDetails};
use crate::reporter::CrashReporter;
use crate::schema::StoreSchema;
use crate::storage::{CompactionReport, StoreError, StoreHandle, StoreManager, StoreResult};

#[derive(Clone, Debug)]
pub struct WalletStorage {
    manager: Arc<StoreManager>,
}

impl WalletStorage {
    pub fn new(config: StorageConfig, reporter: Arc<dyn CrashReporter>) -> Self {
        Self::from_manager(Arc::new(StoreManager::new(config, reporter)))
    }

    pub fn from_manager(manager: Arc<StoreManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &StoreManager {
        &self.manager
    }

    /// Run `op` on the blocking pool; report and default on any failure,
    /// including a panicked task.
    async fn run<T, F>(&self, context: &'static str, op: F) -> T
    where
        T: Default + Send + 'static,
        F: FnOnce(&StoreManager) -> StoreResult<T> + Send + 'static,
    {
        let manager = Arc::clone(&self.manager);
        let result = tokio::task::spawn_blocking(move || op(manager.as_ref()))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))
            .and_then(|r| r);
        self.manager.soften(context, result)
    }

    /// Async, fail-soft [`StoreManager::with_store`].
    pub async fn with_store<T, F>(
        &self,
        context: &'static str,
        schema: StoreSchema,
        key: Option<StoreKey>,
        op: F,
    ) -> T
    where
        T: Default + Send + 'static,
        F: FnOnce(&StoreHandle) -> StoreResult<T> + Send + 'static,
    {
        self.run(context, move |m| m.with_store(&schema, key.as_ref(), op))
            .await
    }

    // -- Wallet -------------------------------------------------------------

    pub async fn save_wallet(&self, doc: &Value, pin: &str) -> bool {
        let (doc, pin) = (doc.clone(), pin.to_string());
        self.run("failed to save wallet", move |m| {
            m.save_wallet(&doc, &pin).map(|()| true)
        })
        .await
    }

    pub async fn load_wallet(&self, pin: &str) -> Option<Value> {
        let pin = pin.to_string();
        self.run("failed to load wallet", move |m| m.load_wallet(&pin))
            .await
    }

    /// Whether a wallet has ever been saved. Needs no PIN.
    pub async fn have_wallet(&self) -> bool {
        self.run("failed to read wallet presence flag", |m| {
            Ok(m.presence().try_get()?.unwrap_or(false))
        })
        .await
    }

    pub async fn set_have_wallet(&self, value: bool) -> bool {
        self.run("failed to set wallet presence flag", move |m| {
            m.presence().set(value).map(|()| true)
        })
        .await
    }

    // -- Preferences --------------------------------------------------------

    pub async fn save_preferences(&self, prefs: &Preferences) -> bool {
        let prefs = prefs.clone();
        self.run("failed to save preferences", move |m| {
            m.save_preferences(&prefs).map(|()| true)
        })
        .await
    }

    pub async fn load_preferences(&self) -> Option<Preferences> {
        self.run("failed to load preferences", |m| m.load_preferences())
            .await
    }

    // -- Payees -------------------------------------------------------------

    pub async fn save_payee(&self, payee: &Payee) -> bool {
        let payee = payee.clone();
        self.run("failed to save payee", move |m| {
            m.save_payee(&payee).map(|()| true)
        })
        .await
    }

    /// `true` if the removal ran, whether or not such a payee existed.
    pub async fn remove_payee(&self, nickname: &str) -> bool {
        let nickname = nickname.to_string();
        self.run("failed to remove payee", move |m| {
            m.remove_payee(&nickname).map(|_| true)
        })
        .await
    }

    pub async fn load_payees(&self) -> Vec<Payee> {
        self.run("failed to load payees", |m| m.load_payees()).await
    }

    // -- Transaction details ------------------------------------------------

    pub async fn save_transaction_details(&self, details: &TransactionDetails) -> bool {
        let details = details.clone();
        self.run("failed to save transaction details", move |m| {
            m.save_transaction_details(&details).map(|()| true)
        })
        .await
    }

    pub async fn load_transaction_details(&self) -> Vec<TransactionDetails> {
        self.run("failed to load transaction details", |m| {
            m.load_transaction_details()
        })
        .await
    }

    pub async fn transaction_details(&self, hash: &str) -> Option<TransactionDetails> {
        let hash = hash.to_string();
        self.run("failed to load transaction details", move |m| {
            m.transaction_details(&hash)
        })
        .await
    }

    // -- Price data ---------------------------------------------------------

    pub async fn save_price_data(&self, prices: &BTreeMap<String, f64>) -> bool {
        let prices = prices.clone();
        self.run("failed to save price data", move |m| {
            m.save_price_data(&prices).map(|()| true)
        })
        .await
    }

    pub async fn load_price_data(&self) -> Option<PriceCache> {
        self.run("failed to load price data", |m| m.load_price_data())
            .await
    }

    // -- Compaction ---------------------------------------------------------

    pub async fn last_compacted(&self) -> Option<DateTime<Utc>> {
        self.run("failed to read compaction info", |m| m.last_compacted())
            .await
    }

    /// Whether more than `interval_days` have passed since the last full
    /// compaction pass. `false` if that cannot be determined.
    pub async fn should_compact(&self, interval_days: u32) -> bool {
        self.run("failed to read compaction info", move |m| {
            m.should_compact(interval_days)
        })
        .await
    }

    /// [`should_compact`](Self::should_compact) with the configured interval.
    pub async fn compaction_due(&self) -> bool {
        let days = self.manager.config().compaction_interval_days;
        self.should_compact(days).await
    }

    pub async fn compact_all(&self, pin: &str) -> bool {
        let pin = pin.to_string();
        self.run("compaction task failed", move |m| Ok(m.compact_all(&pin)))
            .await
    }

    pub async fn compact_all_report(&self, pin: &str) -> CompactionReport {
        let pin = pin.to_string();
        self.run("compaction task failed", move |m| {
            Ok(m.compact_all_report(&pin))
        })
        .await
    }

    // -- Delete -------------------------------------------------------------

    /// Remove every store and clear the presence flag.
    pub async fn delete_all(&self) -> bool {
        self.run("failed to delete stores", |m| m.delete_all().map(|()| true))
            .await
    }
}
