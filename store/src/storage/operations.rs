//! Typed record operations.
//!
//! One method per thing the app reads or writes. Each is a single
//! [`with_store`](StoreManager::with_store) cycle against the owning store
//! and returns the structured [`StoreError`](super::StoreError) on failure; the fail-soft
//! wrapper lives in [`WalletStorage`](crate::service::WalletStorage).

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::error::StoreResult;
use super::manager::StoreManager;
use crate::codec;
use crate::config::WALLET_STORE;
use crate::crypto::derive_key;
use crate::model::{CompactionInfo, Payee, Preferences, PriceCache, TransactionDetails, WalletRecord};
use crate::schema::{
    compaction_info_schema, payees_schema, preferences_schema, transaction_details_schema,
    wallet_schema, RecordKey,
};

impl StoreManager {
    // -- Wallet -------------------------------------------------------------

    /// Encode `doc` and store it as the wallet record under the key derived
    /// from `pin`, replacing any previous record. Marks a wallet as present
    /// once the write has committed.
    pub fn save_wallet(&self, doc: &Value, pin: &str) -> StoreResult<()> {
        let record = codec::encode(doc)?;
        let key = derive_key(pin);
        self.with_store(&wallet_schema(), Some(&key), |store| {
            store.write(|scope| scope.upsert(&record))
        })?;
        info!(
            subwallets = record.sub_wallets.sub_wallets.len(),
            inputs = record.input_count(),
            "wallet saved"
        );

        // The wallet itself is safe at this point; a stale flag only costs
        // an extra unlock prompt.
        if let Err(e) = self.presence().set(true) {
            self.reporter().report("failed to set wallet presence flag", &e);
        }
        Ok(())
    }

    /// The stored wallet document, or `None` if no wallet was ever saved.
    /// A wrong `pin` is an [`OpenFailure`](super::StoreError::OpenFailure).
    pub fn load_wallet(&self, pin: &str) -> StoreResult<Option<Value>> {
        if !self.store_exists(WALLET_STORE) {
            debug!("no wallet store on disk");
            return Ok(None);
        }
        let key = derive_key(pin);
        let record = self.with_store(&wallet_schema(), Some(&key), |store| {
            store.singleton::<WalletRecord>()
        })?;
        match record {
            Some(record) => {
                codec::check_format_version(record.wallet_file_format_version)?;
                Ok(Some(codec::decode(&record)))
            }
            None => Ok(None),
        }
    }

    // -- Preferences --------------------------------------------------------

    pub fn save_preferences(&self, prefs: &Preferences) -> StoreResult<()> {
        self.with_store(&preferences_schema(), None, |store| {
            store.write(|scope| scope.upsert(prefs))
        })
    }

    pub fn load_preferences(&self) -> StoreResult<Option<Preferences>> {
        self.with_store(&preferences_schema(), None, |store| store.singleton())
    }

    // -- Payees -------------------------------------------------------------

    /// Add `payee`, or update the one with the same nickname.
    pub fn save_payee(&self, payee: &Payee) -> StoreResult<()> {
        self.with_store(&payees_schema(), None, |store| {
            store.write(|scope| scope.upsert(payee))
        })
    }

    /// Remove the payee called `nickname`. Returns whether one existed;
    /// removing an unknown nickname is not an error.
    pub fn remove_payee(&self, nickname: &str) -> StoreResult<bool> {
        let key = RecordKey::natural(nickname);
        self.with_store(&payees_schema(), None, |store| {
            store.write(|scope| scope.remove::<Payee>(&key))
        })
    }

    /// Every payee, ordered by nickname.
    pub fn load_payees(&self) -> StoreResult<Vec<Payee>> {
        self.with_store(&payees_schema(), None, |store| store.all())
    }

    // -- Transaction details ------------------------------------------------

    pub fn save_transaction_details(&self, details: &TransactionDetails) -> StoreResult<()> {
        self.with_store(&transaction_details_schema(), None, |store| {
            store.write(|scope| scope.upsert(details))
        })
    }

    pub fn load_transaction_details(&self) -> StoreResult<Vec<TransactionDetails>> {
        self.with_store(&transaction_details_schema(), None, |store| store.all())
    }

    pub fn transaction_details(&self, hash: &str) -> StoreResult<Option<TransactionDetails>> {
        let key = RecordKey::natural(hash);
        self.with_store(&transaction_details_schema(), None, |store| store.get(&key))
    }

    // -- Price data ---------------------------------------------------------

    /// Replace the cached prices. Codes outside the configured currency
    /// list are dropped; configured codes missing from `raw` are stored as
    /// absent.
    pub fn save_price_data(&self, raw: &BTreeMap<String, f64>) -> StoreResult<()> {
        let cache = PriceCache::shaped(raw, &self.config().currencies);
        self.with_store(&self.price_schema(), None, |store| {
            store.write(|scope| scope.upsert(&cache))
        })
    }

    pub fn load_price_data(&self) -> StoreResult<Option<PriceCache>> {
        self.with_store(&self.price_schema(), None, |store| store.singleton())
    }

    // -- Compaction info ----------------------------------------------------

    pub fn last_compacted(&self) -> StoreResult<Option<DateTime<Utc>>> {
        let info = self.with_store(&compaction_info_schema(), None, |store| {
            store.singleton::<CompactionInfo>()
        })?;
        Ok(info.map(|i| i.last_updated))
    }

    pub fn save_last_compacted(&self, at: DateTime<Utc>) -> StoreResult<()> {
        let info = CompactionInfo { last_updated: at };
        self.with_store(&compaction_info_schema(), None, |store| {
            store.write(|scope| scope.upsert(&info))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::fixtures::{empty_wallet_json, input_json, rich_wallet_json};
    use crate::config::StorageConfig;
    use crate::reporter::RecordingReporter;
    use crate::storage::StoreError;
    use serde_json::json;
    use std::sync::Arc;

    fn manager(dir: &std::path::Path) -> StoreManager {
        StoreManager::new(StorageConfig::new(dir), Arc::new(RecordingReporter::new()))
    }

    #[test]
    fn wallet_round_trips_through_the_encrypted_store() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        let doc = rich_wallet_json();

        manager.save_wallet(&doc, "8080").unwrap();
        assert_eq!(manager.load_wallet("8080").unwrap(), Some(doc));
        assert!(manager.presence().get());
    }

    #[test]
    fn wallet_with_two_unspent_inputs_loads_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        let mut doc = empty_wallet_json();
        doc["subWallets"]["subWallet"][0]["unspentInputs"] =
            json!([input_json("ki-1", 10), input_json("ki-2", 20)]);

        manager.save_wallet(&doc, "0000").unwrap();
        let loaded = manager.load_wallet("0000").unwrap().unwrap();
        let sub = &loaded["subWallets"]["subWallet"][0];
        assert_eq!(sub["unspentInputs"][0]["keyImage"], "ki-1");
        assert_eq!(sub["unspentInputs"][1]["keyImage"], "ki-2");
        assert_eq!(sub["lockedInputs"], json!([]));
        assert_eq!(sub["spentInputs"], json!([]));
        assert_eq!(loaded["walletFileFormatVersion"], doc["walletFileFormatVersion"]);
    }

    #[test]
    fn wrong_pin_is_an_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        manager.save_wallet(&empty_wallet_json(), "1111").unwrap();

        let err = manager.load_wallet("2222").unwrap_err();
        assert!(matches!(err, StoreError::OpenFailure { .. }));
    }

    #[test]
    fn loading_without_a_wallet_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        assert_eq!(manager.load_wallet("1111").unwrap(), None);
        assert!(!manager.store_exists(WALLET_STORE));
    }

    #[test]
    fn malformed_wallet_is_rejected_before_any_write() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        let err = manager.save_wallet(&json!({"subWallets": 3}), "1111").unwrap_err();
        assert!(matches!(err, StoreError::Codec(_)));
        assert!(!manager.store_exists(WALLET_STORE));
        assert!(!manager.presence().get());
    }

    #[test]
    fn saving_preferences_twice_keeps_the_latest() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        manager.save_preferences(&Preferences::default()).unwrap();
        let eur = Preferences {
            currency: "eur".into(),
            ..Preferences::default()
        };
        manager.save_preferences(&eur).unwrap();

        assert_eq!(manager.load_preferences().unwrap(), Some(eur));
        let rows = manager
            .with_store(&preferences_schema(), None, |s| s.count::<Preferences>())
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn payees_come_back_sorted_and_update_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        manager.save_payee(&Payee::new("zed", "PLezed", "")).unwrap();
        manager.save_payee(&Payee::new("amy", "PLeamy", "")).unwrap();
        manager.save_payee(&Payee::new("zed", "PLezed2", "beef")).unwrap();

        let payees = manager.load_payees().unwrap();
        assert_eq!(payees.len(), 2);
        assert_eq!(payees[0].nickname, "amy");
        assert_eq!(payees[1].address, "PLezed2");
        assert_eq!(payees[1].payment_id, "beef");

        assert!(manager.remove_payee("amy").unwrap());
        assert!(!manager.remove_payee("nobody").unwrap());
        assert_eq!(manager.load_payees().unwrap().len(), 1);
    }

    #[test]
    fn transaction_details_lookup_by_hash() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        let details = TransactionDetails {
            hash: "tx-hash-1".into(),
            memo: "rent".into(),
            address: "PLeland".into(),
            payee: "landlord".into(),
        };
        manager.save_transaction_details(&details).unwrap();

        assert_eq!(manager.transaction_details("tx-hash-1").unwrap(), Some(details));
        assert_eq!(manager.transaction_details("nope").unwrap(), None);
        assert_eq!(manager.load_transaction_details().unwrap().len(), 1);
    }

    #[test]
    fn price_data_is_shaped_by_configured_currencies() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::new(dir.path()).with_currencies(["usd", "eur"]);
        let manager = StoreManager::new(config, Arc::new(RecordingReporter::new()));

        let raw: BTreeMap<String, f64> =
            [("usd".to_string(), 0.0012), ("doge".to_string(), 3.0)].into_iter().collect();
        manager.save_price_data(&raw).unwrap();

        let cache = manager.load_price_data().unwrap().unwrap();
        assert_eq!(cache.price("usd"), Some(0.0012));
        assert_eq!(cache.price("eur"), None);
        assert_eq!(cache.price("doge"), None);
    }

    #[test]
    fn last_compacted_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        assert_eq!(manager.last_compacted().unwrap(), None);

        let at = Utc::now();
        manager.save_last_compacted(at).unwrap();
        assert_eq!(manager.last_compacted().unwrap(), Some(at));
    }
}
