//! Rows of the plaintext stores.
//!
//! These structs double as the JSON shape handed to the UI layer, hence the
//! camelCase renames. On disk they are bincode, where names do not matter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{COMPACTION_INFO_KEY, PREFERENCES_KEY, PRICE_CACHE_KEY};
use crate::schema::{Entity, RecordKey, Singleton};

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// Fiat currency code balances are displayed in.
    pub currency: String,
    pub notifications_enabled: bool,
    pub scan_coinbase_transactions: bool,
    /// Only sync on unmetered connections.
    pub limit_data: bool,
    pub theme: String,
    /// Ask for the PIN before sending.
    pub auth_confirmation: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            currency: "usd".to_string(),
            notifications_enabled: true,
            scan_coinbase_transactions: false,
            limit_data: false,
            theme: "darkMode".to_string(),
            auth_confirmation: false,
        }
    }
}

impl Entity for Preferences {
    const NAME: &'static str = "Preferences";

    fn key(&self) -> RecordKey {
        RecordKey::Fixed(Self::KEY)
    }
}

impl Singleton for Preferences {
    const KEY: u64 = PREFERENCES_KEY;
}

// ---------------------------------------------------------------------------
// Payee
// ---------------------------------------------------------------------------

/// Address book entry, unique by nickname.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payee {
    pub nickname: String,
    pub address: String,
    #[serde(rename = "paymentID")]
    pub payment_id: String,
}

impl Payee {
    pub fn new(
        nickname: impl Into<String>,
        address: impl Into<String>,
        payment_id: impl Into<String>,
    ) -> Self {
        Self {
            nickname: nickname.into(),
            address: address.into(),
            payment_id: payment_id.into(),
        }
    }
}

impl Entity for Payee {
    const NAME: &'static str = "Payee";

    fn key(&self) -> RecordKey {
        RecordKey::natural(self.nickname.as_str())
    }
}

// ---------------------------------------------------------------------------
// Transaction Details
// ---------------------------------------------------------------------------

/// User-side annotations of a transaction, unique by transaction hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetails {
    pub hash: String,
    pub memo: String,
    pub address: String,
    /// Nickname of the payee this was sent to; empty if none.
    pub payee: String,
}

impl Entity for TransactionDetails {
    const NAME: &'static str = "TransactionDetails";

    fn key(&self) -> RecordKey {
        RecordKey::natural(self.hash.as_str())
    }
}

// ---------------------------------------------------------------------------
// Price Cache
// ---------------------------------------------------------------------------

/// Last fetched coin price per fiat currency.
///
/// The set of currencies is runtime configuration, so this is a map rather
/// than a struct with one field per code. Use [`PriceCache::shaped`] to
/// build one that only carries configured currencies.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceCache {
    pub prices: BTreeMap<String, f64>,
}

impl PriceCache {
    /// Keep only the entries of `raw` whose code is in `currencies`.
    pub fn shaped<S: AsRef<str>>(raw: &BTreeMap<String, f64>, currencies: &[S]) -> Self {
        let prices = currencies
            .iter()
            .filter_map(|code| {
                let code = code.as_ref();
                raw.get(code).map(|price| (code.to_string(), *price))
            })
            .collect();
        Self { prices }
    }

    pub fn price(&self, currency: &str) -> Option<f64> {
        self.prices.get(currency).copied()
    }
}

impl Entity for PriceCache {
    const NAME: &'static str = "PriceCache";

    fn key(&self) -> RecordKey {
        RecordKey::Fixed(Self::KEY)
    }
}

impl Singleton for PriceCache {
    const KEY: u64 = PRICE_CACHE_KEY;
}

// ---------------------------------------------------------------------------
// Compaction Info
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactionInfo {
    pub last_updated: DateTime<Utc>,
}

impl Entity for CompactionInfo {
    const NAME: &'static str = "CompactionInfo";

    fn key(&self) -> RecordKey {
        RecordKey::Fixed(Self::KEY)
    }
}

impl Singleton for CompactionInfo {
    const KEY: u64 = COMPACTION_INFO_KEY;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferences_json_uses_app_field_names() {
        let json = serde_json::to_value(Preferences::default()).unwrap();
        assert_eq!(json["currency"], "usd");
        assert_eq!(json["notificationsEnabled"], true);
        assert_eq!(json["scanCoinbaseTransactions"], false);
        assert_eq!(json["authConfirmation"], false);
    }

    #[test]
    fn payee_json_keeps_payment_id_casing() {
        let payee = Payee::new("alice", "PLe1...", "abcd");
        let json = serde_json::to_value(&payee).unwrap();
        assert_eq!(json["paymentID"], "abcd");
        assert_eq!(payee.key(), RecordKey::natural("alice"));
    }

    #[test]
    fn shaped_price_cache_drops_unconfigured_currencies() {
        let raw: BTreeMap<String, f64> = [("usd", 0.01), ("eur", 0.009), ("doge", 3.0)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let cache = PriceCache::shaped(&raw, &["usd", "eur", "gbp"]);
        assert_eq!(cache.price("usd"), Some(0.01));
        assert_eq!(cache.price("eur"), Some(0.009));
        assert_eq!(cache.price("gbp"), None);
        assert_eq!(cache.price("doge"), None);
        assert_eq!(cache.prices.len(), 2);
    }

    #[test]
    fn price_cache_serializes_as_flat_map() {
        let mut cache = PriceCache::default();
        cache.prices.insert("usd".into(), 1.5);
        assert_eq!(serde_json::to_string(&cache).unwrap(), r#"{"usd":1.5}"#);
    }

    #[test]
    fn singleton_keys_match_configuration() {
        assert_eq!(Preferences::KEY, 1);
        assert_eq!(PriceCache::KEY, 1);
        assert_eq!(CompactionInfo::KEY, 0);
    }
}
