//! # Storage Configuration & Constants
//!
//! Every magic number in the persistence layer lives here: store ids,
//! singleton keys, schema versions, the wallet file format tag and the
//! crypto parameters for the encrypted store. [`StorageConfig`] carries the
//! handful of settings that vary per installation.
//!
//! Bumping a schema version below is a schema change. For every store except
//! the wallet store that means the next open drops the store and starts
//! empty, so only bump them when the on-disk row layout really changed.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Store Identifiers
// ---------------------------------------------------------------------------

/// Encrypted store holding the single wallet record.
pub const WALLET_STORE: &str = "wallet";

/// User preferences (currency, theme, notification toggles).
pub const PREFERENCES_STORE: &str = "preferences";

/// Payee address book.
pub const PAYEES_STORE: &str = "payees";

/// Cached coin prices, one field per configured fiat currency.
pub const PRICE_DATA_STORE: &str = "price-data";

/// User-entered memos and payee links per transaction hash.
pub const TRANSACTION_DETAILS_STORE: &str = "transaction-details";

/// Housekeeping: when the stores were last compacted.
pub const COMPACTION_INFO_STORE: &str = "compaction-info";

/// Directory (relative to the data root) of the plaintext presence flag.
pub const PRESENCE_STORE: &str = "presence";

// ---------------------------------------------------------------------------
// Singleton Keys
// ---------------------------------------------------------------------------

/// Fixed primary key of the wallet record.
pub const WALLET_RECORD_KEY: u64 = 0;

/// Fixed primary key of the preferences record.
pub const PREFERENCES_KEY: u64 = 1;

/// Fixed primary key of the price cache record.
pub const PRICE_CACHE_KEY: u64 = 1;

/// Fixed primary key of the compaction info record.
pub const COMPACTION_INFO_KEY: u64 = 0;

// ---------------------------------------------------------------------------
// Schema Versions
// ---------------------------------------------------------------------------

pub const WALLET_SCHEMA_VERSION: u32 = 1;
pub const PREFERENCES_SCHEMA_VERSION: u32 = 1;
pub const PAYEES_SCHEMA_VERSION: u32 = 1;
pub const PRICE_DATA_SCHEMA_VERSION: u32 = 1;
pub const TRANSACTION_DETAILS_SCHEMA_VERSION: u32 = 1;
pub const COMPACTION_INFO_SCHEMA_VERSION: u32 = 1;

/// Format tag written into every saved wallet document. A reader that finds
/// a larger number than this refuses the document instead of guessing.
pub const WALLET_FILE_FORMAT_VERSION: u64 = 0;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// AES-256-GCM key length in bytes. Also the PIN-derived key length.
pub const AES_KEY_LENGTH: usize = 32;

/// AES-256-GCM nonce length in bytes.
pub const AES_NONCE_LENGTH: usize = 12;

/// AES-256-GCM authentication tag length in bytes.
pub const AES_TAG_LENGTH: usize = 16;

/// Domain separator mixed into the PIN hash so the store key is never the
/// bare SHA-256 of the PIN.
pub const KEY_DERIVATION_CONTEXT: &[u8] = b"plenteum-wallet-store/v1";

// ---------------------------------------------------------------------------
// Housekeeping
// ---------------------------------------------------------------------------

/// Name of the presence flag entry. Kept product-specific so two wallet
/// apps sharing a data root cannot read each other's flag.
pub const PRESENCE_FLAG_KEY: &str = "plenteum_have_wallet";

/// Default minimum number of days between two compaction passes.
pub const DEFAULT_COMPACTION_INTERVAL_DAYS: u32 = 7;

/// One day, the unit of the compaction threshold.
pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Suffix of the sibling directory a store is rebuilt into while compacting.
pub const COMPACTION_SUFFIX: &str = "compacting";

/// Suffix the original directory is parked under while the rebuilt one is
/// moved into place.
pub const RETIRED_SUFFIX: &str = "retired";

/// Pause between attempts to take a store's directory lock. sled releases
/// it from its IO threads, a moment after the last `Db` handle is dropped.
pub const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Attempts before a held directory lock is reported as an engine error.
pub const LOCK_RETRY_ATTEMPTS: u32 = 300;

/// Every store directory, in the order compaction visits them.
pub const COMPACTION_ORDER: &[&str] = &[
    TRANSACTION_DETAILS_STORE,
    PAYEES_STORE,
    PRICE_DATA_STORE,
    PREFERENCES_STORE,
    WALLET_STORE,
];

/// Fiat currencies the price cache is shaped for when nothing else is
/// configured. Codes are lowercase, as the price API returns them.
pub const DEFAULT_CURRENCIES: &[&str] = &[
    "aud", "bdt", "bhd", "bmd", "brl", "btc", "cad", "chf", "clp", "cny", "czk", "dkk",
    "eth", "eur", "gbp", "hkd", "huf", "idr", "ils", "inr", "jpy", "krw", "kwd", "lkr",
    "ltc", "mmk", "mxn", "myr", "nok", "nzd", "php", "pkr", "pln", "rub", "sar", "sek",
    "sgd", "thb", "try", "twd", "usd", "vef", "xag", "xau", "xdr", "zar",
];

// ---------------------------------------------------------------------------
// Runtime Configuration
// ---------------------------------------------------------------------------

/// Per-installation settings for the persistence layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory; each store lives in its own subdirectory.
    pub data_dir: PathBuf,

    /// Currency codes the price cache is shaped for.
    pub currencies: Vec<String>,

    /// Key of the plaintext presence flag.
    pub presence_flag_key: String,

    /// Minimum days between compaction passes.
    pub compaction_interval_days: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./wallet-data"),
            currencies: DEFAULT_CURRENCIES.iter().map(|c| c.to_string()).collect(),
            presence_flag_key: PRESENCE_FLAG_KEY.to_string(),
            compaction_interval_days: DEFAULT_COMPACTION_INTERVAL_DAYS,
        }
    }
}

impl StorageConfig {
    /// Default settings rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Replace the configured currency list.
    pub fn with_currencies<I, S>(mut self, currencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.currencies = currencies.into_iter().map(Into::into).collect();
        self
    }

    /// Directory of the store named `store_id`.
    pub fn store_path(&self, store_id: &str) -> PathBuf {
        self.data_dir.join(store_id)
    }
}
