//! # Wallet Object Graph
//!
//! The persisted shape of a wallet: one [`WalletRecord`] that exclusively
//! owns everything below it. There are no back-references and nothing is
//! shared, so the graph is a plain tree of owned values and the whole record
//! is stored as a single row.
//!
//! ```text
//! WalletRecord
//! ├── SubWalletsGroup
//! │   ├── SubWallet*            (unspent / locked / spent inputs, unconfirmed)
//! │   ├── Transaction*          (transfers)
//! │   ├── locked Transaction*   (transfers)
//! │   └── TxPrivateKey*
//! └── WalletSynchronizer
//!     └── SynchronizationStatus
//! ```
//!
//! Every `Vec` here is order-significant. Checkpoints are chronological,
//! inputs are in arrival order, and the JSON codec must hand them back in
//! exactly the order it received them.

use serde::{Deserialize, Serialize};

use crate::config::WALLET_RECORD_KEY;
use crate::schema::{Entity, RecordKey, Singleton};

/// Root of the wallet graph, stored at the fixed key 0.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRecord {
    pub wallet_file_format_version: u64,
    pub sub_wallets: SubWalletsGroup,
    pub synchronizer: WalletSynchronizer,
}

impl Entity for WalletRecord {
    const NAME: &'static str = "WalletRecord";

    fn key(&self) -> RecordKey {
        RecordKey::Fixed(Self::KEY)
    }
}

impl Singleton for WalletRecord {
    const KEY: u64 = WALLET_RECORD_KEY;
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSynchronizer {
    pub start_timestamp: u64,
    pub start_height: u64,
    pub private_view_key: String,
    pub status: SynchronizationStatus,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynchronizationStatus {
    /// Sparse, oldest-first checkpoints used to find a fork point.
    pub block_hash_checkpoints: Vec<String>,
    /// The most recent block hashes, newest-first.
    pub last_known_block_hashes: Vec<String>,
    pub last_known_block_height: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubWalletsGroup {
    pub public_spend_keys: Vec<String>,
    pub sub_wallets: Vec<SubWallet>,
    pub transactions: Vec<Transaction>,
    pub locked_transactions: Vec<Transaction>,
    pub private_view_key: String,
    pub is_view_wallet: bool,
    pub tx_private_keys: Vec<TxPrivateKey>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubWallet {
    pub unspent_inputs: Vec<TransactionInput>,
    pub locked_inputs: Vec<TransactionInput>,
    pub spent_inputs: Vec<TransactionInput>,
    pub unconfirmed_incoming_amounts: Vec<UnconfirmedInput>,
    pub public_spend_key: String,
    /// All zeroes for a view-only wallet.
    pub private_spend_key: String,
    pub sync_start_timestamp: u64,
    pub sync_start_height: u64,
    pub address: String,
    pub is_primary_address: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub transfers: Vec<Transfer>,
    pub hash: String,
    pub fee: u64,
    pub block_height: u64,
    pub timestamp: u64,
    pub payment_id: String,
    pub unlock_time: u64,
    pub is_coinbase_transaction: bool,
}

/// Balance change of one subwallet within a transaction. Negative for
/// outgoing funds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub amount: i64,
    pub public_key: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub key_image: String,
    pub amount: u64,
    pub block_height: u64,
    pub transaction_public_key: String,
    pub transaction_index: u64,
    /// Unknown until the daemon reports it. An explicit JSON `null` and a
    /// missing field both mean unknown, and both are written back as a
    /// missing field.
    pub global_output_index: Option<u64>,
    pub key: String,
    pub spend_height: u64,
    pub unlock_time: u64,
    pub parent_transaction_hash: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnconfirmedInput {
    pub amount: u64,
    pub key: String,
    pub parent_transaction_hash: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPrivateKey {
    pub transaction_hash: String,
    pub tx_private_key: String,
}

impl WalletRecord {
    /// Total number of transaction inputs across all subwallets, in any state.
    pub fn input_count(&self) -> usize {
        self.sub_wallets
            .sub_wallets
            .iter()
            .map(|w| w.unspent_inputs.len() + w.locked_inputs.len() + w.spent_inputs.len())
            .sum()
    }

    /// The primary subwallet, if one is flagged.
    pub fn primary(&self) -> Option<&SubWallet> {
        self.sub_wallets
            .sub_wallets
            .iter()
            .find(|w| w.is_primary_address)
    }
}
