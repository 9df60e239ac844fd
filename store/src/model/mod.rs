//! # Data Model
//!
//! Typed rows for every store. [`wallet`] holds the nested wallet graph;
//! [`records`] holds the flat rows of the plaintext stores.

pub mod records;
pub mod wallet;

pub use records::{CompactionInfo, Payee, Preferences, PriceCache, TransactionDetails};
pub use wallet::{
    SubWallet, SubWalletsGroup, SynchronizationStatus, Transaction, TransactionInput, Transfer,
    TxPrivateKey, UnconfirmedInput, WalletRecord, WalletSynchronizer,
};
