//! # Storage Module
//!
//! Persistence for the wallet app. Every logical store is its own sled
//! database directory under the data root, so stores never share a file and
//! never share a transaction.
//!
//! ## Architecture
//!
//! ```text
//! manager.rs    — StoreManager: open / migrate / close cycle, delete_all
//! db.rs         — StoreHandle: typed reads, write scopes, schema marker
//! scope.rs      — WriteScope: upsert / remove inside one sled transaction
//! operations.rs — typed save / load per record kind
//! compaction.rs — rebuild-and-swap compaction, scheduling threshold
//! presence.rs   — plaintext "a wallet exists" flag
//! error.rs      — StoreError taxonomy
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! save_wallet(json, pin)
//!   → codec::encode → WalletRecord
//!   → derive_key(pin)
//!   → with_store(wallet schema) → write scope → upsert(record)
//!   → presence.set(true)
//! ```
//!
//! ## Design Decisions
//!
//! 1. **One directory per store.** Dropping a store on schema mismatch is a
//!    directory removal, and compaction can swap a whole store at once.
//!
//! 2. **Bincode rows, AES-GCM for the wallet.** Rows are bincode; the
//!    wallet store seals every value and binds it to its storage key, so
//!    sealed rows cannot be swapped between keys.
//!
//! 3. **Short-lived handles over shared databases.** Each operation opens
//!    and closes a `StoreHandle`, but the sled `Db` beneath it comes from a
//!    process-wide table and stays open. sled holds one directory lock per
//!    `Db`, so a directory is released from the table only right before it
//!    is removed or swapped by compaction.
//!
//! 4. **Compaction leftovers are settled on open.** A store parked as
//!    `.retired` by a pass that died mid-swap is moved back before anything
//!    reads or writes it.

pub mod compaction;
pub mod db;
pub mod error;
pub mod manager;
pub mod operations;
pub mod presence;
pub mod scope;

pub use compaction::{compaction_due, CompactionReport, CompactionStats};
pub use db::StoreHandle;
pub use error::{StoreError, StoreResult};
pub use manager::StoreManager;
pub use presence::PresenceFlag;
pub use scope::{ScopeResult, WriteScope};
