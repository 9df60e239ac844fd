// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Plenteum Store — Wallet Persistence Library
//!
//! Local persistence for the Plenteum mobile wallet: the wallet's keys and
//! transaction history, user preferences, the payee address book, cached
//! prices and housekeeping metadata. The wallet itself is encrypted at rest
//! under a key derived from the user's PIN.
//!
//! ## Architecture
//!
//! - **crypto** — PIN key derivation and AES-256-GCM sealing.
//! - **schema** — Per-store declarations: entities, keys, migration policy.
//! - **model** — Typed rows and the nested wallet object graph.
//! - **codec** — Wallet JSON document ↔ object graph.
//! - **storage** — sled-backed stores, write scopes, compaction, presence flag.
//! - **service** — Async, fail-soft facade the app talks to.
//! - **reporter** — Crash reporting seam.
//! - **config** — Constants and runtime settings.
//!
//! ## Quick look
//!
//! ```no_run
//! use plenteum_store::{StorageConfig, WalletStorage, TracingReporter};
//! use std::sync::Arc;
//!
//! # async fn demo(doc: serde_json::Value) {
//! let storage = WalletStorage::new(StorageConfig::new("/data/wallet"), Arc::new(TracingReporter));
//! if storage.save_wallet(&doc, "1234").await {
//!     let back = storage.load_wallet("1234").await;
//!     assert_eq!(back, Some(doc));
//! }
//! # }
//! ```
//!
//! ## Ground rules
//!
//! 1. Stores are independent. There is no transaction spanning two stores.
//! 2. The wallet store is never dropped to resolve a schema mismatch.
//! 3. The public surface never returns an error; the manager underneath does.

pub mod codec;
pub mod config;
pub mod crypto;
pub mod model;
pub mod reporter;
pub mod schema;
pub mod service;
pub mod storage;

pub use config::StorageConfig;
pub use reporter::{CrashReporter, RecordingReporter, TracingReporter};
pub use service::WalletStorage;
pub use storage::{CompactionReport, StoreError, StoreManager, StoreResult};
