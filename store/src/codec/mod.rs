//! # Wallet Object Graph Codec
//!
//! The wallet backend hands us one JSON document:
//!
//! ```text
//! { walletFileFormatVersion, subWallets: {...}, walletSynchronizer: {...} }
//! ```
//!
//! and expects the same document back at unlock. [`encode`] turns it into
//! the typed [`WalletRecord`](crate::model::WalletRecord) graph that gets
//! stored; [`decode`] turns the graph back into JSON. For any well-formed
//! document, `decode(&encode(doc)?) == doc`, with every array in its
//! original order and empty collections kept as empty arrays.
//!
//! The mapping is written out per entity instead of leaning on derived
//! serde impls, so each JSON name and the field it lands in can be read
//! side by side.

pub mod json;
pub mod wallet;

#[cfg(test)]
pub(crate) mod fixtures;

pub use json::{CodecError, CodecResult};
pub use wallet::{check_format_version, decode, encode};
