//! Error taxonomy of the store layer.
//!
//! These are the structured failures the store manager works with. The
//! public service degrades all of them to sentinels after reporting, but
//! tests and embedders that call the manager directly can match on them.

use thiserror::Error;

use crate::codec::CodecError;

/// Errors from opening, reading, writing or compacting a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Wrong key or corrupted store. The two are deliberately not told
    /// apart, so the error cannot be used to probe PINs.
    #[error("could not open store `{store}`: wrong key or corrupted data")]
    OpenFailure { store: String },

    /// Persisted data was written under a different schema and the store's
    /// policy forbids dropping it.
    #[error("schema mismatch in store `{store}`: expected {expected}, found {found}")]
    SchemaMismatch {
        store: String,
        expected: String,
        found: String,
    },

    /// A write scope could not commit. The store is unchanged.
    #[error("write to store `{store}` failed: {reason}")]
    WriteFailure { store: String, reason: String },

    /// Compacting one store failed; stores compacted before it stay compacted.
    #[error("compaction of store `{store}` failed: {source}")]
    CompactionFailure {
        store: String,
        #[source]
        source: Box<StoreError>,
    },

    /// An encrypted store was opened without a key.
    #[error("store `{store}` is encrypted and needs a key")]
    KeyRequired { store: String },

    /// A row type was used with a store that does not declare it.
    #[error("entity `{entity}` is not declared in store `{store}`")]
    UnknownEntity { store: String, entity: String },

    #[error("wallet document error: {0}")]
    Codec(#[from] CodecError),

    #[error("row encoding error: {0}")]
    Serialization(String),

    #[error("storage engine error: {0}")]
    Engine(#[from] sled::Error),

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking task running the operation panicked or was cancelled.
    #[error("storage task failed: {0}")]
    Task(String),
}

impl StoreError {
    pub(crate) fn open_failure(store: &str) -> Self {
        Self::OpenFailure {
            store: store.to_string(),
        }
    }

    pub(crate) fn write_failure(store: &str, reason: impl ToString) -> Self {
        Self::WriteFailure {
            store: store.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn serialization(e: bincode::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_failure_message_does_not_say_which() {
        let msg = StoreError::open_failure("wallet").to_string();
        assert!(msg.contains("wrong key or corrupted"));
        assert!(!msg.contains("pin"));
    }

    #[test]
    fn compaction_failure_keeps_cause() {
        let err = StoreError::CompactionFailure {
            store: "payees".into(),
            source: Box::new(StoreError::open_failure("payees")),
        };
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("payees"));
    }
}
