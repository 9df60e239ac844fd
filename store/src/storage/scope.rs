//! Write scopes.
//!
//! A [`WriteScope`] wraps one sled transaction over a store's `records`
//! tree. Everything issued through it commits together when the closure
//! passed to [`StoreHandle::write`](super::StoreHandle::write) returns `Ok`;
//! an `Err` rolls all of it back.

use sled::transaction::{ConflictableTransactionError, TransactionalTree};

use super::db::RowCodec;
use super::error::StoreError;
use crate::schema::{storage_key, Entity, RecordKey, StoreSchema};

/// Result type of operations inside a write scope.
pub type ScopeResult<T> = Result<T, ConflictableTransactionError<StoreError>>;

pub struct WriteScope<'a> {
    tree: &'a TransactionalTree,
    schema: &'a StoreSchema,
    rows: RowCodec<'a>,
}

impl<'a> WriteScope<'a> {
    pub(crate) fn new(tree: &'a TransactionalTree, schema: &'a StoreSchema, rows: RowCodec<'a>) -> Self {
        Self { tree, schema, rows }
    }

    /// Abort the scope with `err`; nothing written so far is kept.
    pub fn abort<T>(err: StoreError) -> ScopeResult<T> {
        Err(ConflictableTransactionError::Abort(err))
    }

    fn check_entity(&self, entity: &str) -> ScopeResult<()> {
        if self.schema.stores_entity(entity) {
            Ok(())
        } else {
            Self::abort(StoreError::UnknownEntity {
                store: self.rows.store().to_string(),
                entity: entity.to_string(),
            })
        }
    }

    /// Insert `row`, replacing any row of the same entity with the same key.
    pub fn upsert<E: Entity>(&self, row: &E) -> ScopeResult<()> {
        self.check_entity(E::NAME)?;
        let key = storage_key(E::NAME, &row.key());
        let bytes = self
            .rows
            .seal(&key, row)
            .map_err(ConflictableTransactionError::Abort)?;
        self.tree.insert(key, bytes)?;
        Ok(())
    }

    /// Delete the row of `E` at `key`. Returns whether a row was there.
    pub fn remove<E: Entity>(&self, key: &RecordKey) -> ScopeResult<bool> {
        self.check_entity(E::NAME)?;
        let removed = self.tree.remove(storage_key(E::NAME, key))?;
        Ok(removed.is_some())
    }
}
