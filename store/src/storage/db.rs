//! # StoreHandle — one open store
//!
//! Each logical store is its own sled database directory. Inside it:
//!
//! | Tree      | Key                          | Value                            |
//! |-----------|------------------------------|----------------------------------|
//! | `records` | `<entity> 0x00 <row key>`    | `bincode(row)`, sealed if keyed  |
//! | `meta`    | `schema`                     | `bincode(SchemaMarker)`, sealed  |
//!
//! Because every row of a store lives in the single `records` tree, one sled
//! tree transaction covers any set of writes to the store, and a write
//! scope commits all-or-nothing.
//!
//! For encrypted stores the schema marker is sealed with the same key as
//! the rows and is read first on open. A wrong key therefore fails right
//! there, before any row is touched.
//!
//! The automatic background flusher is disabled; the handle flushes after
//! every committed write scope and again on close.
//!
//! sled allows one open instance per directory per process, and releases
//! the directory lock only once its IO threads let go of the last handle.
//! Every open therefore goes through a process-wide table of live `Db`s,
//! keyed by path. Closing a [`StoreHandle`] flushes; the `Db` stays in the
//! table until [`release_db`] is called ahead of removing or replacing its
//! directory.

use parking_lot::Mutex;
use sled::transaction::TransactionError;
use sled::{Db, IVec, Tree};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

use super::error::{StoreError, StoreResult};
use super::scope::{ScopeResult, WriteScope};
use crate::config::{LOCK_RETRY_ATTEMPTS, LOCK_RETRY_INTERVAL};
use crate::crypto::{self, StoreKey};
use crate::schema::{
    entity_prefix, storage_key, Entity, RecordKey, SchemaMarker, Singleton, StoreSchema,
};

const RECORDS_TREE: &str = "records";
const META_TREE: &str = "meta";
const META_SCHEMA: &[u8] = b"schema";

static OPEN_DBS: OnceLock<Mutex<HashMap<PathBuf, Db>>> = OnceLock::new();

fn open_dbs() -> &'static Mutex<HashMap<PathBuf, Db>> {
    OPEN_DBS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Open (or create) a private sled database at `path`, waiting out a
/// directory lock still held by a handle dropped moments ago.
pub(crate) fn open_db(path: &Path) -> StoreResult<Db> {
    let mut attempts = 0;
    loop {
        match sled::Config::new().path(path).flush_every_ms(None).open() {
            Ok(db) => return Ok(db),
            Err(e) if is_lock_contention(&e) && attempts < LOCK_RETRY_ATTEMPTS => {
                attempts += 1;
                std::thread::sleep(LOCK_RETRY_INTERVAL);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn is_lock_contention(e: &sled::Error) -> bool {
    matches!(e, sled::Error::Io(io) if io.to_string().contains("could not acquire lock"))
}

/// The process-wide `Db` for `path`, opened on first use.
pub(crate) fn shared_db(path: &Path) -> StoreResult<Db> {
    let mut open = open_dbs().lock();
    if let Some(db) = open.get(path) {
        return Ok(db.clone());
    }
    let db = open_db(path)?;
    open.insert(path.to_path_buf(), db.clone());
    debug!(path = %path.display(), "database opened");
    Ok(db)
}

/// Flush and forget the shared `Db` for `path`, if one is open. Call before
/// the directory is removed or renamed.
pub(crate) fn release_db(path: &Path) {
    let released = open_dbs().lock().remove(path);
    if let Some(db) = released {
        if let Err(e) = db.flush() {
            warn!(path = %path.display(), error = %e, "flush before release failed");
        }
        debug!(path = %path.display(), "database released");
    }
}

// ---------------------------------------------------------------------------
// Row encoding
// ---------------------------------------------------------------------------

/// Turns rows into stored bytes and back for one store.
#[derive(Clone, Copy)]
pub(crate) struct RowCodec<'a> {
    store: &'a str,
    key: Option<&'a StoreKey>,
}

impl<'a> RowCodec<'a> {
    pub(crate) fn new(store: &'a str, key: Option<&'a StoreKey>) -> Self {
        Self { store, key }
    }

    pub(crate) fn store(&self) -> &'a str {
        self.store
    }

    /// Serialize `value`, sealing it with `aad` bound in if the store is keyed.
    pub(crate) fn seal<T: serde::Serialize>(&self, aad: &[u8], value: &T) -> StoreResult<Vec<u8>> {
        let plain = bincode::serialize(value).map_err(StoreError::serialization)?;
        match self.key {
            Some(key) => crypto::seal(key.as_bytes(), &plain, aad)
                .map_err(|e| StoreError::write_failure(self.store, e)),
            None => Ok(plain),
        }
    }

    /// Inverse of [`seal`](Self::seal). Authentication failures surface as
    /// [`StoreError::OpenFailure`].
    pub(crate) fn open<T: serde::de::DeserializeOwned>(
        &self,
        aad: &[u8],
        stored: &[u8],
    ) -> StoreResult<T> {
        let plain = match self.key {
            Some(key) => crypto::open(key.as_bytes(), stored, aad)
                .map_err(|_| StoreError::open_failure(self.store))?,
            None => stored.to_vec(),
        };
        bincode::deserialize(&plain).map_err(StoreError::serialization)
    }
}

// ---------------------------------------------------------------------------
// StoreHandle
// ---------------------------------------------------------------------------

/// A live, open store. Obtained through
/// [`StoreManager::with_store`](super::StoreManager::with_store), which
/// closes it again before returning.
pub struct StoreHandle {
    db: Db,
    records: Tree,
    meta: Tree,
    schema: StoreSchema,
    key: Option<StoreKey>,
    path: PathBuf,
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("store", &self.schema.store_id)
            .field("path", &self.path)
            .field("encrypted", &self.key.is_some())
            .finish()
    }
}

impl StoreHandle {
    /// Open the database at `path` without looking at its schema yet.
    pub(crate) fn open(path: &Path, schema: StoreSchema, key: Option<StoreKey>) -> StoreResult<Self> {
        let db = shared_db(path)?;
        let records = db.open_tree(RECORDS_TREE)?;
        let meta = db.open_tree(META_TREE)?;
        debug!(store = %schema.store_id, path = %path.display(), "store opened");
        Ok(Self {
            db,
            records,
            meta,
            schema,
            key,
            path: path.to_path_buf(),
        })
    }

    pub fn schema(&self) -> &StoreSchema {
        &self.schema
    }

    pub fn store_id(&self) -> &str {
        &self.schema.store_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn db(&self) -> &Db {
        &self.db
    }

    fn rows(&self) -> RowCodec<'_> {
        RowCodec::new(&self.schema.store_id, self.key.as_ref())
    }

    fn check_entity(&self, entity: &str) -> StoreResult<()> {
        if self.schema.stores_entity(entity) {
            Ok(())
        } else {
            Err(StoreError::UnknownEntity {
                store: self.schema.store_id.clone(),
                entity: entity.to_string(),
            })
        }
    }

    // -- Schema marker ------------------------------------------------------

    /// The marker persisted by whoever created this store, if any.
    pub(crate) fn read_marker(&self) -> StoreResult<Option<SchemaMarker>> {
        let Some(bytes) = self.meta.get(META_SCHEMA)? else {
            return Ok(None);
        };
        match self.rows().open(META_SCHEMA, &bytes) {
            Ok(marker) => Ok(Some(marker)),
            // Keyed store: wrong key or damaged data.
            Err(_) if self.key.is_some() => Err(StoreError::open_failure(self.store_id())),
            // Plaintext store: written by a layout this build cannot read.
            Err(_) => Err(StoreError::SchemaMismatch {
                store: self.schema.store_id.clone(),
                expected: self.schema.marker().to_string(),
                found: "unreadable marker".to_string(),
            }),
        }
    }

    fn write_marker(&self, marker: &SchemaMarker) -> StoreResult<()> {
        let bytes = self.rows().seal(META_SCHEMA, marker)?;
        self.meta.insert(META_SCHEMA, bytes)?;
        self.db.flush()?;
        Ok(())
    }

    /// Compare the persisted marker with the declared schema.
    ///
    /// A brand-new store gets the declared marker written. A store holding
    /// rows but no marker counts as a mismatch.
    pub(crate) fn check_schema(&self) -> StoreResult<()> {
        let expected = self.schema.marker();
        match self.read_marker()? {
            Some(found) if found == expected => Ok(()),
            Some(found) => Err(StoreError::SchemaMismatch {
                store: self.schema.store_id.clone(),
                expected: expected.to_string(),
                found: found.to_string(),
            }),
            None if self.records.is_empty() => self.write_marker(&expected),
            None => Err(StoreError::SchemaMismatch {
                store: self.schema.store_id.clone(),
                expected: expected.to_string(),
                found: "no schema marker".to_string(),
            }),
        }
    }

    // -- Reads --------------------------------------------------------------

    /// Fetch the row of `E` at `key`.
    pub fn get<E: Entity>(&self, key: &RecordKey) -> StoreResult<Option<E>> {
        self.check_entity(E::NAME)?;
        let storage_key = storage_key(E::NAME, key);
        match self.records.get(&storage_key)? {
            Some(bytes) => self.rows().open(&storage_key, &bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Fetch the only row of singleton `E`.
    pub fn singleton<E: Singleton>(&self) -> StoreResult<Option<E>> {
        self.get(&RecordKey::Fixed(E::KEY))
    }

    /// Every row of `E`, in key order.
    pub fn all<E: Entity>(&self) -> StoreResult<Vec<E>> {
        self.check_entity(E::NAME)?;
        let rows = self.rows();
        self.records
            .scan_prefix(entity_prefix(E::NAME))
            .map(|item| {
                let (key, value): (IVec, IVec) = item?;
                rows.open(&key, &value)
            })
            .collect()
    }

    /// Number of rows of `E`.
    pub fn count<E: Entity>(&self) -> StoreResult<usize> {
        self.check_entity(E::NAME)?;
        let mut count = 0;
        for item in self.records.scan_prefix(entity_prefix(E::NAME)) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    // -- Writes -------------------------------------------------------------

    /// Run `f` inside a write scope. Either every write `f` issued lands, or
    /// none does. sled may call `f` more than once on conflict, so it must
    /// not have side effects outside the scope.
    pub fn write<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: Fn(&WriteScope<'_>) -> ScopeResult<T>,
    {
        let rows = self.rows();
        let outcome = self
            .records
            .transaction(|tree| f(&WriteScope::new(tree, &self.schema, rows)));

        let value = outcome.map_err(|e| match e {
            TransactionError::Abort(inner) => inner,
            TransactionError::Storage(engine) => {
                StoreError::write_failure(self.store_id(), engine)
            }
        })?;

        self.db
            .flush()
            .map_err(|e| StoreError::write_failure(self.store_id(), e))?;
        Ok(value)
    }

    // -- Maintenance --------------------------------------------------------

    /// Bytes the store occupies on disk.
    pub fn size_on_disk(&self) -> StoreResult<u64> {
        Ok(self.db.size_on_disk()?)
    }

    /// Flush and give up this handle. The shared `Db` itself stays open.
    pub(crate) fn close(self) -> StoreResult<()> {
        self.db.flush()?;
        debug!(store = %self.schema.store_id, "store closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::derive_key;
    use crate::model::{Payee, Preferences};
    use crate::schema::{payees_schema, preferences_schema, wallet_schema};

    fn open_fresh(dir: &Path, schema: StoreSchema, key: Option<StoreKey>) -> StoreHandle {
        let handle = StoreHandle::open(&dir.join(&schema.store_id), schema, key).unwrap();
        handle.check_schema().unwrap();
        handle
    }

    #[test]
    fn fresh_store_gets_marker_written() {
        let dir = tempfile::tempdir().unwrap();
        let handle = open_fresh(dir.path(), payees_schema(), None);
        assert_eq!(handle.read_marker().unwrap(), Some(payees_schema().marker()));
    }

    #[test]
    fn upsert_get_and_remove_payee() {
        let dir = tempfile::tempdir().unwrap();
        let handle = open_fresh(dir.path(), payees_schema(), None);

        handle
            .write(|scope| scope.upsert(&Payee::new("bob", "PLebob", "")))
            .unwrap();
        let bob: Payee = handle.get(&RecordKey::natural("bob")).unwrap().unwrap();
        assert_eq!(bob.address, "PLebob");

        let removed = handle
            .write(|scope| scope.remove::<Payee>(&RecordKey::natural("bob")))
            .unwrap();
        assert!(removed);
        assert_eq!(handle.count::<Payee>().unwrap(), 0);
    }

    #[test]
    fn all_returns_rows_in_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let handle = open_fresh(dir.path(), payees_schema(), None);
        handle
            .write(|scope| {
                scope.upsert(&Payee::new("carol", "c", ""))?;
                scope.upsert(&Payee::new("alice", "a", ""))?;
                scope.upsert(&Payee::new("bob", "b", ""))
            })
            .unwrap();

        let names: Vec<String> = handle
            .all::<Payee>()
            .unwrap()
            .into_iter()
            .map(|p| p.nickname)
            .collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn aborted_scope_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let handle = open_fresh(dir.path(), payees_schema(), None);

        let result: StoreResult<()> = handle.write(|scope| {
            scope.upsert(&Payee::new("dave", "d", ""))?;
            WriteScope::abort(StoreError::write_failure("payees", "simulated"))
        });
        assert!(matches!(result, Err(StoreError::WriteFailure { .. })));
        assert_eq!(handle.count::<Payee>().unwrap(), 0);
    }

    #[test]
    fn undeclared_entity_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let handle = open_fresh(dir.path(), payees_schema(), None);
        let err = handle.singleton::<Preferences>().unwrap_err();
        assert!(matches!(err, StoreError::UnknownEntity { .. }));

        let err = handle
            .write(|scope| scope.upsert(&Preferences::default()))
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownEntity { .. }));
    }

    #[test]
    fn encrypted_marker_rejects_wrong_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet");
        {
            let handle = StoreHandle::open(&path, wallet_schema(), Some(derive_key("1111"))).unwrap();
            handle.check_schema().unwrap();
            handle.close().unwrap();
        }

        let handle = StoreHandle::open(&path, wallet_schema(), Some(derive_key("2222"))).unwrap();
        assert!(matches!(
            handle.check_schema(),
            Err(StoreError::OpenFailure { .. })
        ));
    }

    #[test]
    fn rows_with_no_marker_are_a_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences");
        shared_db(&path)
            .unwrap()
            .open_tree(RECORDS_TREE)
            .unwrap()
            .insert(b"stray", b"row".to_vec())
            .unwrap();
        let handle = StoreHandle::open(&path, preferences_schema(), None).unwrap();
        assert!(matches!(
            handle.check_schema(),
            Err(StoreError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn unreadable_marker_in_plaintext_store_is_a_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let handle = open_fresh(dir.path(), preferences_schema(), None);
        handle.meta.insert(META_SCHEMA, vec![0x01]).unwrap();

        match handle.check_schema() {
            Err(StoreError::SchemaMismatch { found, .. }) => assert_eq!(found, "unreadable marker"),
            other => panic!("expected a schema mismatch, got {other:?}"),
        }
    }

    #[test]
    fn unreadable_marker_in_encrypted_store_is_an_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let handle = open_fresh(dir.path(), wallet_schema(), Some(derive_key("1111")));
        handle.meta.insert(META_SCHEMA, vec![0x01]).unwrap();
        assert!(matches!(
            handle.check_schema(),
            Err(StoreError::OpenFailure { .. })
        ));
    }

    #[test]
    fn reopening_shares_one_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payees");
        for i in 0..300 {
            let handle = StoreHandle::open(&path, payees_schema(), None).unwrap();
            handle.check_schema().unwrap();
            handle
                .write(|scope| scope.upsert(&Payee::new(format!("p{i}"), "PLe", "")))
                .unwrap();
            handle.close().unwrap();
        }
        let handle = StoreHandle::open(&path, payees_schema(), None).unwrap();
        assert_eq!(handle.count::<Payee>().unwrap(), 300);
    }

    #[test]
    fn released_directory_can_be_removed_and_recreated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payees");
        let handle = open_fresh(dir.path(), payees_schema(), None);
        handle.write(|scope| scope.upsert(&Payee::new("ann", "PLe", ""))).unwrap();
        handle.close().unwrap();

        release_db(&path);
        std::fs::remove_dir_all(&path).unwrap();
        let handle = open_fresh(dir.path(), payees_schema(), None);
        assert_eq!(handle.count::<Payee>().unwrap(), 0);
    }
}
