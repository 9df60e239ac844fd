//! # Compaction
//!
//! sled reclaims space lazily and offers no compact call, so a store is
//! compacted by rebuilding it:
//!
//! ```text
//! <store>            open through with_store (key + schema checked)
//!   └─ copy every tree ─► <store>.compacting   (batched, flushed)
//! close <store>
//! <store>            ─rename─► <store>.retired
//! <store>.compacting ─rename─► <store>
//! remove <store>.retired
//! ```
//!
//! The copy carries stored bytes over verbatim, sealed rows included, so
//! the logical content is unchanged and a second pass is a no-op apart from
//! the on-disk footprint. If the second rename fails the original is moved
//! back.
//!
//! A process that dies mid-pass can leave siblings behind. Before any store
//! is opened they are settled:
//!
//! | Found                                  | Meaning                  | Action                 |
//! |----------------------------------------|--------------------------|------------------------|
//! | `<store>` missing, `.retired` present  | died between the renames | rename `.retired` back |
//! | `<store>` and `.compacting` present    | died while copying       | discard `.compacting`  |
//! | `<store>` and `.retired` present       | died before cleanup      | discard `.retired`     |
//!
//! `.retired` is only ever deleted while `<store>` exists.
//!
//! A full pass visits the stores in a fixed order and stops at the first
//! failure. Stores compacted before it stay compacted; nothing is rolled
//! back across stores.

use chrono::{DateTime, Duration, Utc};
use sled::{Batch, Db};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use super::db::{open_db, release_db};
use super::error::{StoreError, StoreResult};
use super::manager::{remove_if_present, sibling, StoreManager};
use crate::config::{COMPACTION_INFO_STORE, COMPACTION_SUFFIX, DAY, RETIRED_SUFFIX};
use crate::crypto::{derive_key, StoreKey};
use crate::schema::{
    payees_schema, preferences_schema, transaction_details_schema, wallet_schema, StoreSchema,
};

/// Entries copied per batch while rebuilding a tree.
const COPY_BATCH_ENTRIES: usize = 512;

/// Outcome of compacting one store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompactionStats {
    pub store: String,
    /// Entries copied across every tree.
    pub entries: u64,
    pub bytes_before: u64,
    pub bytes_after: u64,
    /// The store did not exist, so there was nothing to do.
    pub skipped: bool,
}

impl CompactionStats {
    fn skipped(store: &str) -> Self {
        Self {
            store: store.to_string(),
            entries: 0,
            bytes_before: 0,
            bytes_after: 0,
            skipped: true,
        }
    }
}

/// Outcome of a full compaction pass.
#[derive(Debug, Default)]
pub struct CompactionReport {
    /// Stores finished before the pass ended, in visiting order.
    pub completed: Vec<CompactionStats>,
    /// The [`StoreError::CompactionFailure`] that ended the pass early.
    pub failure: Option<StoreError>,
}

impl CompactionReport {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Store the pass stopped at, if it failed.
    pub fn failed_store(&self) -> Option<&str> {
        match &self.failure {
            Some(StoreError::CompactionFailure { store, .. }) => Some(store),
            _ => None,
        }
    }
}

/// Whether a pass is due at `now`, given the last one ran at `last`.
/// Never having compacted counts as due. Exactly `interval_days` is not yet
/// due.
pub fn compaction_due(last: Option<DateTime<Utc>>, now: DateTime<Utc>, interval_days: u32) -> bool {
    match last {
        None => true,
        Some(last) => {
            let threshold = Duration::seconds(DAY.as_secs() as i64 * i64::from(interval_days));
            now.signed_duration_since(last) > threshold
        }
    }
}

impl StoreManager {
    /// Rebuild one store in place. A store that was never created is
    /// skipped.
    pub fn compact_store(&self, schema: &StoreSchema, key: Option<&StoreKey>) -> StoreResult<CompactionStats> {
        let path = self.config().store_path(&schema.store_id);
        if !self.store_exists(&schema.store_id) {
            debug!(store = %schema.store_id, "nothing to compact");
            return Ok(CompactionStats::skipped(&schema.store_id));
        }
        let scratch = sibling(&path, COMPACTION_SUFFIX);

        let copied = self.with_store(schema, key, |store| {
            let before = store.size_on_disk()?;
            let (entries, after) = rebuild(store.db(), &scratch)?;
            Ok((before, entries, after))
        });
        let (bytes_before, entries, bytes_after) = match copied {
            Ok(sizes) => sizes,
            Err(e) => {
                if let Err(cleanup) = remove_if_present(&scratch) {
                    warn!(path = %scratch.display(), error = %cleanup, "could not remove scratch copy");
                }
                return Err(e);
            }
        };

        swap_in(&path, &scratch)?;
        info!(
            store = %schema.store_id,
            entries,
            bytes_before,
            bytes_after,
            "store compacted"
        );
        Ok(CompactionStats {
            store: schema.store_id.clone(),
            entries,
            bytes_before,
            bytes_after,
            skipped: false,
        })
    }

    /// Compact every store in order: transaction details, payees, price
    /// data, preferences, then the wallet under the key derived from `pin`.
    /// Records the pass time only if every store succeeded.
    pub fn compact_all_report(&self, pin: &str) -> CompactionReport {
        let key = derive_key(pin);
        let plan: [(StoreSchema, Option<&StoreKey>); 5] = [
            (transaction_details_schema(), None),
            (payees_schema(), None),
            (self.price_schema(), None),
            (preferences_schema(), None),
            (wallet_schema(), Some(&key)),
        ];

        let mut report = CompactionReport::default();
        for (schema, key) in &plan {
            match self.compact_store(schema, *key) {
                Ok(stats) => report.completed.push(stats),
                Err(e) => {
                    warn!(store = %schema.store_id, error = %e, "compaction pass stopped");
                    report.failure = Some(StoreError::CompactionFailure {
                        store: schema.store_id.clone(),
                        source: Box::new(e),
                    });
                    return report;
                }
            }
        }

        if let Err(e) = self.save_last_compacted(Utc::now()) {
            report.failure = Some(StoreError::CompactionFailure {
                store: COMPACTION_INFO_STORE.to_string(),
                source: Box::new(e),
            });
        }
        report
    }

    /// [`compact_all_report`](Self::compact_all_report) reduced to
    /// success or failure; a failure is reported.
    pub fn compact_all(&self, pin: &str) -> bool {
        let report = self.compact_all_report(pin);
        if let Some(e) = &report.failure {
            self.reporter().report("failed to compact stores", e);
        }
        report.is_success()
    }

    /// Whether more than `interval_days` have passed between the last
    /// recorded pass and `now`.
    pub fn should_compact_at(&self, now: DateTime<Utc>, interval_days: u32) -> StoreResult<bool> {
        Ok(compaction_due(self.last_compacted()?, now, interval_days))
    }

    pub fn should_compact(&self, interval_days: u32) -> StoreResult<bool> {
        self.should_compact_at(Utc::now(), interval_days)
    }
}

/// Copy every tree of `source` into a fresh database at `target`. Returns
/// the number of entries copied and the new footprint.
fn rebuild(source: &Db, target: &Path) -> StoreResult<(u64, u64)> {
    remove_if_present(target)?;
    let rebuilt = open_db(target)?;
    let mut entries = 0u64;

    for name in source.tree_names() {
        let from = source.open_tree(&name)?;
        let to = rebuilt.open_tree(&name)?;

        let mut batch = Batch::default();
        let mut pending = 0usize;
        for item in from.iter() {
            let (key, value) = item?;
            batch.insert(key, value);
            pending += 1;
            entries += 1;
            if pending == COPY_BATCH_ENTRIES {
                to.apply_batch(std::mem::take(&mut batch))?;
                pending = 0;
            }
        }
        if pending > 0 {
            to.apply_batch(batch)?;
        }
    }

    rebuilt.flush()?;
    let size = rebuilt.size_on_disk()?;
    Ok((entries, size))
}

/// Replace the directory at `path` with `scratch`.
fn swap_in(path: &Path, scratch: &Path) -> StoreResult<()> {
    let retired = sibling(path, RETIRED_SUFFIX);
    if path.exists() {
        remove_if_present(&retired)?;
    }

    release_db(path);
    fs::rename(path, &retired)?;
    if let Err(e) = fs::rename(scratch, path) {
        if let Err(restore) = fs::rename(&retired, path) {
            warn!(path = %path.display(), error = %restore, "could not restore store after failed swap");
        }
        return Err(e.into());
    }
    remove_if_present(&retired)
}

/// Settle whatever an interrupted compaction left next to `path`. The
/// original store always wins over a rebuilt copy that never made it in.
pub(crate) fn recover_interrupted_swap(path: &Path) -> StoreResult<()> {
    let retired = sibling(path, RETIRED_SUFFIX);
    let scratch = sibling(path, COMPACTION_SUFFIX);

    if !path.exists() && retired.exists() {
        warn!(path = %path.display(), "restoring store parked by an interrupted compaction");
        fs::rename(&retired, path)?;
    }
    if scratch.exists() {
        debug!(path = %scratch.display(), "discarding unfinished compaction copy");
        remove_if_present(&scratch)?;
    }
    if path.exists() && retired.exists() {
        debug!(path = %retired.display(), "discarding store replaced by compaction");
        remove_if_present(&retired)?;
    }
    Ok(())
}
