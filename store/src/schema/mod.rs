//! # Schema Registry
//!
//! Every store declares its own [`StoreSchema`]: which entities it holds,
//! how each one is keyed, what fields it carries, whether it is encrypted,
//! and what happens when the data on disk was written under a different
//! schema ([`MigrationPolicy`]).
//!
//! ## Key conventions
//!
//! | Convention            | Storage key                      | Example         |
//! |-----------------------|----------------------------------|-----------------|
//! | `Singleton(k)`        | `<entity> 0x00 <k as u64 BE>`    | Preferences @ 1 |
//! | `Natural(field)`      | `<entity> 0x00 <field UTF-8>`    | Payee nickname  |
//! | `Embedded`            | never stored on its own          | Transfer        |
//!
//! Singletons are only ever written with replace semantics on their fixed
//! key, so a singleton entity has zero or one row no matter how often it is
//! saved. Natural keys are unique by construction for the same reason.
//!
//! ## Fingerprints
//!
//! A schema's identity on disk is its version plus a BLAKE3 fingerprint of
//! its canonical description. The price cache schema is built at runtime
//! from the configured currency list, so changing that list changes the
//! fingerprint and counts as a schema change.

pub mod stores;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use stores::{
    compaction_info_schema, payees_schema, preferences_schema, price_data_schema,
    transaction_details_schema, wallet_schema,
};

/// Separator between the entity name and the row key in storage keys.
const KEY_SEPARATOR: u8 = 0x00;

// ---------------------------------------------------------------------------
// Migration Policy
// ---------------------------------------------------------------------------

/// What to do when a store's persisted schema differs from its declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MigrationPolicy {
    /// Drop the store and recreate it empty. Only for caches and data the
    /// app can rebuild or live without.
    Destructive,
    /// Refuse to open. Used for the wallet store, whose contents are
    /// irreplaceable.
    Fail,
}

// ---------------------------------------------------------------------------
// Entity & Field Definitions
// ---------------------------------------------------------------------------

/// How rows of an entity are keyed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyConvention {
    /// Exactly one row, at this fixed key.
    Singleton(u64),
    /// One row per distinct value of the named field.
    Natural(String),
    /// Owned by a parent row; never stored on its own.
    Embedded,
}

/// Value type of a field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Bool,
    Timestamp,
    /// Single owned child of the named entity.
    Child(String),
    /// Ordered sequence of owned children of the named entity.
    Children(String),
    /// Ordered sequence of strings.
    TextList,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    pub optional: bool,
}

impl FieldDef {
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            optional: false,
        }
    }

    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            optional: true,
        }
    }
}

/// Shape of one entity type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    pub name: String,
    pub key: KeyConvention,
    pub fields: Vec<FieldDef>,
}

impl EntitySchema {
    pub fn new(name: impl Into<String>, key: KeyConvention, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.into(),
            key,
            fields,
        }
    }

    /// Whether rows of this entity live at the top level of the store.
    pub fn is_stored(&self) -> bool {
        !matches!(self.key, KeyConvention::Embedded)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

// ---------------------------------------------------------------------------
// Store Schema
// ---------------------------------------------------------------------------

/// Complete declaration of one store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreSchema {
    pub store_id: String,
    pub version: u32,
    pub encrypted: bool,
    pub migration: MigrationPolicy,
    pub entities: Vec<EntitySchema>,
}

/// The part of a schema that determines on-disk shape. Migration policy
/// and encryption are properties of how a store is opened, not of its rows.
#[derive(Serialize)]
struct CanonicalSchema<'a> {
    store_id: &'a str,
    version: u32,
    entities: &'a [EntitySchema],
}

impl StoreSchema {
    pub fn entity(&self, name: &str) -> Option<&EntitySchema> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Whether `name` is declared as a top-level (non-embedded) entity.
    pub fn stores_entity(&self, name: &str) -> bool {
        self.entity(name).map_or(false, EntitySchema::is_stored)
    }

    /// BLAKE3 fingerprint of the canonical description.
    pub fn fingerprint(&self) -> [u8; 32] {
        let canonical = CanonicalSchema {
            store_id: &self.store_id,
            version: self.version,
            entities: &self.entities,
        };
        // Serializing plain strings, enums and vectors into a Vec cannot fail.
        let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
        *blake3::hash(&bytes).as_bytes()
    }

    /// The marker persisted alongside the rows to detect schema drift.
    pub fn marker(&self) -> SchemaMarker {
        SchemaMarker {
            store_id: self.store_id.clone(),
            version: self.version,
            fingerprint: self.fingerprint(),
        }
    }
}

/// Schema identity as persisted in a store's `meta` tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMarker {
    pub store_id: String,
    pub version: u32,
    pub fingerprint: [u8; 32],
}

impl fmt::Display for SchemaMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} v{} ({})",
            self.store_id,
            self.version,
            &hex::encode(self.fingerprint)[..16]
        )
    }
}

// ---------------------------------------------------------------------------
// Typed Rows
// ---------------------------------------------------------------------------

/// Primary key of a stored row.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Fixed(u64),
    Natural(String),
}

impl RecordKey {
    pub fn natural(value: impl Into<String>) -> Self {
        Self::Natural(value.into())
    }

    fn bytes(&self) -> Vec<u8> {
        match self {
            Self::Fixed(k) => k.to_be_bytes().to_vec(),
            Self::Natural(s) => s.as_bytes().to_vec(),
        }
    }
}

/// A row type that can be stored at the top level of a store.
pub trait Entity: Serialize + DeserializeOwned {
    /// Entity name; must match an [`EntitySchema`] in the owning store.
    const NAME: &'static str;

    fn key(&self) -> RecordKey;
}

/// An entity with exactly one row at a fixed key.
pub trait Singleton: Entity {
    const KEY: u64;
}

/// Storage key of the row of entity `entity` at `key`.
pub fn storage_key(entity: &str, key: &RecordKey) -> Vec<u8> {
    let mut out = entity_prefix(entity);
    out.extend_from_slice(&key.bytes());
    out
}

/// Prefix shared by every storage key of `entity`.
pub fn entity_prefix(entity: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(entity.len() + 1);
    out.extend_from_slice(entity.as_bytes());
    out.push(KEY_SEPARATOR);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_for_equal_schemas() {
        assert_eq!(payees_schema().fingerprint(), payees_schema().fingerprint());
    }

    #[test]
    fn fingerprint_changes_with_version() {
        let mut bumped = payees_schema();
        bumped.version += 1;
        assert_ne!(bumped.fingerprint(), payees_schema().fingerprint());
    }

    #[test]
    fn fingerprint_ignores_migration_policy() {
        let mut relaxed = wallet_schema();
        relaxed.migration = MigrationPolicy::Destructive;
        assert_eq!(relaxed.fingerprint(), wallet_schema().fingerprint());
    }

    #[test]
    fn storage_keys_do_not_collide_across_entities() {
        let a = storage_key("Payee", &RecordKey::natural("x"));
        let b = storage_key("PayeeX", &RecordKey::natural(""));
        assert_ne!(a, b);
        assert!(a.starts_with(&entity_prefix("Payee")));
        assert!(!b.starts_with(&entity_prefix("Payee")));
    }

    #[test]
    fn fixed_keys_sort_numerically() {
        let one = storage_key("E", &RecordKey::Fixed(1));
        let two_fifty_six = storage_key("E", &RecordKey::Fixed(256));
        assert!(one < two_fifty_six);
    }

    #[test]
    fn marker_display_is_short() {
        let shown = preferences_schema().marker().to_string();
        assert!(shown.starts_with("preferences v1 ("));
        assert!(shown.ends_with(')'));
    }
}
