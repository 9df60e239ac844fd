//! Declarations of the six stores.

use super::{EntitySchema, FieldDef, FieldKind, KeyConvention, MigrationPolicy, StoreSchema};
use crate::config::{
    COMPACTION_INFO_KEY, COMPACTION_INFO_SCHEMA_VERSION, COMPACTION_INFO_STORE, PAYEES_SCHEMA_VERSION,
    PAYEES_STORE, PREFERENCES_KEY, PREFERENCES_SCHEMA_VERSION, PREFERENCES_STORE, PRICE_CACHE_KEY,
    PRICE_DATA_SCHEMA_VERSION, PRICE_DATA_STORE, TRANSACTION_DETAILS_SCHEMA_VERSION,
    TRANSACTION_DETAILS_STORE, WALLET_RECORD_KEY, WALLET_SCHEMA_VERSION, WALLET_STORE,
};
use crate::model::{
    CompactionInfo, Payee, Preferences, PriceCache, TransactionDetails, WalletRecord,
};
use crate::schema::Entity;

use FieldKind::{Bool, Child, Children, Float, Integer, Text, TextList, Timestamp};

fn req(name: &str, kind: FieldKind) -> FieldDef {
    FieldDef::required(name, kind)
}

fn child(entity: &str) -> FieldKind {
    Child(entity.to_string())
}

fn children(entity: &str) -> FieldKind {
    Children(entity.to_string())
}

/// The encrypted wallet store.
///
/// Its migration policy is `Fail`: a wallet written under another schema is
/// never dropped automatically. Changing this is a product decision, not a
/// refactor; `wallet_store_never_migrates_destructively` guards it.
pub fn wallet_schema() -> StoreSchema {
    let input_fields = vec![
        req("key_image", Text),
        req("amount", Integer),
        req("block_height", Integer),
        req("transaction_public_key", Text),
        req("transaction_index", Integer),
        FieldDef::optional("global_output_index", Integer),
        req("key", Text),
        req("spend_height", Integer),
        req("unlock_time", Integer),
        req("parent_transaction_hash", Text),
    ];

    StoreSchema {
        store_id: WALLET_STORE.to_string(),
        version: WALLET_SCHEMA_VERSION,
        encrypted: true,
        migration: MigrationPolicy::Fail,
        entities: vec![
            EntitySchema::new(
                WalletRecord::NAME,
                KeyConvention::Singleton(WALLET_RECORD_KEY),
                vec![
                    req("wallet_file_format_version", Integer),
                    req("sub_wallets", child("SubWalletsGroup")),
                    req("synchronizer", child("WalletSynchronizer")),
                ],
            ),
            EntitySchema::new(
                "WalletSynchronizer",
                KeyConvention::Embedded,
                vec![
                    req("start_timestamp", Integer),
                    req("start_height", Integer),
                    req("private_view_key", Text),
                    req("status", child("SynchronizationStatus")),
                ],
            ),
            EntitySchema::new(
                "SynchronizationStatus",
                KeyConvention::Embedded,
                vec![
                    req("block_hash_checkpoints", TextList),
                    req("last_known_block_hashes", TextList),
                    req("last_known_block_height", Integer),
                ],
            ),
            EntitySchema::new(
                "SubWalletsGroup",
                KeyConvention::Embedded,
                vec![
                    req("public_spend_keys", TextList),
                    req("sub_wallets", children("SubWallet")),
                    req("transactions", children("Transaction")),
                    req("locked_transactions", children("Transaction")),
                    req("private_view_key", Text),
                    req("is_view_wallet", Bool),
                    req("tx_private_keys", children("TxPrivateKey")),
                ],
            ),
            EntitySchema::new(
                "SubWallet",
                KeyConvention::Embedded,
                vec![
                    req("unspent_inputs", children("TransactionInput")),
                    req("locked_inputs", children("TransactionInput")),
                    req("spent_inputs", children("TransactionInput")),
                    req("unconfirmed_incoming_amounts", children("UnconfirmedInput")),
                    req("public_spend_key", Text),
                    req("private_spend_key", Text),
                    req("sync_start_timestamp", Integer),
                    req("sync_start_height", Integer),
                    req("address", Text),
                    req("is_primary_address", Bool),
                ],
            ),
            EntitySchema::new(
                "Transaction",
                KeyConvention::Embedded,
                vec![
                    req("transfers", children("Transfer")),
                    req("hash", Text),
                    req("fee", Integer),
                    req("block_height", Integer),
                    req("timestamp", Integer),
                    req("payment_id", Text),
                    req("unlock_time", Integer),
                    req("is_coinbase_transaction", Bool),
                ],
            ),
            EntitySchema::new("TransactionInput", KeyConvention::Embedded, input_fields),
            EntitySchema::new(
                "UnconfirmedInput",
                KeyConvention::Embedded,
                vec![
                    req("amount", Integer),
                    req("key", Text),
                    req("parent_transaction_hash", Text),
                ],
            ),
            EntitySchema::new(
                "Transfer",
                KeyConvention::Embedded,
                vec![req("amount", Integer), req("public_key", Text)],
            ),
            EntitySchema::new(
                "TxPrivateKey",
                KeyConvention::Embedded,
                vec![req("transaction_hash", Text), req("tx_private_key", Text)],
            ),
        ],
    }
}

fn plaintext_store(store_id: &str, version: u32, entity: EntitySchema) -> StoreSchema {
    StoreSchema {
        store_id: store_id.to_string(),
        version,
        encrypted: false,
        migration: MigrationPolicy::Destructive,
        entities: vec![entity],
    }
}

pub fn preferences_schema() -> StoreSchema {
    plaintext_store(
        PREFERENCES_STORE,
        PREFERENCES_SCHEMA_VERSION,
        EntitySchema::new(
            Preferences::NAME,
            KeyConvention::Singleton(PREFERENCES_KEY),
            vec![
                req("currency", Text),
                req("notifications_enabled", Bool),
                req("scan_coinbase_transactions", Bool),
                req("limit_data", Bool),
                req("theme", Text),
                req("auth_confirmation", Bool),
            ],
        ),
    )
}

pub fn payees_schema() -> StoreSchema {
    plaintext_store(
        PAYEES_STORE,
        PAYEES_SCHEMA_VERSION,
        EntitySchema::new(
            Payee::NAME,
            KeyConvention::Natural("nickname".to_string()),
            vec![
                req("nickname", Text),
                req("address", Text),
                req("payment_id", Text),
            ],
        ),
    )
}

pub fn transaction_details_schema() -> StoreSchema {
    plaintext_store(
        TRANSACTION_DETAILS_STORE,
        TRANSACTION_DETAILS_SCHEMA_VERSION,
        EntitySchema::new(
            TransactionDetails::NAME,
            KeyConvention::Natural("hash".to_string()),
            vec![
                req("hash", Text),
                req("memo", Text),
                req("address", Text),
                req("payee", Text),
            ],
        ),
    )
}

/// Price cache shaped by `currencies`: one optional float field per code.
pub fn price_data_schema<S: AsRef<str>>(currencies: &[S]) -> StoreSchema {
    let fields = currencies
        .iter()
        .map(|code| FieldDef::optional(code.as_ref(), Float))
        .collect();

    plaintext_store(
        PRICE_DATA_STORE,
        PRICE_DATA_SCHEMA_VERSION,
        EntitySchema::new(
            PriceCache::NAME,
            KeyConvention::Singleton(PRICE_CACHE_KEY),
            fields,
        ),
    )
}

pub fn compaction_info_schema() -> StoreSchema {
    plaintext_store(
        COMPACTION_INFO_STORE,
        COMPACTION_INFO_SCHEMA_VERSION,
        EntitySchema::new(
            CompactionInfo::NAME,
            KeyConvention::Singleton(COMPACTION_INFO_KEY),
            vec![req("last_updated", Timestamp)],
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_store_never_migrates_destructively() {
        let schema = wallet_schema();
        assert!(schema.encrypted);
        assert_eq!(schema.migration, MigrationPolicy::Fail);
    }

    #[test]
    fn secondary_stores_migrate_destructively_and_are_plaintext() {
        for schema in [
            preferences_schema(),
            payees_schema(),
            price_data_schema(&["usd"]),
            transaction_details_schema(),
            compaction_info_schema(),
        ] {
            assert_eq!(schema.migration, MigrationPolicy::Destructive, "{}", schema.store_id);
            assert!(!schema.encrypted, "{}", schema.store_id);
        }
    }

    #[test]
    fn only_wallet_record_is_stored_at_top_level_of_wallet_store() {
        let schema = wallet_schema();
        let stored: Vec<&str> = schema
            .entities
            .iter()
            .filter(|e| e.is_stored())
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(stored, vec!["WalletRecord"]);
        assert!(!schema.stores_entity("SubWallet"));
    }

    #[test]
    fn every_child_reference_names_a_declared_entity() {
        let schema = wallet_schema();
        for entity in &schema.entities {
            for field in &entity.fields {
                if let Child(target) | Children(target) = &field.kind {
                    assert!(
                        schema.entity(target).is_some(),
                        "{}.{} refers to unknown {}",
                        entity.name,
                        field.name,
                        target
                    );
                }
            }
        }
    }

    #[test]
    fn price_schema_has_one_field_per_currency() {
        let schema = price_data_schema(&["usd", "eur", "btc"]);
        let entity = schema.entity("PriceCache").unwrap();
        assert_eq!(entity.fields.len(), 3);
        assert_eq!(entity.field("eur").unwrap().kind, Float);
        assert!(entity.field("jpy").is_none());
    }

    #[test]
    fn price_schema_fingerprint_follows_currency_list() {
        let a = price_data_schema(&["usd", "eur"]);
        let b = price_data_schema(&["usd", "eur"]);
        let c = price_data_schema(&["usd", "eur", "gbp"]);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn natural_keys_name_declared_fields() {
        for schema in [payees_schema(), transaction_details_schema()] {
            for entity in &schema.entities {
                if let KeyConvention::Natural(field) = &entity.key {
                    assert!(entity.field(field).is_some());
                }
            }
        }
    }
}
