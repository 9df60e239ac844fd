//! Per-entity mapping between the wallet-backend JSON document and the
//! stored [`WalletRecord`] graph.
//!
//! Every entity has an `encode_*` that reads its JSON object field by field
//! and a `decode_*` that writes it back. Arrays are walked in order and
//! rebuilt in order.

use serde_json::{json, Map, Value};

use super::json::{CodecError, CodecResult, Obj};
use crate::config::WALLET_FILE_FORMAT_VERSION;
use crate::model::{
    SubWallet, SubWalletsGroup, SynchronizationStatus, Transaction, TransactionInput, Transfer,
    TxPrivateKey, UnconfirmedInput, WalletRecord, WalletSynchronizer,
};

/// Build the stored graph from a wallet JSON document.
///
/// A document without `walletFileFormatVersion` is stamped with the current
/// version. A document claiming a newer version than this library knows is
/// rejected.
pub fn encode(doc: &Value) -> CodecResult<WalletRecord> {
    let root = Obj::new(doc, "")?;

    let wallet_file_format_version = if root.has("walletFileFormatVersion") {
        root.u64("walletFileFormatVersion")?
    } else {
        WALLET_FILE_FORMAT_VERSION
    };
    check_format_version(wallet_file_format_version)?;

    Ok(WalletRecord {
        wallet_file_format_version,
        sub_wallets: encode_sub_wallets_group(&root.obj("subWallets")?)?,
        synchronizer: encode_synchronizer(&root.obj("walletSynchronizer")?)?,
    })
}

/// Rebuild the wallet JSON document from the stored graph.
pub fn decode(record: &WalletRecord) -> Value {
    json!({
        "walletFileFormatVersion": record.wallet_file_format_version,
        "subWallets": decode_sub_wallets_group(&record.sub_wallets),
        "walletSynchronizer": decode_synchronizer(&record.synchronizer),
    })
}

/// Refuse documents written by a newer wallet format than we understand.
pub fn check_format_version(found: u64) -> CodecResult<()> {
    if found > WALLET_FILE_FORMAT_VERSION {
        return Err(CodecError::UnsupportedFormatVersion {
            found,
            supported: WALLET_FILE_FORMAT_VERSION,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Synchronizer
// ---------------------------------------------------------------------------

fn encode_synchronizer(obj: &Obj<'_>) -> CodecResult<WalletSynchronizer> {
    Ok(WalletSynchronizer {
        start_timestamp: obj.u64("startTimestamp")?,
        start_height: obj.u64("startHeight")?,
        private_view_key: obj.str("privateViewKey")?,
        status: encode_sync_status(&obj.obj("transactionSynchronizerStatus")?)?,
    })
}

fn decode_synchronizer(sync: &WalletSynchronizer) -> Value {
    json!({
        "startTimestamp": sync.start_timestamp,
        "startHeight": sync.start_height,
        "privateViewKey": sync.private_view_key,
        "transactionSynchronizerStatus": decode_sync_status(&sync.status),
    })
}

fn encode_sync_status(obj: &Obj<'_>) -> CodecResult<SynchronizationStatus> {
    Ok(SynchronizationStatus {
        block_hash_checkpoints: obj.str_list("blockHashCheckpoints")?,
        last_known_block_hashes: obj.str_list("lastKnownBlockHashes")?,
        last_known_block_height: obj.u64("lastKnownBlockHeight")?,
    })
}

fn decode_sync_status(status: &SynchronizationStatus) -> Value {
    json!({
        "blockHashCheckpoints": status.block_hash_checkpoints,
        "lastKnownBlockHashes": status.last_known_block_hashes,
        "lastKnownBlockHeight": status.last_known_block_height,
    })
}

// ---------------------------------------------------------------------------
// Subwallets
// ---------------------------------------------------------------------------

fn encode_sub_wallets_group(obj: &Obj<'_>) -> CodecResult<SubWalletsGroup> {
    Ok(SubWalletsGroup {
        public_spend_keys: obj.str_list("publicSpendKeys")?,
        sub_wallets: obj.list("subWallet", encode_sub_wallet)?,
        transactions: obj.list("transactions", encode_transaction)?,
        locked_transactions: obj.list("lockedTransactions", encode_transaction)?,
        private_view_key: obj.str("privateViewKey")?,
        is_view_wallet: obj.bool("isViewWallet")?,
        tx_private_keys: obj.list("txPrivateKeys", encode_tx_private_key)?,
    })
}

fn decode_sub_wallets_group(group: &SubWalletsGroup) -> Value {
    json!({
        "publicSpendKeys": group.public_spend_keys,
        "subWallet": group.sub_wallets.iter().map(decode_sub_wallet).collect::<Vec<_>>(),
        "transactions": group.transactions.iter().map(decode_transaction).collect::<Vec<_>>(),
        "lockedTransactions": group.locked_transactions.iter().map(decode_transaction).collect::<Vec<_>>(),
        "privateViewKey": group.private_view_key,
        "isViewWallet": group.is_view_wallet,
        "txPrivateKeys": group.tx_private_keys.iter().map(decode_tx_private_key).collect::<Vec<_>>(),
    })
}

fn encode_sub_wallet(obj: &Obj<'_>) -> CodecResult<SubWallet> {
    Ok(SubWallet {
        unspent_inputs: obj.list("unspentInputs", encode_input)?,
        locked_inputs: obj.list("lockedInputs", encode_input)?,
        spent_inputs: obj.list("spentInputs", encode_input)?,
        unconfirmed_incoming_amounts: obj.list("unconfirmedIncomingAmounts", encode_unconfirmed)?,
        public_spend_key: obj.str("publicSpendKey")?,
        private_spend_key: obj.str("privateSpendKey")?,
        sync_start_timestamp: obj.u64("syncStartTimestamp")?,
        sync_start_height: obj.u64("syncStartHeight")?,
        address: obj.str("address")?,
        is_primary_address: obj.bool("isPrimaryAddress")?,
    })
}

fn decode_sub_wallet(wallet: &SubWallet) -> Value {
    json!({
        "unspentInputs": wallet.unspent_inputs.iter().map(decode_input).collect::<Vec<_>>(),
        "lockedInputs": wallet.locked_inputs.iter().map(decode_input).collect::<Vec<_>>(),
        "spentInputs": wallet.spent_inputs.iter().map(decode_input).collect::<Vec<_>>(),
        "unconfirmedIncomingAmounts": wallet
            .unconfirmed_incoming_amounts
            .iter()
            .map(decode_unconfirmed)
            .collect::<Vec<_>>(),
        "publicSpendKey": wallet.public_spend_key,
        "privateSpendKey": wallet.private_spend_key,
        "syncStartTimestamp": wallet.sync_start_timestamp,
        "syncStartHeight": wallet.sync_start_height,
        "address": wallet.address,
        "isPrimaryAddress": wallet.is_primary_address,
    })
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

fn encode_input(obj: &Obj<'_>) -> CodecResult<TransactionInput> {
    Ok(TransactionInput {
        key_image: obj.str("keyImage")?,
        amount: obj.u64("amount")?,
        block_height: obj.u64("blockHeight")?,
        transaction_public_key: obj.str("transactionPublicKey")?,
        transaction_index: obj.u64("transactionIndex")?,
        global_output_index: obj.opt_u64("globalOutputIndex")?,
        key: obj.str("key")?,
        spend_height: obj.u64("spendHeight")?,
        unlock_time: obj.u64("unlockTime")?,
        parent_transaction_hash: obj.str("parentTransactionHash")?,
    })
}

fn decode_input(input: &TransactionInput) -> Value {
    let mut map = Map::new();
    map.insert("keyImage".into(), json!(input.key_image));
    map.insert("amount".into(), json!(input.amount));
    map.insert("blockHeight".into(), json!(input.block_height));
    map.insert("transactionPublicKey".into(), json!(input.transaction_public_key));
    map.insert("transactionIndex".into(), json!(input.transaction_index));
    // Unknown is written as a missing field, never as `null`.
    if let Some(index) = input.global_output_index {
        map.insert("globalOutputIndex".into(), json!(index));
    }
    map.insert("key".into(), json!(input.key));
    map.insert("spendHeight".into(), json!(input.spend_height));
    map.insert("unlockTime".into(), json!(input.unlock_time));
    map.insert("parentTransactionHash".into(), json!(input.parent_transaction_hash));
    Value::Object(map)
}

fn encode_unconfirmed(obj: &Obj<'_>) -> CodecResult<UnconfirmedInput> {
    Ok(UnconfirmedInput {
        amount: obj.u64("amount")?,
        key: obj.str("key")?,
        parent_transaction_hash: obj.str("parentTransactionHash")?,
    })
}

fn decode_unconfirmed(input: &UnconfirmedInput) -> Value {
    json!({
        "amount": input.amount,
        "key": input.key,
        "parentTransactionHash": input.parent_transaction_hash,
    })
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

fn encode_transaction(obj: &Obj<'_>) -> CodecResult<Transaction> {
    Ok(Transaction {
        transfers: obj.list("transfers", encode_transfer)?,
        hash: obj.str("hash")?,
        fee: obj.u64("fee")?,
        block_height: obj.u64("blockHeight")?,
        timestamp: obj.u64("timestamp")?,
        payment_id: obj.str("paymentID")?,
        unlock_time: obj.u64("unlockTime")?,
        is_coinbase_transaction: obj.bool("isCoinbaseTransaction")?,
    })
}

fn decode_transaction(tx: &Transaction) -> Value {
    json!({
        "transfers": tx.transfers.iter().map(decode_transfer).collect::<Vec<_>>(),
        "hash": tx.hash,
        "fee": tx.fee,
        "blockHeight": tx.block_height,
        "timestamp": tx.timestamp,
        "paymentID": tx.payment_id,
        "unlockTime": tx.unlock_time,
        "isCoinbaseTransaction": tx.is_coinbase_transaction,
    })
}

fn encode_transfer(obj: &Obj<'_>) -> CodecResult<Transfer> {
    Ok(Transfer {
        amount: obj.i64("amount")?,
        public_key: obj.str("publicKey")?,
    })
}

fn decode_transfer(transfer: &Transfer) -> Value {
    json!({
        "amount": transfer.amount,
        "publicKey": transfer.public_key,
    })
}

fn encode_tx_private_key(obj: &Obj<'_>) -> CodecResult<TxPrivateKey> {
    Ok(TxPrivateKey {
        transaction_hash: obj.str("transactionHash")?,
        tx_private_key: obj.str("txPrivateKey")?,
    })
}

fn decode_tx_private_key(key: &TxPrivateKey) -> Value {
    json!({
        "transactionHash": key.transaction_hash,
        "txPrivateKey": key.tx_private_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::fixtures::{empty_wallet_json, input_json, rich_wallet_json};

    #[test]
    fn empty_wallet_round_trips() {
        let doc = empty_wallet_json();
        let record = encode(&doc).unwrap();
        assert!(record.sub_wallets.sub_wallets[0].unspent_inputs.is_empty());
        assert_eq!(decode(&record), doc);
    }

    #[test]
    fn rich_wallet_round_trips() {
        let doc = rich_wallet_json();
        assert_eq!(decode(&encode(&doc).unwrap()), doc);
    }

    #[test]
    fn wallet_with_no_subwallets_round_trips() {
        let mut doc = empty_wallet_json();
        doc["subWallets"]["subWallet"] = json!([]);
        doc["subWallets"]["publicSpendKeys"] = json!([]);
        assert_eq!(decode(&encode(&doc).unwrap()), doc);
    }

    #[test]
    fn list_order_is_preserved() {
        let mut doc = empty_wallet_json();
        doc["subWallets"]["subWallet"][0]["unspentInputs"] =
            json!([input_json("ki-3", 300), input_json("ki-1", 100), input_json("ki-2", 200)]);
        doc["walletSynchronizer"]["transactionSynchronizerStatus"]["blockHashCheckpoints"] =
            json!(["h9", "h1", "h5"]);

        let record = encode(&doc).unwrap();
        let images: Vec<&str> = record.sub_wallets.sub_wallets[0]
            .unspent_inputs
            .iter()
            .map(|i| i.key_image.as_str())
            .collect();
        assert_eq!(images, vec!["ki-3", "ki-1", "ki-2"]);
        assert_eq!(decode(&record), doc);
    }

    #[test]
    fn negative_transfer_amounts_survive() {
        let doc = rich_wallet_json();
        let record = encode(&doc).unwrap();
        let amounts: Vec<i64> = record.sub_wallets.transactions[0]
            .transfers
            .iter()
            .map(|t| t.amount)
            .collect();
        assert_eq!(amounts, vec![-1_500_000, 250_000]);
    }

    #[test]
    fn absent_global_output_index_stays_absent() {
        let doc = rich_wallet_json();
        let record = encode(&doc).unwrap();
        let locked = &record.sub_wallets.sub_wallets[0].locked_inputs[0];
        assert_eq!(locked.global_output_index, None);
        let back = decode(&record);
        assert!(back["subWallets"]["subWallet"][0]["lockedInputs"][0]
            .get("globalOutputIndex")
            .is_none());
    }

    #[test]
    fn null_global_output_index_is_written_back_as_absent() {
        let mut doc = rich_wallet_json();
        let unspent = &mut doc["subWallets"]["subWallet"][0]["unspentInputs"][0];
        unspent["globalOutputIndex"] = Value::Null;

        let record = encode(&doc).unwrap();
        assert_eq!(record.sub_wallets.sub_wallets[0].unspent_inputs[0].global_output_index, None);

        let back = decode(&record);
        let input = &back["subWallets"]["subWallet"][0]["unspentInputs"][0];
        assert!(input.get("globalOutputIndex").is_none());

        // Once normalized, the document is stable.
        assert_eq!(decode(&encode(&back).unwrap()), back);
    }

    #[test]
    fn missing_version_is_stamped_with_current() {
        let mut doc = empty_wallet_json();
        doc.as_object_mut().unwrap().remove("walletFileFormatVersion");
        let record = encode(&doc).unwrap();
        assert_eq!(record.wallet_file_format_version, WALLET_FILE_FORMAT_VERSION);
    }

    #[test]
    fn newer_format_version_is_rejected() {
        let mut doc = empty_wallet_json();
        doc["walletFileFormatVersion"] = json!(WALLET_FILE_FORMAT_VERSION + 1);
        assert_eq!(
            encode(&doc).unwrap_err(),
            CodecError::UnsupportedFormatVersion {
                found: WALLET_FILE_FORMAT_VERSION + 1,
                supported: WALLET_FILE_FORMAT_VERSION,
            }
        );
    }

    #[test]
    fn missing_nested_field_reports_path() {
        let mut doc = empty_wallet_json();
        doc["subWallets"]["subWallet"][0]
            .as_object_mut()
            .unwrap()
            .remove("address");
        assert_eq!(
            encode(&doc).unwrap_err(),
            CodecError::MissingField {
                path: "subWallets.subWallet[0].address".into()
            }
        );
    }

    #[test]
    fn negative_input_amount_is_rejected() {
        let mut doc = empty_wallet_json();
        let mut bad = input_json("ki", 1);
        bad["amount"] = json!(-5);
        doc["subWallets"]["subWallet"][0]["spentInputs"] = json!([bad]);
        assert!(matches!(
            encode(&doc).unwrap_err(),
            CodecError::WrongType { ref path, .. } if path == "subWallets.subWallet[0].spentInputs[0].amount"
        ));
    }
}
