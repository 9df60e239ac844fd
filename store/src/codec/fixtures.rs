//! Wallet documents shared by the codec and store tests.

use serde_json::{json, Value};

pub(crate) fn input_json(key_image: &str, amount: u64) -> Value {
    json!({
        "keyImage": key_image,
        "amount": amount,
        "blockHeight": 120_400,
        "transactionPublicKey": format!("txpub-{key_image}"),
        "transactionIndex": 1,
        "globalOutputIndex": 88_231,
        "key": format!("otk-{key_image}"),
        "spendHeight": 0,
        "unlockTime": 0,
        "parentTransactionHash": format!("parent-{key_image}"),
    })
}

/// One primary subwallet, every collection empty.
pub(crate) fn empty_wallet_json() -> Value {
    json!({
        "walletFileFormatVersion": 0,
        "subWallets": {
            "publicSpendKeys": ["spend-pub-0"],
            "subWallet": [{
                "unspentInputs": [],
                "lockedInputs": [],
                "spentInputs": [],
                "unconfirmedIncomingAmounts": [],
                "publicSpendKey": "spend-pub-0",
                "privateSpendKey": "spend-priv-0",
                "syncStartTimestamp": 0,
                "syncStartHeight": 100_000,
                "address": "PLeaXYZprimary",
                "isPrimaryAddress": true,
            }],
            "transactions": [],
            "lockedTransactions": [],
            "privateViewKey": "view-priv",
            "isViewWallet": false,
            "txPrivateKeys": [],
        },
        "walletSynchronizer": {
            "startTimestamp": 0,
            "startHeight": 100_000,
            "privateViewKey": "view-priv",
            "transactionSynchronizerStatus": {
                "blockHashCheckpoints": [],
                "lastKnownBlockHashes": [],
                "lastKnownBlockHeight": 100_000,
            },
        },
    })
}

/// Two subwallets, populated at every level.
pub(crate) fn rich_wallet_json() -> Value {
    let mut locked = input_json("ki-locked", 700);
    if let Some(fields) = locked.as_object_mut() {
        fields.remove("globalOutputIndex");
    }
    let mut spent = input_json("ki-spent", 5_000);
    spent["spendHeight"] = json!(120_500);

    json!({
        "walletFileFormatVersion": 0,
        "subWallets": {
            "publicSpendKeys": ["spend-pub-0", "spend-pub-1"],
            "subWallet": [
                {
                    "unspentInputs": [input_json("ki-a", 1_000_000), input_json("ki-b", 250_000)],
                    "lockedInputs": [locked],
                    "spentInputs": [spent],
                    "unconfirmedIncomingAmounts": [
                        { "amount": 40, "key": "pending-key", "parentTransactionHash": "pending-tx" }
                    ],
                    "publicSpendKey": "spend-pub-0",
                    "privateSpendKey": "spend-priv-0",
                    "syncStartTimestamp": 1_560_000_000,
                    "syncStartHeight": 0,
                    "address": "PLeaXYZprimary",
                    "isPrimaryAddress": true,
                },
                {
                    "unspentInputs": [],
                    "lockedInputs": [],
                    "spentInputs": [],
                    "unconfirmedIncomingAmounts": [],
                    "publicSpendKey": "spend-pub-1",
                    "privateSpendKey": "spend-priv-1",
                    "syncStartTimestamp": 0,
                    "syncStartHeight": 120_000,
                    "address": "PLeaXYZsecond",
                    "isPrimaryAddress": false,
                },
            ],
            "transactions": [{
                "transfers": [
                    { "amount": -1_500_000, "publicKey": "spend-pub-0" },
                    { "amount": 250_000, "publicKey": "spend-pub-1" },
                ],
                "hash": "tx-hash-1",
                "fee": 10,
                "blockHeight": 120_401,
                "timestamp": 1_560_000_321,
                "paymentID": "",
                "unlockTime": 0,
                "isCoinbaseTransaction": false,
            }],
            "lockedTransactions": [{
                "transfers": [],
                "hash": "tx-hash-2",
                "fee": 0,
                "blockHeight": 0,
                "timestamp": 0,
                "paymentID": "f00d",
                "unlockTime": 120_600,
                "isCoinbaseTransaction": true,
            }],
            "privateViewKey": "view-priv",
            "isViewWallet": false,
            "txPrivateKeys": [
                { "transactionHash": "tx-hash-1", "txPrivateKey": "tx-priv-1" },
            ],
        },
        "walletSynchronizer": {
            "startTimestamp": 1_560_000_000,
            "startHeight": 0,
            "privateViewKey": "view-priv",
            "transactionSynchronizerStatus": {
                "blockHashCheckpoints": ["cp-0", "cp-5000", "cp-10000"],
                "lastKnownBlockHashes": ["bh-3", "bh-2", "bh-1"],
                "lastKnownBlockHeight": 120_401,
            },
        },
    })
}
