use std::sync::Arc;

use alloy::primitives::{Address, B256, U256, address, b256};
use chainwatch::{
    engine::EventMatcher,
    models::{BlockData, Log, Match},
    providers::PriceTable,
    test_helpers::{BlockBuilder, LogBuilder, TransactionBuilder, TriggerBuilder, erc20_abi_json},
};
use serde_json::json;

const TOKEN: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
const SENDER: Address = address!("4a574510c7014e4ae985403536074abe582adfc8");
const RECIPIENT: Address = address!("cd95c2b7b1a5ae0a1e7dc4e2f6c10b6f8a8fa3e2");
const TRANSFER: B256 = b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef");
const APPROVAL: B256 = b256!("8c5be1e5ebec7d5bd14f71427d1e84f3dd0314c0f7b2291e5b200ac8c7c3b925");
const TX_HASH: B256 = b256!("2222222222222222222222222222222222222222222222222222222222222222");

fn log(signature: B256, log_index: u64) -> Log {
    LogBuilder::selector(TOKEN, signature)
        .indexed_address(SENDER)
        .indexed_address(RECIPIENT)
        .word(U256::from(677_420_000u64))
        .in_transaction(TX_HASH, log_index)
        .in_block(21_000_000, B256::repeat_byte(0xcd))
        .build()
}

fn block(logs: Vec<Log>) -> BlockData {
    let parent = TransactionBuilder::new().hash(TX_HASH).from(SENDER).to(TOKEN).build();
    BlockBuilder::at(21_000_000).hash(B256::repeat_byte(0xcd)).transaction(parent).into_data(logs)
}

fn param_filter(parameter: &str, ty: &str, predicate: &str, attribute: &str) -> serde_json::Value {
    json!({
        "FilterType": "CheckEventParameter",
        "EventName": "Transfer",
        "ParameterName": parameter,
        "ParameterType": ty,
        "Condition": { "Predicate": predicate, "Attribute": attribute }
    })
}

#[tokio::test]
async fn test_transfer_to_recipient_matches_exactly_once() {
    let trigger = TriggerBuilder::new("WatchEvents")
        .contract(TOKEN)
        .abi(erc20_abi_json())
        .filter(param_filter("to", "address", "Eq", "0xcd95c2b7b1a5ae0a1e7dc4e2f6c10b6f8a8fa3e2"))
        .filter(param_filter("value", "uint256", "BiggerThan", "0"))
        .filter(json!({
            "FilterType": "BasicFilter",
            "ParameterName": "From",
            "Condition": { "Predicate": "Eq", "Attribute": "0x4A574510C7014E4AE985403536074ABE582ADFC8" }
        }))
        .build();

    let matcher = EventMatcher::new(Arc::new(PriceTable::default()), [TOKEN]);
    let matches = matcher.match_block(&trigger, &block(vec![log(TRANSFER, 0), log(APPROVAL, 1)])).await;

    assert_eq!(matches.len(), 1);
    let Match::Event(m) = &matches[0] else { panic!("expected an event match") };
    assert_eq!(m.log_index, 0);
    assert_eq!(m.transaction_hash, TX_HASH);
    assert_eq!(m.params["from"], json!(SENDER.to_checksum(None)));
    assert_eq!(m.params["value"], json!("677420000"));
    assert_eq!(m.transaction.as_ref().map(|tx| tx.from), Some(SENDER));
}

#[tokio::test]
async fn test_other_signature_never_matches_whatever_the_filters() {
    let emitted = TriggerBuilder::new("WatchEvents")
        .contract(TOKEN)
        .abi(erc20_abi_json())
        .filter(json!({ "FilterType": "CheckEventEmitted", "EventName": "Transfer" }))
        .build();
    let permissive = TriggerBuilder::new("WatchEvents")
        .contract(TOKEN)
        .abi(erc20_abi_json())
        .filter(param_filter("value", "uint256", "BiggerThan", "0"))
        .build();

    let matcher = EventMatcher::new(Arc::new(PriceTable::default()), [TOKEN]);
    let approvals = block(vec![log(APPROVAL, 0), log(APPROVAL, 1)]);

    assert!(matcher.match_block(&emitted, &approvals).await.is_empty());
    assert!(matcher.match_block(&permissive, &approvals).await.is_empty());
}
