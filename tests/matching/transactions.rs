use std::sync::Arc;

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, B256, U256, address},
};
use chainwatch::{
    abi::{CachedContract, encode_call},
    engine::TransactionMatcher,
    filtering::Asset,
    models::{BlockData, Match},
    providers::PriceTable,
    test_helpers::{BlockBuilder, TransactionBuilder, TriggerBuilder, erc20_abi_json},
};
use rust_decimal::Decimal;
use serde_json::json;

const USDC: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
const SENDER: Address = address!("4a574510c7014e4ae985403536074abe582adfc8");
const RECIPIENT: Address = address!("cd95c2b7b1a5ae0a1e7dc4e2f6c10b6f8a8fa3e2");

fn transfer_input(amount: U256) -> alloy::primitives::Bytes {
    let contract = CachedContract::parse(erc20_abi_json()).unwrap();
    encode_call(
        contract.function("transfer").unwrap(),
        &[DynSolValue::Address(RECIPIENT), DynSolValue::Uint(amount, 256)],
    )
    .unwrap()
}

fn block(transactions: Vec<chainwatch::models::Transaction>) -> BlockData {
    BlockBuilder::at(19_000_000)
        .hash(B256::repeat_byte(0xab))
        .transactions(transactions)
        .into_data(Vec::new())
}

#[tokio::test]
async fn test_large_transfer_parameter_matches() {
    let trigger = TriggerBuilder::new("WatchTransactions")
        .contract(USDC)
        .abi(erc20_abi_json())
        .filter(json!({
            "FilterType": "CheckFunctionParameter",
            "FunctionName": "transfer",
            "ParameterName": "value",
            "ParameterType": "uint256",
            "Condition": { "Predicate": "BiggerThan", "Attribute": "500" }
        }))
        .filter(json!({
            "FilterType": "BasicFilter",
            "ParameterName": "From",
            "Condition": { "Predicate": "Eq", "Attribute": "4A574510C7014E4AE985403536074ABE582ADFC8" }
        }))
        .build();

    let big = U256::from_str_radix("3876846319093283908984", 10).unwrap();
    let matching = TransactionBuilder::new()
        .hash(B256::repeat_byte(1))
        .from(SENDER)
        .to(USDC)
        .input(transfer_input(big))
        .build();
    let too_small = TransactionBuilder::new()
        .hash(B256::repeat_byte(2))
        .from(SENDER)
        .to(USDC)
        .input(transfer_input(U256::from(499)))
        .build();
    let other_contract = TransactionBuilder::new()
        .hash(B256::repeat_byte(3))
        .from(SENDER)
        .to(Address::repeat_byte(0x42))
        .input(transfer_input(big))
        .build();

    let matches = TransactionMatcher::new(Arc::new(PriceTable::default()))
        .match_transactions(&trigger, &block(vec![matching, too_small, other_contract]))
        .await;

    assert_eq!(matches.len(), 1);
    let Match::Transaction(m) = &matches[0] else { panic!("expected a transaction match") };
    assert_eq!(m.transaction.hash, B256::repeat_byte(1));
    assert_eq!(m.block_number, 19_000_000);
    let function = m.function.as_ref().unwrap();
    assert_eq!(function.name, "transfer");
    assert_eq!(function.params["value"], json!("3876846319093283908984"));
}

#[tokio::test]
async fn test_native_value_in_usd() {
    let trigger = TriggerBuilder::new("WatchTransactions")
        .filter(json!({
            "FilterType": "BasicFilter",
            "ParameterName": "Value",
            "Condition": { "Predicate": "BiggerThan", "Attribute": "1000", "AttributeCurrency": "USD" }
        }))
        .build();

    let prices = PriceTable::default();
    prices.set_price(Asset::Native, "usd", Decimal::from(2000));

    let one_eth = U256::from(10u64).pow(U256::from(18));
    let half_eth = one_eth / U256::from(2);
    let block = block(vec![
        TransactionBuilder::new().hash(B256::repeat_byte(1)).value(one_eth).build(),
        TransactionBuilder::new().hash(B256::repeat_byte(2)).value(half_eth).build(),
    ]);

    let matches = TransactionMatcher::new(Arc::new(prices)).match_transactions(&trigger, &block).await;

    assert_eq!(matches.len(), 1);
    let Match::Transaction(m) = &matches[0] else { panic!("expected a transaction match") };
    assert_eq!(m.transaction.hash, B256::repeat_byte(1));
}

#[tokio::test]
async fn test_value_without_a_price_never_matches() {
    let trigger = TriggerBuilder::new("WatchTransactions")
        .filter(json!({
            "FilterType": "BasicFilter",
            "ParameterName": "Value",
            "Condition": { "Predicate": "SmallerThan", "Attribute": "1000000", "AttributeCurrency": "EUR" }
        }))
        .build();

    let block = block(vec![TransactionBuilder::new().value(U256::from(1)).build()]);
    let matches = TransactionMatcher::new(Arc::new(PriceTable::default()))
        .match_transactions(&trigger, &block)
        .await;
    assert!(matches.is_empty());
}
