use std::sync::Arc;

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, U256, address},
};
use chainwatch::{
    engine::ContractMatchError,
    models::{Match, Trigger},
    providers::DataSourceError,
    test_helpers::{TriggerBuilder, aave_lending_pool_abi_json, erc20_abi_json},
};
use serde_json::{Value, json};

use crate::helpers::{FakeChain, LISTS_ABI, contract_matcher};

const TOKEN: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
const POOL: Address = address!("7d2768de32b0b80b7a3454c06bdac94a69ddc7a9");
const LISTS: Address = address!("00000000000000000000000000000000000000aa");

fn output(return_type: &str, index: Option<usize>, predicate: &str, attribute: &str) -> Value {
    json!({
        "ReturnIndex": 0,
        "ReturnType": return_type,
        "Index": index,
        "Condition": { "Predicate": predicate, "Attribute": attribute }
    })
}

fn rewards_trigger(index: Option<usize>, predicate: &str, attribute: &str) -> Trigger {
    TriggerBuilder::new("WatchContracts")
        .contract(LISTS)
        .abi(LISTS_ABI)
        .function_name("rewards")
        .output(output("uint256[]", index, predicate, attribute))
        .build()
}

fn lists_chain() -> Arc<FakeChain> {
    let rewards = [4u64, 8, 12].map(|n| DynSolValue::Uint(U256::from(n), 256)).to_vec();
    Arc::new(FakeChain::new(1).respond(LISTS, vec![DynSolValue::Array(rewards)]))
}

#[tokio::test]
async fn test_uint256_above_u64_is_compared_exactly() {
    let supply = U256::from_str_radix("3876846319093283908984", 10).unwrap();
    let chain = Arc::new(FakeChain::new(1).respond(TOKEN, vec![DynSolValue::Uint(supply, 256)]));
    let trigger = TriggerBuilder::new("WatchContracts")
        .contract(TOKEN)
        .abi(erc20_abi_json())
        .function_name("totalSupply")
        .output(output("uint256", None, "BiggerThan", "500"))
        .build();

    let outcome = contract_matcher(chain).match_contract(&trigger, 17_000_000).await.unwrap();

    assert!(outcome.matched);
    assert_eq!(outcome.matched_values, vec!["3876846319093283908984".to_string()]);
    assert_eq!(outcome.all_values, vec![json!("3876846319093283908984")]);
}

#[tokio::test]
async fn test_array_length_and_indexed_element() {
    let matcher = contract_matcher(lists_chain());

    let by_length = matcher.match_contract(&rewards_trigger(None, "Eq", "3"), 1).await.unwrap();
    assert!(by_length.matched);

    let by_element = matcher.match_contract(&rewards_trigger(Some(2), "Eq", "12"), 1).await.unwrap();
    assert!(by_element.matched);
    assert_eq!(by_element.matched_values, vec!["12".to_string()]);

    let out_of_bounds = matcher.match_contract(&rewards_trigger(Some(9), "Eq", "12"), 1).await.unwrap();
    assert!(!out_of_bounds.matched);
    assert!(out_of_bounds.matched_values.is_empty());
}

#[tokio::test]
async fn test_outputs_are_anded_and_recorded_per_output() {
    let bounds = [100u64, 900].map(|n| DynSolValue::Uint(U256::from(n), 256)).to_vec();
    let chain = Arc::new(FakeChain::new(1).respond(LISTS, bounds));
    let trigger = |high_predicate: &str| {
        TriggerBuilder::new("WatchContracts")
            .contract(LISTS)
            .abi(LISTS_ABI)
            .function_name("bounds")
            .output(output("uint256", None, "BiggerThan", "50"))
            .output(json!({
                "ReturnIndex": 1,
                "ReturnType": "uint256",
                "Condition": { "Predicate": high_predicate, "Attribute": "500" }
            }))
            .build()
    };
    let matcher = contract_matcher(chain);

    let outcome = matcher.match_contract(&trigger("SmallerThan"), 1).await.unwrap();
    assert!(!outcome.matched);
    assert_eq!(outcome.matched_values, vec!["100".to_string()]);

    let outcome = matcher.match_contract(&trigger("BiggerThan"), 1).await.unwrap();
    assert!(outcome.matched);
    assert_eq!(outcome.matched_values, vec!["100".to_string(), "900".to_string()]);
    assert_eq!(outcome.all_values, vec![json!("100"), json!("900")]);
}

#[tokio::test]
async fn test_string_array_membership_ignores_case() {
    let symbols = ["a", "B", "c"].map(|s| DynSolValue::String(s.into())).to_vec();
    let chain = Arc::new(FakeChain::new(1).respond(LISTS, vec![DynSolValue::Array(symbols)]));
    let trigger = |attribute: &str| {
        TriggerBuilder::new("WatchContracts")
            .contract(LISTS)
            .abi(LISTS_ABI)
            .function_name("symbols")
            .output(output("string[]", None, "IsIn", attribute))
            .build()
    };
    let matcher = contract_matcher(chain);

    assert!(matcher.match_contract(&trigger("b"), 1).await.unwrap().matched);
    assert!(!matcher.match_contract(&trigger("d"), 1).await.unwrap().matched);
}

#[tokio::test]
async fn test_reserve_data_component_round_trip() {
    let mut reserve = vec![
        DynSolValue::Tuple(vec![DynSolValue::Uint(U256::from(1), 256)]),
        DynSolValue::Uint(U256::from(1), 128),
        DynSolValue::Uint(U256::from(1), 128),
        DynSolValue::Uint(U256::from(31_250_000_000_000_000_000_000_000u128), 128),
        DynSolValue::Uint(U256::ZERO, 128),
        DynSolValue::Uint(U256::ZERO, 128),
        DynSolValue::Uint(U256::from(1_700_000_000u64), 40),
    ];
    reserve.extend((1..=4).map(|i| DynSolValue::Address(Address::repeat_byte(i))));
    reserve.push(DynSolValue::Uint(U256::from(7), 8));
    let chain = Arc::new(FakeChain::new(1).respond(POOL, vec![DynSolValue::Tuple(reserve)]));

    let trigger = TriggerBuilder::new("WatchContracts")
        .uuid("aave-rate")
        .contract(POOL)
        .abi(aave_lending_pool_abi_json())
        .function_name("getReserveData")
        .input("address", &TOKEN.to_string())
        .output(json!({
            "ReturnIndex": 0,
            "ReturnType": "tuple",
            "Component": { "Name": "currentLiquidityRate", "Type": "uint128" },
            "Condition": { "Predicate": "BiggerThan", "Attribute": "1" }
        }))
        .build();

    let matcher = contract_matcher(chain.clone());
    let outcome = matcher.match_contract(&trigger, 18_500_000).await.unwrap();

    assert!(outcome.matched);
    assert_eq!(outcome.matched_values, vec!["31250000000000000000000000".to_string()]);
    assert_eq!(chain.calls(), vec![(POOL, 18_500_000)]);

    let Match::Contract(m) = matcher.into_match(&trigger, 18_500_000, outcome).unwrap() else {
        panic!("expected a contract match");
    };
    assert_eq!(m.trigger.trigger_uuid, "aave-rate");
    assert_eq!(m.function_name, "getReserveData");
    assert_eq!(m.contract_address, POOL);
}

#[tokio::test]
async fn test_transport_failure_is_not_a_non_match() {
    let chain = Arc::new(FakeChain::new(1));
    let trigger = TriggerBuilder::new("WatchContracts")
        .contract(TOKEN)
        .abi(erc20_abi_json())
        .function_name("totalSupply")
        .output(output("uint256", None, "BiggerThan", "0"))
        .build();

    let err = contract_matcher(chain).match_contract(&trigger, 1).await.unwrap_err();
    assert!(matches!(err, ContractMatchError::DataSource(DataSourceError::MalformedResponse(_))));
}
