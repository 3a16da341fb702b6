use chainwatch::{
    filtering::{ParamType, ScalarKind},
    models::{Condition, ContractTarget, Predicate, RuleConfigurationError, Trigger, TriggerType},
    test_helpers::erc20_abi_json,
};
use serde_json::json;

#[test]
fn test_full_transaction_trigger_document_loads() {
    let document = json!({
        "TriggerName": "Large USDC transfers",
        "TriggerUUID": "3f0c",
        "UserUUID": "u-9",
        "TriggerType": "WatchTransactions",
        "ContractAdd": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
        "ContractABI": erc20_abi_json(),
        "Filters": [
            {
                "FilterType": "CheckFunctionParameter",
                "FunctionName": "transfer",
                "ParameterName": "value",
                "ParameterType": "uint256",
                "Condition": { "Predicate": "BiggerThan", "Attribute": "1000000" }
            },
            {
                "FilterType": "BasicFilter",
                "ParameterName": "From",
                "Condition": { "Predicate": "Eq", "Attribute": "0x4a574510c7014e4ae985403536074abe582adfc8" }
            }
        ]
    })
    .to_string();

    let trigger = Trigger::from_json(&document).unwrap();

    assert_eq!(trigger.trigger_name, "Large USDC transfers");
    assert_eq!(trigger.trigger_uuid, "3f0c");
    assert_eq!(trigger.user_uuid, "u-9");
    assert_eq!(trigger.trigger_type, TriggerType::WatchTransactions);
    assert!(matches!(trigger.contract, ContractTarget::Address(_)));
    assert_eq!(trigger.filters.len(), 2);
    assert_eq!(trigger.filters[0].parameter_type, ParamType::Scalar(ScalarKind::Uint(256)));
    let Condition::FunctionParam(criterion) = &trigger.filters[0].condition else {
        panic!("expected a function parameter condition");
    };
    assert_eq!(criterion.predicate, Predicate::BiggerThan);
    assert!(matches!(trigger.filters[1].condition, Condition::From(_)));
    assert!(trigger.outputs.is_empty());
    assert!(trigger.cron_job.is_none());
}

#[test]
fn test_malformed_documents_are_rejected() {
    let missing_name = json!({
        "TriggerType": "WatchTransactions",
        "ContractAdd": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"
    });
    assert!(matches!(
        Trigger::from_json(&missing_name.to_string()),
        Err(RuleConfigurationError::MissingField("TriggerName"))
    ));

    let unsupported_type = json!({
        "TriggerName": "t",
        "TriggerType": "WatchMempool",
        "ContractAdd": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"
    });
    assert!(matches!(
        Trigger::from_json(&unsupported_type.to_string()),
        Err(RuleConfigurationError::UnsupportedTriggerType(ref t)) if t == "WatchMempool"
    ));

    let unsupported_predicate = json!({
        "TriggerName": "t",
        "TriggerType": "WatchTransactions",
        "ContractAdd": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
        "Filters": [{
            "FilterType": "BasicFilter",
            "ParameterName": "Nonce",
            "Condition": { "Predicate": "StartsWith", "Attribute": "1" }
        }]
    });
    assert!(matches!(
        Trigger::from_json(&unsupported_predicate.to_string()),
        Err(RuleConfigurationError::UnsupportedPredicate(ref p)) if p == "StartsWith"
    ));
}

#[test]
fn test_garbage_never_panics() {
    let documents = [
        "",
        "null",
        "[]",
        "42",
        "{",
        r#"{"TriggerName": 5}"#,
        r#"{"TriggerName": "t", "TriggerType": "WatchContracts", "ContractAdd": "0x01"}"#,
        r#"{"TriggerName": "t", "TriggerType": "WatchContracts",
            "ContractAdd": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"}"#,
        r#"{"TriggerName": "t", "TriggerType": "CronTrigger", "FunctionName": "f",
            "ContractAdd": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
            "CronJob": {"Rule": "every day", "Timezone": "+0000"}}"#,
        r#"{"TriggerName": "t", "TriggerType": "WatchEvents",
            "ContractAdd": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
            "Filters": [{"FilterType": "CheckEventParameter", "Condition": {}}]}"#,
    ];

    for document in documents {
        assert!(Trigger::from_json(document).is_err(), "accepted: {document}");
    }
}
