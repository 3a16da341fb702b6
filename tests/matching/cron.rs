use std::sync::Arc;

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, U256, address},
};
use chainwatch::{
    engine::CronScheduler,
    models::{Match, Trigger},
    test_helpers::{TriggerBuilder, erc20_abi_json},
};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

use crate::helpers::{FakeChain, contract_matcher};

const TOKEN: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2000, 1, 1, hour, minute, 0).unwrap()
}

fn supply_check() -> Trigger {
    TriggerBuilder::new("CronTrigger")
        .contract(TOKEN)
        .abi(erc20_abi_json())
        .function_name("totalSupply")
        .output(json!({
            "ReturnIndex": 0,
            "ReturnType": "uint256",
            "Condition": { "Predicate": "BiggerThan", "Attribute": "500" }
        }))
        .cron("*/5 * * * *", "+0000")
        .last_fired("2000-01-01T10:00:00Z")
        .build()
}

#[tokio::test]
async fn test_every_five_minutes_fires_once_and_catches_up() {
    let chain = Arc::new(
        FakeChain::new(777).respond(TOKEN, vec![DynSolValue::Uint(U256::from(1_000), 256)]),
    );
    let scheduler = CronScheduler::new(Arc::new(contract_matcher(chain.clone())));
    let mut trigger = supply_check();

    assert!(scheduler.tick(&trigger, at(10, 0)).await.unwrap().is_none());
    assert!(scheduler.tick(&trigger, at(10, 4)).await.unwrap().is_none());
    assert!(chain.calls().is_empty());

    // Several slots were missed; one firing covers all of them.
    let firing = scheduler.tick(&trigger, at(10, 17)).await.unwrap().unwrap();
    assert_eq!(firing.block_number, 777);
    assert!(matches!(firing.matched, Some(Match::Contract(_))));
    firing.record(&mut trigger);
    assert_eq!(trigger.last_fired, Some(at(10, 17)));
    assert_eq!(chain.calls(), vec![(TOKEN, 777)]);

    assert!(scheduler.tick(&trigger, at(10, 19)).await.unwrap().is_none());
    assert!(scheduler.tick(&trigger, at(10, 20)).await.unwrap().is_some());
}

#[test]
fn test_due_at_boundary_and_after() {
    let trigger = supply_check();
    assert!(!CronScheduler::is_due(&trigger, at(10, 0)).unwrap());
    assert!(CronScheduler::is_due(&trigger, at(10, 5)).unwrap());
    assert!(CronScheduler::is_due(&trigger, at(23, 59)).unwrap());
}
