//! A builder for creating `Trigger` instances for testing.

use alloy::primitives::Address;
use serde_json::{Map, Value, json};

use crate::models::Trigger;

/// A builder that assembles a trigger document and loads it.
#[derive(Debug, Clone)]
pub struct TriggerBuilder {
    doc: Map<String, Value>,
}

impl TriggerBuilder {
    /// Creates a builder for a trigger of the given type, bound to the zero
    /// address.
    pub fn new(trigger_type: &str) -> Self {
        let mut doc = Map::new();
        doc.insert("TriggerName".into(), json!("test trigger"));
        doc.insert("TriggerUUID".into(), json!("trigger-1"));
        doc.insert("UserUUID".into(), json!("user-1"));
        doc.insert("TriggerType".into(), json!(trigger_type));
        doc.insert("ContractAdd".into(), json!(Address::ZERO));
        Self { doc }
    }

    fn set(mut self, key: &str, value: Value) -> Self {
        self.doc.insert(key.into(), value);
        self
    }

    fn push(mut self, key: &str, value: Value) -> Self {
        let entry = self.doc.entry(key).or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = entry {
            items.push(value);
        }
        self
    }

    /// Sets the trigger name.
    pub fn name(self, name: &str) -> Self {
        self.set("TriggerName", json!(name))
    }

    /// Sets the trigger identifier.
    pub fn uuid(self, uuid: &str) -> Self {
        self.set("TriggerUUID", json!(uuid))
    }

    /// Binds the trigger to a contract.
    pub fn contract(self, address: Address) -> Self {
        self.set("ContractAdd", json!(address))
    }

    /// Sets the raw `ContractAdd` value, e.g. `all_erc20_tokens`.
    pub fn contract_add(self, raw: &str) -> Self {
        self.set("ContractAdd", json!(raw))
    }

    /// Sets the contract ABI JSON.
    pub fn abi(self, abi: &str) -> Self {
        self.set("ContractABI", json!(abi))
    }

    /// Sets the function called by contract-call and cron triggers.
    pub fn function_name(self, name: &str) -> Self {
        self.set("FunctionName", json!(name))
    }

    /// Adds a filter document.
    pub fn filter(self, filter: Value) -> Self {
        self.push("Filters", filter)
    }

    /// Adds a call input.
    pub fn input(self, parameter_type: &str, parameter_value: &str) -> Self {
        self.push(
            "Inputs",
            json!({ "ParameterType": parameter_type, "ParameterValue": parameter_value }),
        )
    }

    /// Adds an output document.
    pub fn output(self, output: Value) -> Self {
        self.push("Outputs", output)
    }

    /// Sets the cron schedule.
    pub fn cron(self, rule: &str, timezone: &str) -> Self {
        self.set("CronJob", json!({ "Rule": rule, "Timezone": timezone }))
    }

    /// Sets the RFC 3339 last-fired timestamp.
    pub fn last_fired(self, timestamp: &str) -> Self {
        self.set("LastFired", json!(timestamp))
    }

    /// Returns the assembled document.
    pub fn document(&self) -> Value {
        Value::Object(self.doc.clone())
    }

    /// Loads the assembled document, panicking if it is invalid.
    pub fn build(self) -> Trigger {
        Trigger::from_value(Value::Object(self.doc)).expect("Failed to build test trigger")
    }
}
