//! This module defines the `Match` sum type produced by the matchers and
//! handed to the persistence and action collaborators.

use std::collections::BTreeMap;

use alloy::primitives::{Address, B256, Bytes, TxHash, U256, keccak256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{Transaction, Trigger};

/// Identity of the trigger that produced a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRef {
    /// Identifier of the trigger.
    pub trigger_uuid: String,
    /// Owner of the trigger.
    pub user_uuid: String,
    /// Name of the trigger.
    pub trigger_name: String,
}

impl From<&Trigger> for TriggerRef {
    fn from(trigger: &Trigger) -> Self {
        Self {
            trigger_uuid: trigger.trigger_uuid.clone(),
            user_uuid: trigger.user_uuid.clone(),
            trigger_name: trigger.trigger_name.clone(),
        }
    }
}

/// The transaction fields carried on a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSummary {
    /// Transaction hash.
    pub hash: TxHash,
    /// Sender.
    pub from: Address,
    /// Recipient, `None` for contract creations.
    pub to: Option<Address>,
    /// Sender nonce.
    pub nonce: u64,
    /// Gas limit.
    pub gas: u64,
    /// Gas price in wei.
    pub gas_price: String,
    /// Native value transferred, in wei.
    pub value: U256,
    /// Call data.
    pub input: Bytes,
}

impl From<&Transaction> for TxSummary {
    fn from(tx: &Transaction) -> Self {
        Self {
            hash: tx.hash(),
            from: tx.from(),
            to: tx.to(),
            nonce: tx.nonce(),
            gas: tx.gas(),
            gas_price: tx.gas_price().to_string(),
            value: tx.value(),
            input: tx.input().clone(),
        }
    }
}

/// A decoded function call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Function name.
    pub name: String,
    /// Decoded arguments, by name.
    pub params: BTreeMap<String, Value>,
}

/// A transaction that matched a `WatchTransactions` trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxMatch {
    /// The trigger that matched.
    pub trigger: TriggerRef,
    /// Block containing the transaction.
    pub block_number: u64,
    /// Hash of that block.
    pub block_hash: B256,
    /// Timestamp of that block.
    pub block_timestamp: u64,
    /// The matching transaction.
    pub transaction: TxSummary,
    /// The decoded call, when the transaction called the trigger's contract.
    pub function: Option<FunctionCall>,
}

/// A contract call whose return values matched a `WatchContracts` or
/// `CronTrigger` trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CnMatch {
    /// The trigger that matched.
    pub trigger: TriggerRef,
    /// Block the call was executed against.
    pub block_number: u64,
    /// Contract that was called.
    pub contract_address: Address,
    /// Function that was called.
    pub function_name: String,
    /// The values that satisfied each output, in output order.
    pub matched_values: Vec<String>,
    /// Every decoded return value, in return order.
    pub all_values: Vec<Value>,
}

/// A log that matched a `WatchEvents` trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMatch {
    /// The trigger that matched.
    pub trigger: TriggerRef,
    /// Block containing the log.
    pub block_number: u64,
    /// Hash of that block.
    pub block_hash: B256,
    /// Transaction that emitted the log.
    pub transaction_hash: TxHash,
    /// Position of the log in the block.
    pub log_index: u64,
    /// Contract that emitted the log.
    pub contract_address: Address,
    /// Name of the decoded event.
    pub event_name: String,
    /// Decoded event fields, indexed and non-indexed, by name.
    pub params: BTreeMap<String, Value>,
    /// The parent transaction, when it was part of the block.
    pub transaction: Option<TxSummary>,
}

/// The result of a successful evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Match {
    /// A transaction match.
    Transaction(TxMatch),
    /// A contract-call match.
    Contract(CnMatch),
    /// An event-log match.
    Event(EventMatch),
}

impl Match {
    fn trigger(&self) -> &TriggerRef {
        match self {
            Match::Transaction(m) => &m.trigger,
            Match::Contract(m) => &m.trigger,
            Match::Event(m) => &m.trigger,
        }
    }

    /// Identifier of the trigger that produced this match.
    pub fn trigger_uuid(&self) -> &str {
        &self.trigger().trigger_uuid
    }

    /// Owner of the trigger that produced this match.
    pub fn user_uuid(&self) -> &str {
        &self.trigger().user_uuid
    }

    /// Block the match was found in.
    pub fn block_number(&self) -> u64 {
        match self {
            Match::Transaction(m) => m.block_number,
            Match::Contract(m) => m.block_number,
            Match::Event(m) => m.block_number,
        }
    }

    /// A deterministic identifier derived from the trigger and the match
    /// coordinates, so re-evaluating the same block yields the same id.
    pub fn match_id(&self) -> B256 {
        let mut preimage = Vec::with_capacity(128);
        preimage.extend_from_slice(self.trigger_uuid().as_bytes());
        preimage.extend_from_slice(&self.block_number().to_be_bytes());
        match self {
            Match::Transaction(m) => {
                preimage.extend_from_slice(m.transaction.hash.as_slice());
            }
            Match::Contract(m) => {
                preimage.extend_from_slice(m.contract_address.as_slice());
            }
            Match::Event(m) => {
                preimage.extend_from_slice(m.transaction_hash.as_slice());
                preimage.extend_from_slice(&m.log_index.to_be_bytes());
            }
        }
        keccak256(preimage)
    }

    /// The JSON form stored by the persistence collaborator.
    pub fn to_persistable(&self) -> Result<Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            map.insert("match_id".to_string(), Value::String(self.match_id().to_string()));
        }
        Ok(value)
    }

    /// A flat key/value view of the match for templating, with nested keys
    /// joined by `_` (e.g. `trigger_trigger_name`, `params_value`).
    pub fn template_data(&self) -> Result<BTreeMap<String, String>, serde_json::Error> {
        let mut data = BTreeMap::new();
        flatten_into(&mut data, "", &self.to_persistable()?);
        Ok(data)
    }
}

fn flatten_into(out: &mut BTreeMap<String, String>, prefix: &str, value: &Value) {
    let key = |suffix: &str| {
        if prefix.is_empty() { suffix.to_string() } else { format!("{prefix}_{suffix}") }
    };
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                flatten_into(out, &key(k), v);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                flatten_into(out, &key(&i.to_string()), v);
            }
        }
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        Value::Null => {
            out.insert(prefix.to_string(), String::new());
        }
        other => {
            out.insert(prefix.to_string(), other.to_string());
        }
    }
}
