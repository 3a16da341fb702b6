//! The transaction matcher: evaluates `WatchTransactions` triggers against
//! every transaction of a block.

use std::{collections::BTreeMap, sync::Arc};

use alloy::dyn_abi::DynSolValue;

use super::{Conversion, guarded};
use crate::{
    abi::{CachedContract, DecodedCall, conversions::dyn_sol_value_to_json},
    filtering::{
        Asset, ParamType, ParameterCheck, ScalarKind,
        predicate::{compare_integer, compare_text},
        validate,
    },
    models::{
        BlockData, Condition, CurrencyRef, Filter, FunctionCall, Match, Transaction, Trigger,
        TriggerRef, TriggerType, TxMatch, TxSummary,
    },
    providers::PriceSource,
};

/// Matches transactions against `WatchTransactions` triggers.
pub struct TransactionMatcher {
    prices: Arc<dyn PriceSource>,
}

impl TransactionMatcher {
    /// Creates a new `TransactionMatcher`.
    pub fn new(prices: Arc<dyn PriceSource>) -> Self {
        Self { prices }
    }

    /// Evaluates `trigger` against every transaction in `block`. A
    /// transaction matches when all of the trigger's filters match.
    pub async fn match_transactions(&self, trigger: &Trigger, block: &BlockData) -> Vec<Match> {
        if trigger.trigger_type != TriggerType::WatchTransactions {
            tracing::warn!(
                trigger = %trigger.trigger_uuid,
                trigger_type = %trigger.trigger_type,
                "Not a transaction trigger; skipping."
            );
            return Vec::new();
        }

        let conversions = self.resolve_conversions(trigger).await;
        let contract = decoding_contract(trigger);

        let mut matches = Vec::new();
        for tx in &block.transactions {
            let call = contract.as_deref().and_then(|contract| decode_for(trigger, contract, tx));

            let matched = trigger.filters.iter().zip(&conversions).all(|(filter, conversion)| {
                guarded(&trigger.trigger_uuid, filter.condition.kind(), || {
                    evaluate_filter(filter, conversion, tx, call.as_ref())
                })
            });

            if matched {
                tracing::debug!(
                    trigger = %trigger.trigger_uuid,
                    tx_hash = %tx.hash(),
                    block_number = block.number,
                    "Transaction matched trigger."
                );
                matches.push(Match::Transaction(TxMatch {
                    trigger: TriggerRef::from(trigger),
                    block_number: block.number,
                    block_hash: block.hash,
                    block_timestamp: block.timestamp,
                    transaction: TxSummary::from(tx),
                    function: call.map(function_call),
                }));
            }
        }
        matches
    }

    async fn resolve_conversions(&self, trigger: &Trigger) -> Vec<Conversion> {
        let mut conversions = Vec::with_capacity(trigger.filters.len());
        for filter in &trigger.filters {
            let (asset, quote) = match &filter.condition {
                Condition::Value(c) => {
                    (c.attribute_currency.as_ref().map(|_| Asset::Native), c.attribute_currency.as_deref())
                }
                Condition::FunctionParam(c) => match &filter.parameter_currency {
                    Some(CurrencyRef::Token(token)) => {
                        (Some(Asset::Token(*token)), c.attribute_currency.as_deref())
                    }
                    _ => (None, None),
                },
                _ => (None, None),
            };
            conversions.push(
                Conversion::resolve(self.prices.as_ref(), asset, quote, &trigger.trigger_uuid).await,
            );
        }
        conversions
    }
}

/// The parsed ABI, when the trigger has filters that need decoded call data.
fn decoding_contract(trigger: &Trigger) -> Option<Arc<CachedContract>> {
    let needs_call = trigger
        .filters
        .iter()
        .any(|f| matches!(f.condition, Condition::FunctionParam(_) | Condition::FunctionCalled));
    if !needs_call {
        return None;
    }
    match trigger.contract_abi.contract() {
        Ok(contract) => Some(contract),
        Err(e) => {
            tracing::debug!(
                trigger = %trigger.trigger_uuid,
                error = %e,
                "Trigger ABI unusable; function filters cannot match."
            );
            None
        }
    }
}

/// Decodes the transaction's call data, if it was sent to the trigger's
/// contract.
fn decode_for(trigger: &Trigger, contract: &CachedContract, tx: &Transaction) -> Option<DecodedCall> {
    let to = tx.to()?;
    if Some(to) != trigger.contract_address() {
        return None;
    }
    match contract.decode_call(tx.input()) {
        Ok(call) => Some(call),
        Err(e) => {
            tracing::debug!(
                trigger = %trigger.trigger_uuid,
                tx_hash = %tx.hash(),
                error = %e,
                "Could not decode call data."
            );
            None
        }
    }
}

fn evaluate_filter(
    filter: &Filter,
    conversion: &Conversion,
    tx: &Transaction,
    call: Option<&DecodedCall>,
) -> bool {
    let Some(conversion) = conversion.usable() else {
        return false;
    };

    match &filter.condition {
        Condition::From(c) => compare_text(c.predicate, &tx.from().to_string(), &c.attribute),
        Condition::To(c) => {
            tx.to().is_some_and(|to| compare_text(c.predicate, &to.to_string(), &c.attribute))
        }
        Condition::Nonce(c) => compare_integer(c.predicate, &tx.nonce().into(), &c.attribute),
        Condition::Gas(c) => compare_integer(c.predicate, &tx.gas().into(), &c.attribute),
        Condition::GasPrice(c) => {
            compare_integer(c.predicate, &tx.gas_price().into(), &c.attribute)
        }
        Condition::Value(c) => {
            let ty = ParamType::Scalar(ScalarKind::Uint(256));
            let check = ParameterCheck { conversion, ..ParameterCheck::new(&ty, c) };
            validate(&DynSolValue::Uint(tx.value(), 256), &check)
        }
        Condition::FunctionParam(c) => {
            let Some(call) = call else {
                tracing::debug!(tx_hash = %tx.hash(), "No decoded call for a function parameter filter.");
                return false;
            };
            if filter.function_name.as_deref().is_some_and(|name| name != call.name) {
                return false;
            }
            let Some(value) = named(&call.params, filter.parameter_name.as_deref()) else {
                tracing::debug!(
                    function = %call.name,
                    parameter = ?filter.parameter_name,
                    "Function has no such parameter."
                );
                return false;
            };
            let check = ParameterCheck {
                index: filter.index,
                conversion,
                ..ParameterCheck::new(&filter.parameter_type, c)
            };
            validate(value, &check)
        }
        Condition::FunctionCalled => {
            call.is_some_and(|call| filter.function_name.as_deref() == Some(call.name.as_str()))
        }
        Condition::EventParam(_) | Condition::EventEmitted => {
            tracing::debug!("Event condition on a transaction trigger never matches.");
            false
        }
    }
}

/// Finds a decoded parameter by name.
pub(crate) fn named<'a>(
    params: &'a [(String, DynSolValue)],
    name: Option<&str>,
) -> Option<&'a DynSolValue> {
    let name = name?;
    params.iter().find(|(n, _)| n == name).map(|(_, v)| v)
}

fn function_call(call: DecodedCall) -> FunctionCall {
    let params = call
        .params
        .iter()
        .map(|(name, value)| (name.clone(), dyn_sol_value_to_json(value)))
        .collect::<BTreeMap<_, _>>();
    FunctionCall { name: call.name, params }
}
