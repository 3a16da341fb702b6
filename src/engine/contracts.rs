//! The contract-call matcher: calls a view function at a pinned block and
//! evaluates the trigger's outputs against what it returns.

use std::sync::Arc;

use alloy::{
    dyn_abi::{self, DynSolValue},
    json_abi::Function,
    primitives::{Address, Bytes},
};
use serde_json::Value;
use thiserror::Error;

use super::{Conversion, guarded};
use crate::{
    abi::{
        AbiError, decode_output, encode_call,
        conversions::{dyn_sol_value_to_json, dyn_sol_value_to_string},
    },
    config::MulticallConfig,
    filtering::{Asset, ComponentSlot, ParameterCheck, validate},
    models::{CnMatch, Match, Output, Trigger, TriggerRef},
    providers::{
        ChainClient, DataSourceError, MulticallRequest, PriceSource, aggregate_in_batches,
    },
};

/// Reasons a contract-call trigger could not be evaluated.
#[derive(Debug, Error)]
pub enum ContractMatchError {
    /// The trigger names no function to call.
    #[error("Trigger has no function name")]
    MissingFunctionName,

    /// The trigger is not bound to a single contract.
    #[error("Trigger is not bound to a single contract")]
    NoContract,

    /// An input literal does not fit its declared type.
    #[error("Input {position} is invalid: {source}")]
    InvalidInput {
        /// Position of the input.
        position: usize,
        /// The coercion error.
        #[source]
        source: dyn_abi::Error,
    },

    /// The ABI could not be parsed, or the call could not be encoded or its
    /// result decoded.
    #[error("ABI error: {0}")]
    Abi(#[from] AbiError),

    /// The call could not be executed.
    #[error("Chain access failed: {0}")]
    DataSource(#[from] DataSourceError),

    /// The call reverted inside a multicall batch.
    #[error("Call reverted")]
    Reverted,
}

/// The result of evaluating one contract-call trigger.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContractCallOutcome {
    /// `true` when every output matched.
    pub matched: bool,
    /// The compared value of each output that matched, in output order.
    pub matched_values: Vec<String>,
    /// Every decoded return value, in return order.
    pub all_values: Vec<Value>,
}

/// The result of evaluating many contract-call triggers in one batch.
#[derive(Debug, Default)]
pub struct MultiOutcome {
    /// Matches, one per matching trigger.
    pub matches: Vec<Match>,
    /// UUIDs of the triggers that could not be evaluated.
    pub failed: Vec<String>,
}

/// A call ready to be executed.
struct PreparedCall {
    target: Address,
    function: Function,
    call_data: Bytes,
}

/// Evaluates `WatchContracts` and `CronTrigger` triggers.
pub struct ContractMatcher {
    client: Arc<dyn ChainClient>,
    prices: Arc<dyn PriceSource>,
    multicall: MulticallConfig,
}

impl ContractMatcher {
    /// Creates a new `ContractMatcher`.
    pub fn new(
        client: Arc<dyn ChainClient>,
        prices: Arc<dyn PriceSource>,
        multicall: MulticallConfig,
    ) -> Self {
        Self { client, prices, multicall }
    }

    /// Returns the chain's current head block number.
    pub async fn head_block(&self) -> Result<u64, ContractMatchError> {
        Ok(self.client.block_number().await?)
    }

    /// Calls the trigger's function at `block_number` and evaluates its
    /// outputs.
    #[tracing::instrument(skip(self, trigger), fields(trigger = %trigger.trigger_uuid), level = "debug")]
    pub async fn match_contract(
        &self,
        trigger: &Trigger,
        block_number: u64,
    ) -> Result<ContractCallOutcome, ContractMatchError> {
        let call = prepare(trigger)?;
        let data = self.client.call(call.target, call.call_data, block_number).await?;
        self.evaluate(trigger, &call.function, &data).await
    }

    /// Evaluates many triggers at `block_number`, batching their calls
    /// through Multicall3.
    ///
    /// Triggers whose call cannot be encoded, executed or decoded are
    /// reported in [`MultiOutcome::failed`] rather than as non-matches.
    #[tracing::instrument(skip(self, triggers), fields(triggers = triggers.len()), level = "debug")]
    pub async fn match_contracts_multi(&self, triggers: &[Trigger], block_number: u64) -> MultiOutcome {
        let mut outcome = MultiOutcome::default();

        let mut prepared = Vec::with_capacity(triggers.len());
        for trigger in triggers {
            match prepare(trigger) {
                Ok(call) => prepared.push((trigger, call)),
                Err(e) => {
                    tracing::warn!(trigger = %trigger.trigger_uuid, error = %e, "Cannot prepare contract call.");
                    outcome.failed.push(trigger.trigger_uuid.clone());
                }
            }
        }

        let requests = prepared
            .iter()
            .map(|(_, call)| MulticallRequest { target: call.target, call_data: call.call_data.clone() })
            .collect::<Vec<_>>();
        let results = aggregate_in_batches(
            self.client.as_ref(),
            self.multicall.address,
            &requests,
            self.multicall.batch_size,
            block_number,
        )
        .await;

        for ((trigger, call), result) in prepared.into_iter().zip(results) {
            let evaluated = match result {
                Some(data) => self.evaluate(trigger, &call.function, &data).await,
                None => Err(ContractMatchError::Reverted),
            };
            match evaluated {
                Ok(result) if result.matched => {
                    outcome.matches.push(to_match(trigger, block_number, &call, result));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(trigger = %trigger.trigger_uuid, error = %e, "Contract call failed.");
                    outcome.failed.push(trigger.trigger_uuid.clone());
                }
            }
        }

        outcome
    }

    /// Builds the match for a trigger whose outputs all matched.
    pub fn into_match(
        &self,
        trigger: &Trigger,
        block_number: u64,
        outcome: ContractCallOutcome,
    ) -> Result<Match, ContractMatchError> {
        let call = prepare(trigger)?;
        Ok(to_match(trigger, block_number, &call, outcome))
    }

    async fn evaluate(
        &self,
        trigger: &Trigger,
        function: &Function,
        data: &[u8],
    ) -> Result<ContractCallOutcome, ContractMatchError> {
        let values = decode_output(function, data)?;

        let mut conversions = Vec::with_capacity(trigger.outputs.len());
        for output in &trigger.outputs {
            conversions.push(
                Conversion::resolve(
                    self.prices.as_ref(),
                    output.return_currency.map(Asset::Token),
                    output.criterion.attribute_currency.as_deref(),
                    &trigger.trigger_uuid,
                )
                .await,
            );
        }

        let mut matched = true;
        let mut matched_values = Vec::new();
        for (output, conversion) in trigger.outputs.iter().zip(&conversions) {
            let hit = guarded(&trigger.trigger_uuid, "Output", || {
                evaluate_output(function, output, conversion, &values)
            });
            match hit {
                Some(value) => matched_values.push(value),
                None => matched = false,
            }
        }

        Ok(ContractCallOutcome {
            matched,
            matched_values,
            all_values: values.iter().map(dyn_sol_value_to_json).collect(),
        })
    }
}

/// Resolves the function and encodes the call from the trigger's inputs.
fn prepare(trigger: &Trigger) -> Result<PreparedCall, ContractMatchError> {
    let target = trigger.contract_address().ok_or(ContractMatchError::NoContract)?;
    let name = trigger.function_name.as_deref().ok_or(ContractMatchError::MissingFunctionName)?;
    let contract = trigger.contract_abi.contract()?;
    let function = contract.function(name)?.clone();

    let args = trigger
        .inputs
        .iter()
        .enumerate()
        .map(|(position, input)| {
            input.to_value().map_err(|source| ContractMatchError::InvalidInput { position, source })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let call_data = encode_call(&function, &args)?;

    Ok(PreparedCall { target, function, call_data })
}

/// Evaluates one output, returning the compared value when it matched.
fn evaluate_output(
    function: &Function,
    output: &Output,
    conversion: &Conversion,
    values: &[DynSolValue],
) -> Option<String> {
    let conversion = conversion.usable()?;
    let Some(value) = values.get(output.return_index) else {
        tracing::debug!(return_index = output.return_index, returned = values.len(), "Return index out of bounds.");
        return None;
    };

    let component = match &output.component {
        Some(component) => {
            let position = function
                .outputs
                .get(output.return_index)
                .and_then(|param| param.components.iter().position(|c| c.name == component.name));
            let Some(position) = position else {
                tracing::debug!(component = %component.name, "Return value has no such component.");
                return None;
            };
            Some(ComponentSlot { position, ty: &component.ty })
        }
        None => None,
    };

    let check = ParameterCheck {
        param_type: &output.return_type,
        criterion: &output.criterion,
        index: output.index,
        component,
        conversion,
    };
    validate(value, &check).then(|| dyn_sol_value_to_string(compared_value(value, &check)))
}

/// The part of `value` the check actually compared.
fn compared_value<'a>(value: &'a DynSolValue, check: &ParameterCheck<'_>) -> &'a DynSolValue {
    let value = match (check.component, value) {
        (Some(slot), DynSolValue::Tuple(fields)) => fields.get(slot.position).unwrap_or(value),
        _ => value,
    };
    match (check.component, check.index, value) {
        (
            None,
            Some(i),
            DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items),
        ) => items.get(i).unwrap_or(value),
        _ => value,
    }
}

fn to_match(
    trigger: &Trigger,
    block_number: u64,
    call: &PreparedCall,
    outcome: ContractCallOutcome,
) -> Match {
    Match::Contract(CnMatch {
        trigger: TriggerRef::from(trigger),
        block_number,
        contract_address: call.target,
        function_name: call.function.name.clone(),
        matched_values: outcome.matched_values,
        all_values: outcome.all_values,
    })
}
