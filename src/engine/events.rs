//! The event matcher: evaluates `WatchEvents` triggers against the logs of a
//! block.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, TxHash},
};

use super::{Conversion, guarded, transactions::named};
use crate::{
    abi::conversions::dyn_sol_value_to_json,
    filtering::{Asset, ParameterCheck, predicate::compare_text, validate},
    models::{
        BlockData, Condition, ContractTarget, CurrencyRef, EventMatch, Filter, Log, Match,
        Transaction, Trigger, TriggerRef, TriggerType, TxSummary,
    },
    providers::PriceSource,
};

/// Matches event logs against `WatchEvents` triggers.
pub struct EventMatcher {
    prices: Arc<dyn PriceSource>,
    erc20_tokens: HashSet<Address>,
}

impl EventMatcher {
    /// Creates a new `EventMatcher`. `erc20_tokens` is the set of contracts
    /// the `all_erc20_tokens` wildcard stands for.
    pub fn new(prices: Arc<dyn PriceSource>, erc20_tokens: impl IntoIterator<Item = Address>) -> Self {
        Self { prices, erc20_tokens: erc20_tokens.into_iter().collect() }
    }

    /// Evaluates `trigger` against the logs of `block`.
    pub async fn match_block(&self, trigger: &Trigger, block: &BlockData) -> Vec<Match> {
        self.match_events(trigger, &block.logs, &block.transactions_by_hash()).await
    }

    /// Evaluates `trigger` against `logs`. `transactions` resolves a log's
    /// parent transaction for `From`/`To` filters.
    pub async fn match_events(
        &self,
        trigger: &Trigger,
        logs: &[Log],
        transactions: &HashMap<TxHash, &Transaction>,
    ) -> Vec<Match> {
        if trigger.trigger_type != TriggerType::WatchEvents {
            tracing::warn!(
                trigger = %trigger.trigger_uuid,
                trigger_type = %trigger.trigger_type,
                "Not an event trigger; skipping."
            );
            return Vec::new();
        }

        let contract = match trigger.contract_abi.contract() {
            Ok(contract) => contract,
            Err(e) => {
                tracing::debug!(trigger = %trigger.trigger_uuid, error = %e, "Trigger ABI unusable.");
                return Vec::new();
            }
        };
        let Some(event_name) = trigger.event_name() else {
            tracing::debug!(trigger = %trigger.trigger_uuid, "Trigger names no event.");
            return Vec::new();
        };
        let event = match contract.event(event_name) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(trigger = %trigger.trigger_uuid, error = %e, "Event not in ABI.");
                return Vec::new();
            }
        };
        let signature = event.selector();
        let needs_fields =
            trigger.filters.iter().any(|f| matches!(f.condition, Condition::EventParam(_)));

        let mut cache = ConversionCache::default();
        let mut matches = Vec::new();
        for log in logs {
            if !self.is_relevant(trigger, log.emitter()) || log.signature() != Some(&signature) {
                continue;
            }

            let fields = match contract.decode_event(event, log) {
                Ok(decoded) => decoded.params,
                Err(e) if needs_fields => {
                    tracing::debug!(
                        trigger = %trigger.trigger_uuid,
                        tx_hash = ?log.transaction_hash(),
                        error = %e,
                        "Could not decode log."
                    );
                    continue;
                }
                Err(_) => Vec::new(),
            };
            let tx = log.transaction_hash().and_then(|hash| transactions.get(&hash).copied());

            let mut conversions = Vec::with_capacity(trigger.filters.len());
            for filter in &trigger.filters {
                conversions.push(cache.resolve(self.prices.as_ref(), trigger, filter, &fields).await);
            }

            let matched = trigger.filters.iter().zip(&conversions).all(|(filter, conversion)| {
                guarded(&trigger.trigger_uuid, filter.condition.kind(), || {
                    evaluate_filter(filter, conversion, &fields, tx)
                })
            });

            if matched {
                let position = log.position();
                tracing::debug!(
                    trigger = %trigger.trigger_uuid,
                    tx_hash = %position.transaction_hash,
                    log_index = position.log_index,
                    "Log matched trigger."
                );
                matches.push(Match::Event(EventMatch {
                    trigger: TriggerRef::from(trigger),
                    block_number: position.block_number,
                    block_hash: position.block_hash,
                    transaction_hash: position.transaction_hash,
                    log_index: position.log_index,
                    contract_address: log.emitter(),
                    event_name: event.name.clone(),
                    params: fields
                        .iter()
                        .map(|(name, value)| (name.clone(), dyn_sol_value_to_json(value)))
                        .collect::<BTreeMap<_, _>>(),
                    transaction: tx.map(TxSummary::from),
                }));
            }
        }
        matches
    }

    fn is_relevant(&self, trigger: &Trigger, emitter: Address) -> bool {
        match trigger.contract {
            ContractTarget::Address(address) => address == emitter,
            ContractTarget::AllErc20Tokens => self.erc20_tokens.contains(&emitter),
        }
    }
}

/// Conversions resolved during one pass, keyed by asset and quote currency.
#[derive(Default)]
struct ConversionCache {
    resolved: HashMap<(Asset, Option<String>), Conversion>,
}

impl ConversionCache {
    /// Resolves the conversion for an event filter. A currency given as a
    /// field name takes the token address from that field of the same log.
    async fn resolve(
        &mut self,
        prices: &dyn PriceSource,
        trigger: &Trigger,
        filter: &Filter,
        fields: &[(String, DynSolValue)],
    ) -> Conversion {
        let Condition::EventParam(criterion) = &filter.condition else {
            return Conversion::Raw;
        };
        let token = match &filter.parameter_currency {
            None => return Conversion::Raw,
            Some(CurrencyRef::Token(token)) => *token,
            Some(CurrencyRef::Field(field)) => match named(fields, Some(field)) {
                Some(DynSolValue::Address(token)) => *token,
                other => {
                    tracing::debug!(
                        trigger = %trigger.trigger_uuid,
                        field = %field,
                        value = ?other,
                        "Currency field does not hold an address."
                    );
                    return Conversion::Unavailable;
                }
            },
        };

        let quote = criterion.attribute_currency.clone();
        let key = (Asset::Token(token), quote);
        if let Some(conversion) = self.resolved.get(&key) {
            return *conversion;
        }
        let conversion =
            Conversion::resolve(prices, Some(key.0), key.1.as_deref(), &trigger.trigger_uuid).await;
        self.resolved.insert(key, conversion);
        conversion
    }
}

fn evaluate_filter(
    filter: &Filter,
    conversion: &Conversion,
    fields: &[(String, DynSolValue)],
    tx: Option<&Transaction>,
) -> bool {
    let Some(conversion) = conversion.usable() else {
        return false;
    };

    match &filter.condition {
        Condition::EventParam(c) => {
            let Some(value) = named(fields, filter.parameter_name.as_deref()) else {
                tracing::debug!(parameter = ?filter.parameter_name, "Event has no such field.");
                return false;
            };
            let check = ParameterCheck {
                index: filter.index,
                conversion,
                ..ParameterCheck::new(&filter.parameter_type, c)
            };
            validate(value, &check)
        }
        // The log's signature was checked before any filter ran.
        Condition::EventEmitted => true,
        Condition::From(c) => match tx {
            Some(tx) => compare_text(c.predicate, &tx.from().to_string(), &c.attribute),
            None => {
                tracing::debug!("Parent transaction unavailable for a From filter.");
                false
            }
        },
        Condition::To(c) => match tx.and_then(|tx| tx.to()) {
            Some(to) => compare_text(c.predicate, &to.to_string(), &c.attribute),
            None => {
                tracing::debug!("Parent transaction recipient unavailable for a To filter.");
                false
            }
        },
        other => {
            tracing::debug!(condition = other.kind(), "Condition never matches on an event trigger.");
            false
        }
    }
}
