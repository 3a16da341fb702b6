//! The matchers. Each one evaluates triggers of one kind against a snapshot
//! of chain data and produces [`Match`](crate::models::Match) values.

pub mod contracts;
pub mod cron;
pub mod events;
pub mod transactions;

use std::panic::{AssertUnwindSafe, catch_unwind};

pub use contracts::{ContractCallOutcome, ContractMatchError, ContractMatcher, MultiOutcome};
pub use cron::{CronError, CronFiring, CronSchedule, CronScheduler};
pub use events::EventMatcher;
pub use transactions::TransactionMatcher;

use crate::{
    filtering::{Asset, CurrencyConversion, resolve_conversion},
    providers::PriceSource,
};

/// The currency normalization resolved for one condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Conversion {
    /// The condition compares raw values.
    Raw,
    /// The condition compares normalized values.
    Resolved(CurrencyConversion),
    /// The normalization could not be resolved; the condition cannot match.
    Unavailable,
}

impl Conversion {
    /// Resolves the conversion for `asset`, or [`Conversion::Raw`] when the
    /// condition names no asset.
    pub(crate) async fn resolve(
        prices: &dyn PriceSource,
        asset: Option<Asset>,
        quote: Option<&str>,
        trigger: &str,
    ) -> Self {
        let Some(asset) = asset else {
            return Self::Raw;
        };
        match resolve_conversion(prices, asset, quote).await {
            Ok(conversion) => Self::Resolved(conversion),
            Err(e) => {
                tracing::debug!(trigger = %trigger, %asset, error = %e, "Currency conversion unavailable.");
                Self::Unavailable
            }
        }
    }

    /// The conversion to hand to the validator, or `None` when the condition
    /// cannot match at all.
    pub(crate) fn usable(&self) -> Option<Option<&CurrencyConversion>> {
        match self {
            Self::Raw => Some(None),
            Self::Resolved(conversion) => Some(Some(conversion)),
            Self::Unavailable => None,
        }
    }
}

/// Runs a single condition evaluation. A panic inside it is logged and
/// yields the default (no match), so one faulty rule cannot stop the rest of
/// a pass.
pub(crate) fn guarded<T: Default>(trigger: &str, condition: &str, evaluate: impl FnOnce() -> T) -> T {
    match catch_unwind(AssertUnwindSafe(evaluate)) {
        Ok(matched) => matched,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::warn!(
                trigger = %trigger,
                condition,
                panic = %message,
                "Condition evaluation panicked; treating it as no match."
            );
            T::default()
        }
    }
}
