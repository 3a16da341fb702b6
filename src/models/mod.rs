//! Data models shared by the loader and the matchers.

pub mod block;
pub mod log;
pub mod matches;
pub mod transaction;
pub mod trigger;

pub use block::BlockData;
pub use log::{Log, LogPosition};
pub use matches::{CnMatch, EventMatch, FunctionCall, Match, TriggerRef, TxMatch, TxSummary};
pub use transaction::Transaction;
pub use trigger::{
    ALL_ERC20_TOKENS, Component, Condition, ContractTarget, CronJob, Criterion, CurrencyRef, Filter,
    Input, Output, Predicate, RuleConfigurationError, Trigger, TriggerType,
};
