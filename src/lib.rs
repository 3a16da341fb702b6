#![warn(missing_docs)]
//! Chainwatch evaluates user-defined triggers against EVM chain data:
//! transactions, contract call results, event logs and cron schedules.

pub mod abi;
pub mod cmd;
pub mod config;
pub mod engine;
pub mod filtering;
pub mod models;
pub mod providers;
pub mod test_helpers;
