//! A set of helpers for testing

mod abi;
mod block;
mod log;
mod transaction;
mod trigger;

pub use abi::{aave_lending_pool_abi_json, erc20_abi_json};
pub use block::BlockBuilder;
pub use log::LogBuilder;
pub use transaction::TransactionBuilder;
pub use trigger::TriggerBuilder;
