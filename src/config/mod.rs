//! Configuration module for Chainwatch.

mod app_config;
mod helpers;
mod multicall;
mod prices;
mod rpc;

pub use app_config::AppConfig;
pub use helpers::{deserialize_duration_from_ms, deserialize_urls, serialize_duration_to_ms};
pub use multicall::{MULTICALL3_ADDRESS, MulticallConfig};
pub use prices::TokenPriceConfig;
pub use rpc::RpcConfig;
