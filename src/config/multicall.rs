use alloy::primitives::{Address, address};
use serde::Deserialize;

/// The canonical Multicall3 deployment, identical on most EVM chains.
pub const MULTICALL3_ADDRESS: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

fn default_batch_size() -> usize {
    100
}

fn default_address() -> Address {
    MULTICALL3_ADDRESS
}

/// Settings for batching contract calls through Multicall3 `aggregate3`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct MulticallConfig {
    /// Address of the Multicall3 contract on the target chain.
    #[serde(default = "default_address")]
    pub address: Address,
    /// Maximum number of calls packed into a single `aggregate3` request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for MulticallConfig {
    fn default() -> Self {
        Self { address: default_address(), batch_size: default_batch_size() }
    }
}
