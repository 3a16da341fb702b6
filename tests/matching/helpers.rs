use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, Bytes},
    rpc::types::Block,
};
use async_trait::async_trait;
use chainwatch::{
    config::MulticallConfig,
    engine::ContractMatcher,
    models::Log,
    providers::{ChainClient, DataSourceError, PriceTable},
};

/// A view-only contract returning arrays, and a pair of bounds.
pub const LISTS_ABI: &str = r#"[
    {"type":"function","name":"rewards","stateMutability":"view","inputs":[],
     "outputs":[{"name":"","type":"uint256[]"}]},
    {"type":"function","name":"symbols","stateMutability":"view","inputs":[],
     "outputs":[{"name":"","type":"string[]"}]},
    {"type":"function","name":"bounds","stateMutability":"view","inputs":[],
     "outputs":[{"name":"low","type":"uint256"},{"name":"high","type":"uint256"}]}
]"#;

/// A chain with a fixed head and canned `eth_call` answers per contract.
#[derive(Default)]
pub struct FakeChain {
    head: u64,
    responses: HashMap<Address, Bytes>,
    calls: Mutex<Vec<(Address, u64)>>,
}

impl FakeChain {
    pub fn new(head: u64) -> Self {
        Self { head, ..Default::default() }
    }

    /// Answers calls to `to` with `values` encoded as a return tuple.
    pub fn respond(mut self, to: Address, values: Vec<DynSolValue>) -> Self {
        self.responses.insert(to, DynSolValue::Tuple(values).abi_encode_params().into());
        self
    }

    /// Every `(contract, block)` pair called so far.
    pub fn calls(&self) -> Vec<(Address, u64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn call(&self, to: Address, _input: Bytes, block_number: u64) -> Result<Bytes, DataSourceError> {
        self.calls.lock().unwrap().push((to, block_number));
        self.responses
            .get(&to)
            .cloned()
            .ok_or_else(|| DataSourceError::MalformedResponse(format!("no code at {to}")))
    }

    async fn block_number(&self) -> Result<u64, DataSourceError> {
        Ok(self.head)
    }

    async fn block_by_number(&self, block_number: u64) -> Result<Block, DataSourceError> {
        Err(DataSourceError::BlockNotFound(block_number))
    }

    async fn logs(&self, _block_number: u64) -> Result<Vec<Log>, DataSourceError> {
        Ok(Vec::new())
    }
}

pub fn contract_matcher(chain: Arc<FakeChain>) -> ContractMatcher {
    ContractMatcher::new(chain, Arc::new(PriceTable::default()), MulticallConfig::default())
}
