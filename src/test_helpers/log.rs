//! Event logs for matcher tests, built from an event signature rather than
//! raw topics.

use alloy::{
    primitives::{Address, B256, Bytes, LogData, TxHash, U256, keccak256},
    rpc::types::Log as AlloyLog,
};

use crate::models::Log;

/// Builds a `Log` one indexed topic and one data word at a time.
#[derive(Debug, Clone, Default)]
pub struct LogBuilder {
    emitter: Address,
    topics: Vec<B256>,
    data: Vec<u8>,
    transaction: Option<(TxHash, u64)>,
    block: Option<(u64, B256)>,
}

impl LogBuilder {
    /// A log from `emitter` for the event with canonical signature
    /// `signature`, e.g. `Transfer(address,address,uint256)`.
    pub fn event(emitter: Address, signature: &str) -> Self {
        Self::selector(emitter, keccak256(signature.as_bytes()))
    }

    /// A log from `emitter` whose topic 0 is `selector` as given.
    pub fn selector(emitter: Address, selector: B256) -> Self {
        Self { emitter, topics: vec![selector], ..Self::default() }
    }

    /// An ERC20 `Transfer` of `value` from `from` to `to`.
    pub fn erc20_transfer(token: Address, from: Address, to: Address, value: U256) -> Self {
        Self::event(token, "Transfer(address,address,uint256)")
            .indexed_address(from)
            .indexed_address(to)
            .word(value)
    }

    /// Appends an indexed topic.
    pub fn indexed(mut self, topic: B256) -> Self {
        self.topics.push(topic);
        self
    }

    /// Appends an address as an indexed topic.
    pub fn indexed_address(self, address: Address) -> Self {
        self.indexed(address.into_word())
    }

    /// Appends one 32-byte word to the data section.
    pub fn word(mut self, value: U256) -> Self {
        self.data.extend_from_slice(&value.to_be_bytes::<32>());
        self
    }

    /// Appends bytes to the data section as given, aligned or not.
    pub fn raw_data(mut self, data: &[u8]) -> Self {
        self.data.extend_from_slice(data);
        self
    }

    /// Places the log in transaction `hash` at block index `log_index`.
    pub fn in_transaction(mut self, hash: TxHash, log_index: u64) -> Self {
        self.transaction = Some((hash, log_index));
        self
    }

    /// Places the log in a mined block.
    pub fn in_block(mut self, number: u64, hash: B256) -> Self {
        self.block = Some((number, hash));
        self
    }

    /// Builds the `Log`. Unset positions stay pending.
    pub fn build(self) -> Log {
        AlloyLog {
            inner: alloy::primitives::Log {
                address: self.emitter,
                data: LogData::new_unchecked(self.topics, Bytes::from(self.data)),
            },
            transaction_hash: self.transaction.map(|(hash, _)| hash),
            log_index: self.transaction.map(|(_, index)| index),
            block_number: self.block.map(|(number, _)| number),
            block_hash: self.block.map(|(_, hash)| hash),
            ..AlloyLog::default()
        }
        .into()
    }
}
