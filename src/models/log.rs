//! Event logs as the event matcher consumes them.

use alloy::{
    primitives::{Address, B256, TxHash},
    rpc::types::Log as AlloyLog,
};
use serde::{Deserialize, Serialize};

/// An event log emitted in a block, as returned by `eth_getLogs`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Log(pub AlloyLog);

/// Where a log sits in the chain. Fields a node leaves out for pending logs
/// read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogPosition {
    /// Number of the block that emitted the log.
    pub block_number: u64,
    /// Hash of the block that emitted the log.
    pub block_hash: B256,
    /// Hash of the transaction that emitted the log.
    pub transaction_hash: TxHash,
    /// Index of the log within its block.
    pub log_index: u64,
}

impl Log {
    /// The contract that emitted the log.
    pub fn emitter(&self) -> Address {
        self.0.address()
    }

    /// Topic 0, the event selector. `None` for anonymous events.
    pub fn signature(&self) -> Option<&B256> {
        self.0.topics().first()
    }

    /// All topics, selector included.
    pub fn topics(&self) -> &[B256] {
        self.0.topics()
    }

    /// The non-indexed, ABI-encoded event arguments.
    pub fn data(&self) -> &[u8] {
        &self.0.data().data
    }

    /// The parent transaction, if the node reported it.
    pub fn transaction_hash(&self) -> Option<TxHash> {
        self.0.transaction_hash
    }

    /// Locates the log within the chain.
    pub fn position(&self) -> LogPosition {
        LogPosition {
            block_number: self.0.block_number.unwrap_or_default(),
            block_hash: self.0.block_hash.unwrap_or_default(),
            transaction_hash: self.0.transaction_hash.unwrap_or_default(),
            log_index: self.0.log_index.unwrap_or_default(),
        }
    }
}

impl From<AlloyLog> for Log {
    fn from(log: AlloyLog) -> Self {
        Self(log)
    }
}
