//! Blocks for matcher tests, either as the RPC `Block` a node would serve or
//! directly as the `BlockData` snapshot the matchers read.

use alloy::{
    primitives::B256,
    rpc::types::{Block, BlockTransactions, Header},
};

use crate::models::{BlockData, Log, Transaction};

/// Builds a block at a given height.
#[derive(Debug, Clone, Default)]
pub struct BlockBuilder {
    header: Header,
    transactions: Vec<Transaction>,
    hashes_only: bool,
}

impl BlockBuilder {
    /// A block at height `number` with a zero hash and no transactions.
    pub fn at(number: u64) -> Self {
        let mut builder = Self::default();
        builder.header.number = number;
        builder
    }

    /// Sets the block hash.
    pub fn hash(mut self, hash: B256) -> Self {
        self.header.hash = hash;
        self
    }

    /// Seconds since the epoch.
    pub fn timestamp(mut self, timestamp: u64) -> Self {
        self.header.timestamp = timestamp;
        self
    }

    /// Appends a transaction.
    pub fn transaction(mut self, tx: Transaction) -> Self {
        self.transactions.push(tx);
        self
    }

    /// Appends transactions in order.
    pub fn transactions(mut self, txs: impl IntoIterator<Item = Transaction>) -> Self {
        self.transactions.extend(txs);
        self
    }

    /// Serves transaction hashes instead of bodies, as a node does when
    /// `eth_getBlockByNumber` is called with `full = false`.
    pub fn hashes_only(mut self) -> Self {
        self.hashes_only = true;
        self
    }

    /// The RPC block as a node would serve it.
    pub fn build(self) -> Block {
        let transactions = if self.hashes_only {
            BlockTransactions::Hashes(self.transactions.iter().map(Transaction::hash).collect())
        } else {
            BlockTransactions::Full(self.transactions.into_iter().map(|tx| tx.0).collect())
        };
        Block {
            header: self.header,
            transactions,
            uncles: Default::default(),
            withdrawals: Default::default(),
        }
    }

    /// The snapshot the matchers evaluate, with `logs` attached.
    pub fn into_data(self, logs: Vec<Log>) -> BlockData {
        BlockData::from_parts(self.build(), logs)
    }
}
