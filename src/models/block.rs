//! This module defines the `BlockData` structure, the immutable snapshot of a
//! single block handed to the transaction and event matchers.

use std::collections::HashMap;

use alloy::{
    primitives::{B256, TxHash},
    rpc::types::{Block, BlockTransactions},
};

use crate::models::{Log, Transaction};

/// A block together with its full transactions and all logs it emitted.
#[derive(Debug, Clone, Default)]
pub struct BlockData {
    /// The block number.
    pub number: u64,
    /// The block hash.
    pub hash: B256,
    /// The block timestamp, in seconds since the epoch.
    pub timestamp: u64,
    /// The block's transactions, in block order.
    pub transactions: Vec<Transaction>,
    /// The logs emitted in the block, in block order.
    pub logs: Vec<Log>,
}

impl BlockData {
    /// Creates a `BlockData` from an RPC block and the logs fetched for it.
    ///
    /// Blocks fetched without full transaction bodies yield an empty
    /// transaction list.
    pub fn from_parts(block: Block, logs: Vec<Log>) -> Self {
        let transactions = match block.transactions {
            BlockTransactions::Full(txs) => txs.into_iter().map(Transaction).collect(),
            BlockTransactions::Hashes(_) | BlockTransactions::Uncle => {
                tracing::warn!(
                    block_number = block.header.number,
                    "Block fetched without full transactions; transaction triggers will see none."
                );
                Vec::new()
            }
        };

        Self {
            number: block.header.number,
            hash: block.header.hash,
            timestamp: block.header.timestamp,
            transactions,
            logs,
        }
    }

    /// Indexes the block's transactions by hash, for resolving a log's parent
    /// transaction.
    pub fn transactions_by_hash(&self) -> HashMap<TxHash, &Transaction> {
        self.transactions.iter().map(|tx| (tx.hash(), tx)).collect()
    }
}
