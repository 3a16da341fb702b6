//! A builder for creating `Transaction` instances for testing.

use alloy::{
    primitives::{Address, B256, Bytes, U256, b256},
    rpc::types::Transaction as AlloyTransaction,
};
use serde_json::json;

use crate::models::Transaction;

const DEFAULT_HASH: B256 =
    b256!("e9e91f1ee4b56c0df2e9f06c2b8c27c6076195a88a7b8537ba8313d80e6f124e");

/// A builder for creating EIP-1559 `Transaction` instances for testing.
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
    hash: Option<B256>,
    to: Option<Address>,
    input: Bytes,
    from: Option<Address>,
    value: Option<U256>,
    nonce: Option<u64>,
    gas_limit: Option<u64>,
    gas_price: Option<u128>,
}

impl TransactionBuilder {
    /// Creates a new `TransactionBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transaction hash.
    pub fn hash(mut self, hash: B256) -> Self {
        self.hash = Some(hash);
        self
    }

    /// Sets the `to` address for the transaction.
    pub fn to(mut self, to: Address) -> Self {
        self.to = Some(to);
        self
    }

    /// Sets the `input` data for the transaction.
    pub fn input(mut self, input: Bytes) -> Self {
        self.input = input;
        self
    }

    /// Sets the `from` address for the transaction.
    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    /// Sets the `value` for the transaction.
    pub fn value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    /// Sets the `nonce` for the transaction.
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Sets the `gas_limit` for the transaction.
    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    /// Sets the price per unit of gas, carried as the max fee per gas.
    pub fn gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    /// Builds the `Transaction`.
    pub fn build(self) -> Transaction {
        let tx_json = json!({
            "blockHash": "0x8e38b4dbf6b11fcc3b9dee84fb7986e29ca0a02cecd8977c161ff7333329681e",
            "blockNumber": "0x1",
            "hash": self.hash.unwrap_or(DEFAULT_HASH),
            "transactionIndex": "0x0",
            "type": "0x2",
            "nonce": format!("{:#x}", self.nonce.unwrap_or(0)),
            "input": self.input,
            "maxFeePerGas": format!("{:#x}", self.gas_price.unwrap_or(2_000_000_000)),
            "maxPriorityFeePerGas": "0x3b9aca00",
            "chainId": "0x1",
            "accessList": [],
            "gas": format!("{:#x}", self.gas_limit.unwrap_or(21_000)),
            "from": self.from.unwrap_or_default(),
            "to": self.to,
            "value": self.value.unwrap_or_default(),
            "r": "0x1",
            "s": "0x1",
            "v": "0x1"
        });

        let alloy_tx: AlloyTransaction =
            serde_json::from_value(tx_json).expect("Failed to create transaction from JSON");

        Transaction(alloy_tx)
    }
}
