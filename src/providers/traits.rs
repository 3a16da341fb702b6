//! This module defines the capabilities the matchers are given: a narrow view
//! of an EVM-compatible chain and a source of token decimals and prices.

use alloy::{
    primitives::{Address, Bytes},
    rpc::types::Block,
};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{filtering::Asset, models::Log};

/// Custom error type for chain access.
#[derive(Error, Debug)]
pub enum DataSourceError {
    /// Error when interacting with the provider.
    #[error("Provider error: {0}")]
    Provider(#[from] Box<dyn std::error::Error + Send + Sync>),

    /// Indicates that the requested block was not found.
    #[error("Block not found: {0}")]
    BlockNotFound(u64),

    /// The request did not complete within the configured timeout.
    #[error("RPC request timed out")]
    Timeout,

    /// The node answered with data that could not be decoded.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// The chain operations the matchers rely on: `eth_call`, `eth_blockNumber`,
/// `eth_getBlockByNumber` and `eth_getLogs`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Executes a read-only call against the state at `block_number`.
    async fn call(
        &self,
        to: Address,
        input: Bytes,
        block_number: u64,
    ) -> Result<Bytes, DataSourceError>;

    /// Fetches the current head block number.
    async fn block_number(&self) -> Result<u64, DataSourceError>;

    /// Fetches a block with full transaction bodies.
    async fn block_by_number(&self, block_number: u64) -> Result<Block, DataSourceError>;

    /// Fetches every log emitted in a block.
    async fn logs(&self, block_number: u64) -> Result<Vec<Log>, DataSourceError>;
}

/// Custom error type for price lookups.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The asset's decimals are not known.
    #[error("Unknown decimals for asset {0}")]
    UnknownDecimals(Asset),

    /// No price is known for the asset in the requested quote currency.
    #[error("No {quote} price for asset {asset}")]
    NoPrice {
        /// The asset being priced.
        asset: Asset,
        /// The quote currency.
        quote: String,
    },
}

/// Token metadata and price lookups used for currency conversion.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Returns the number of decimals amounts of `asset` are expressed in.
    async fn decimals(&self, asset: Asset) -> Result<u8, PriceError>;

    /// Returns the price of one whole unit of `asset` in `quote`.
    async fn price(&self, asset: Asset, quote: &str) -> Result<Decimal, PriceError>;
}
