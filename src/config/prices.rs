use std::collections::HashMap;

use alloy::primitives::Address;
use rust_decimal::Decimal;
use serde::Deserialize;

/// A seed entry for the in-memory price table.
///
/// `token` is omitted for the chain's native asset.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TokenPriceConfig {
    /// Token contract address, or `None` for the native asset.
    #[serde(default)]
    pub token: Option<Address>,
    /// Number of decimals the token amount is expressed in.
    pub decimals: u8,
    /// Price of one whole token, keyed by quote currency (e.g. `USD`).
    #[serde(default)]
    pub prices: HashMap<String, Decimal>,
}
