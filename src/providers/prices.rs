//! An in-memory `PriceSource` seeded from configuration.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;

use super::traits::{PriceError, PriceSource};
use crate::{config::TokenPriceConfig, filtering::Asset};

/// Decimals assumed for the native asset when it is not configured.
const NATIVE_DECIMALS: u8 = 18;

#[derive(Debug, Clone, Default)]
struct Quote {
    /// `None` until configured; a price alone says nothing about decimals.
    decimals: Option<u8>,
    prices: HashMap<String, Decimal>,
}

/// A concurrent table of asset decimals and prices.
///
/// Quote currencies are matched case-insensitively.
#[derive(Debug, Default)]
pub struct PriceTable {
    entries: DashMap<Asset, Quote>,
}

impl PriceTable {
    /// Creates a table seeded with the configured entries.
    pub fn new(seed: &[TokenPriceConfig]) -> Self {
        let table = Self::default();
        for entry in seed {
            let asset = entry.token.map_or(Asset::Native, Asset::Token);
            table.set_decimals(asset, entry.decimals);
            for (quote, price) in &entry.prices {
                table.set_price(asset, quote, *price);
            }
        }
        table
    }

    /// Records the decimals of an asset.
    pub fn set_decimals(&self, asset: Asset, decimals: u8) {
        self.entries.entry(asset).or_default().decimals = Some(decimals);
    }

    /// Records the price of one whole unit of `asset` in `quote`.
    pub fn set_price(&self, asset: Asset, quote: &str, price: Decimal) {
        self.entries.entry(asset).or_default().prices.insert(quote.to_ascii_uppercase(), price);
    }
}

#[async_trait]
impl PriceSource for PriceTable {
    async fn decimals(&self, asset: Asset) -> Result<u8, PriceError> {
        match (self.entries.get(&asset).and_then(|q| q.decimals), asset) {
            (Some(decimals), _) => Ok(decimals),
            (None, Asset::Native) => Ok(NATIVE_DECIMALS),
            (None, Asset::Token(_)) => Err(PriceError::UnknownDecimals(asset)),
        }
    }

    async fn price(&self, asset: Asset, quote: &str) -> Result<Decimal, PriceError> {
        self.entries
            .get(&asset)
            .and_then(|q| q.prices.get(&quote.to_ascii_uppercase()).copied())
            .ok_or_else(|| PriceError::NoPrice { asset, quote: quote.to_string() })
    }
}
