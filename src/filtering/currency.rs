//! Currency normalization for value-bearing conditions.
//!
//! A raw on-chain amount is scaled down by its asset's decimals and, when the
//! condition names a quote currency, multiplied by the asset's price in it.

use std::fmt;

use alloy::primitives::Address;
use num_bigint::BigInt;
use rust_decimal::Decimal;

use crate::providers::{PriceError, PriceSource};

/// Largest scale a `Decimal` can carry.
const MAX_SCALE: u32 = 28;

/// An asset whose amounts can be normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Asset {
    /// The chain's native currency.
    Native,
    /// An ERC-20 token.
    Token(Address),
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => f.write_str("native"),
            Asset::Token(address) => write!(f, "{address}"),
        }
    }
}

/// Resolved parameters for turning a raw amount into a comparable decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyConversion {
    /// Decimals of the asset.
    pub decimals: u8,
    /// Price of one whole unit in the quote currency, if a quote was asked for.
    pub price: Option<Decimal>,
}

impl CurrencyConversion {
    /// Normalizes a raw amount. Returns `None` if the result does not fit in a
    /// `Decimal`.
    pub fn apply(&self, amount: &BigInt) -> Option<Decimal> {
        let whole_units = scale_down(amount, u32::from(self.decimals))?;
        match self.price {
            Some(price) => whole_units.checked_mul(price),
            None => Some(whole_units),
        }
    }
}

/// Divides `amount` by `10^decimals` as a `Decimal`, dropping the least
/// significant digits when the mantissa does not fit in 96 bits.
fn scale_down(amount: &BigInt, decimals: u32) -> Option<Decimal> {
    let mut mantissa = amount.clone();
    let mut scale = decimals;
    while scale > MAX_SCALE {
        mantissa = &mantissa / 10u32;
        scale -= 1;
    }
    loop {
        if let Ok(m) = i128::try_from(&mantissa) {
            if let Ok(d) = Decimal::try_from_i128_with_scale(m, scale) {
                return Some(d.normalize());
            }
        }
        if scale == 0 {
            return None;
        }
        mantissa = &mantissa / 10u32;
        scale -= 1;
    }
}

/// Looks up the conversion for `asset`, including its price in
/// `attribute_currency` when one is given.
pub async fn resolve_conversion(
    prices: &dyn PriceSource,
    asset: Asset,
    attribute_currency: Option<&str>,
) -> Result<CurrencyConversion, PriceError> {
    let decimals = prices.decimals(asset).await?;
    let price = match attribute_currency {
        Some(quote) => Some(prices.price(asset, quote).await?),
        None => None,
    };
    Ok(CurrencyConversion { decimals, price })
}
