use std::path::Path;

use alloy::primitives::Address;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use url::Url;

use super::{MulticallConfig, RpcConfig, TokenPriceConfig, deserialize_urls};

/// Application configuration for Chainwatch.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// RPC URLs for the Ethereum node. Extra URLs act as fallbacks.
    #[serde(deserialize_with = "deserialize_urls")]
    pub rpc_urls: Vec<Url>,

    /// Retry and timeout policy for RPC requests.
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Multicall batching settings for contract-call triggers.
    #[serde(default)]
    pub multicall: MulticallConfig,

    /// Addresses that make up the `all_erc20_tokens` wildcard.
    #[serde(default)]
    pub erc20_tokens: Vec<Address>,

    /// Seed entries for the in-memory token price table.
    #[serde(default)]
    pub token_prices: Vec<TokenPriceConfig>,
}

impl AppConfig {
    /// Creates a new `AppConfig` by reading `app.yaml` from the configuration
    /// directory, layered with `CHAINWATCH__*` environment variables.
    pub fn new(config_dir: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir = config_dir.unwrap_or("configs");
        let app_file = Path::new(config_dir).join("app.yaml");
        let s = Config::builder()
            .add_source(File::from(app_file))
            .add_source(
                Environment::with_prefix("CHAINWATCH")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("rpc_urls")
                    .try_parsing(true),
            )
            .build()?;
        s.try_deserialize()
    }
}
