//! Chain access and price lookups injected into the matchers.

pub mod multicall;
pub mod prices;
pub mod rpc;
pub mod traits;

pub use multicall::{MulticallRequest, aggregate, aggregate_in_batches};
pub use prices::PriceTable;
pub use rpc::{EvmRpcClient, ProviderError, create_provider};
#[cfg(test)]
pub use traits::{MockChainClient, MockPriceSource};
pub use traits::{ChainClient, DataSourceError, PriceError, PriceSource};
