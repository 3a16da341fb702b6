//! This module provides the alloy-backed `ChainClient` and the provider
//! factory with retry, fallback and call batching layers.

use std::{
    future::{Future, IntoFuture},
    num::NonZeroUsize,
    time::Duration,
};

use alloy::{
    eips::BlockId,
    primitives::{Address, Bytes},
    providers::{Provider, ProviderBuilder, layers::CallBatchLayer},
    rpc::{
        client::RpcClient,
        types::{Block, Filter, TransactionRequest},
    },
    transports::{
        http::{Http, reqwest::Url},
        layers::{FallbackLayer, RetryBackoffLayer},
    },
};
use async_trait::async_trait;
use tower::ServiceBuilder;

use super::traits::{ChainClient, DataSourceError};
use crate::{config::RpcConfig, models::Log};

/// A `ChainClient` implementation that talks to an EVM RPC endpoint.
pub struct EvmRpcClient<P> {
    provider: P,
    request_timeout: Duration,
}

impl<P> EvmRpcClient<P>
where
    P: Provider,
{
    /// Creates a new `EvmRpcClient`. Every request is bounded by
    /// `request_timeout`.
    #[tracing::instrument(skip(provider), level = "debug")]
    pub fn new(provider: P, request_timeout: Duration) -> Self {
        Self { provider, request_timeout }
    }

    async fn bounded<T, E, F>(&self, request: F) -> Result<T, DataSourceError>
    where
        F: Future<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        match tokio::time::timeout(self.request_timeout, request).await {
            Ok(result) => result.map_err(|e| DataSourceError::Provider(Box::new(e))),
            Err(_) => Err(DataSourceError::Timeout),
        }
    }
}

#[async_trait]
impl<P> ChainClient for EvmRpcClient<P>
where
    P: Provider + Send + Sync,
{
    #[tracing::instrument(skip(self, input), level = "debug")]
    async fn call(
        &self,
        to: Address,
        input: Bytes,
        block_number: u64,
    ) -> Result<Bytes, DataSourceError> {
        let request = TransactionRequest::default().to(to).input(input.into());
        let output = self
            .bounded(self.provider.call(request).block(BlockId::number(block_number)).into_future())
            .await;
        if let Err(e) = &output {
            tracing::debug!(error = %e, %to, block_number, "eth_call failed.");
        }
        output
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn block_number(&self) -> Result<u64, DataSourceError> {
        let block_number = self.bounded(self.provider.get_block_number().into_future()).await?;
        tracing::debug!(current_block = block_number, "Fetched current block number.");
        Ok(block_number)
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn block_by_number(&self, block_number: u64) -> Result<Block, DataSourceError> {
        self.bounded(self.provider.get_block_by_number(block_number.into()).full().into_future())
            .await?
            .ok_or_else(|| {
                tracing::warn!(block_number, "Block not found.");
                DataSourceError::BlockNotFound(block_number)
            })
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn logs(&self, block_number: u64) -> Result<Vec<Log>, DataSourceError> {
        let filter = Filter::new().from_block(block_number).to_block(block_number);
        let logs = self.bounded(self.provider.get_logs(&filter)).await?;
        tracing::debug!(block_number, log_count = logs.len(), "Fetched block logs.");
        Ok(logs.into_iter().map(Log::from).collect())
    }
}

/// Custom error type for provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Error when creating the provider.
    #[error("Provider creation failed: {0}")]
    CreationError(String),
}

/// Creates a new provider with the given RPC URLs. URLs after the first act as
/// fallbacks.
pub fn create_provider(urls: Vec<Url>, config: RpcConfig) -> Result<impl Provider, ProviderError> {
    let transport_count = NonZeroUsize::new(urls.len())
        .ok_or_else(|| ProviderError::CreationError("RPC URL list cannot be empty".into()))?;

    let fallback_layer = FallbackLayer::default().with_active_transport_count(transport_count);

    let transports: Vec<_> = urls.into_iter().map(Http::new).collect();

    let retry_layer =
        RetryBackoffLayer::new(config.max_retry, config.backoff_ms, config.compute_units_per_second);

    let service =
        ServiceBuilder::new().layer(retry_layer).layer(fallback_layer).service(transports);

    let client = RpcClient::builder().transport(service, false);
    let provider = ProviderBuilder::new().layer(CallBatchLayer::new()).connect_client(client);
    Ok(provider)
}
