//! Batching of read-only contract calls through Multicall3 `aggregate3`.

use alloy::{
    primitives::{Address, Bytes},
    sol,
    sol_types::{SolCall, SolValue},
};

use super::traits::{ChainClient, DataSourceError};

sol! {
    struct Call3 {
        address target;
        bool allowFailure;
        bytes callData;
    }

    struct Result3 {
        bool success;
        bytes returnData;
    }

    function aggregate3(Call3[] calldata calls)
        external
        payable
        returns (Result3[] memory returnData);
}

/// One call to pack into an `aggregate3` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MulticallRequest {
    /// Contract to call.
    pub target: Address,
    /// ABI-encoded call data, selector included.
    pub call_data: Bytes,
}

/// Executes `requests` in a single `aggregate3` call at `block_number`.
///
/// Calls are made with `allowFailure = true`: a reverted call yields `None`
/// at its position, while a failure of the batch itself is returned as an
/// error.
pub async fn aggregate(
    client: &dyn ChainClient,
    multicall: Address,
    requests: &[MulticallRequest],
    block_number: u64,
) -> Result<Vec<Option<Bytes>>, DataSourceError> {
    if requests.is_empty() {
        return Ok(Vec::new());
    }

    let calls = requests
        .iter()
        .map(|r| Call3 { target: r.target, allowFailure: true, callData: r.call_data.clone() })
        .collect();
    let input = aggregate3Call { calls }.abi_encode();

    let output = client.call(multicall, input.into(), block_number).await?;
    let results = <Vec<Result3> as SolValue>::abi_decode(&output)
        .map_err(|e| DataSourceError::MalformedResponse(e.to_string()))?;

    if results.len() != requests.len() {
        return Err(DataSourceError::MalformedResponse(format!(
            "aggregate3 returned {} results for {} calls",
            results.len(),
            requests.len()
        )));
    }

    Ok(results.into_iter().map(|r| r.success.then_some(r.returnData)).collect())
}

/// Executes `requests` in chunks of at most `batch_size` calls, concurrently.
///
/// The result has one entry per request, in request order. An entry is
/// `None` when the call reverted or its whole chunk could not be executed.
pub async fn aggregate_in_batches(
    client: &dyn ChainClient,
    multicall: Address,
    requests: &[MulticallRequest],
    batch_size: usize,
    block_number: u64,
) -> Vec<Option<Bytes>> {
    let chunks = requests.chunks(batch_size.max(1)).map(|chunk| async move {
        match aggregate(client, multicall, chunk, block_number).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    block_number,
                    chunk_size = chunk.len(),
                    "Multicall batch failed; every call in it is marked failed."
                );
                vec![None; chunk.len()]
            }
        }
    });

    futures::future::join_all(chunks).await.into_iter().flatten().collect()
}
