use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{deserialize_duration_from_ms, serialize_duration_to_ms};

/// Configuration for the RPC transport: retry backoff policy and the
/// per-request timeout applied at the client boundary.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RpcConfig {
    /// The maximum number of retries for a request.
    pub max_retry: u32,
    /// The initial backoff delay in milliseconds.
    pub backoff_ms: u64, // u64 because alloy's RetryBackoffLayer expects it.
    /// The number of compute units per second to allow.
    pub compute_units_per_second: u64,
    /// Upper bound for a single RPC round-trip, retries included.
    #[serde(
        deserialize_with = "deserialize_duration_from_ms",
        serialize_with = "serialize_duration_to_ms"
    )]
    pub request_timeout_ms: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            max_retry: 10,
            backoff_ms: 1000,
            compute_units_per_second: 100,
            request_timeout_ms: Duration::from_secs(30),
        }
    }
}
