use serde::{Deserialize, Serialize};

use crate::probe::ProbeCommandConfig;
use crate::store::RetryPolicy;
use crate::worker::WorkerConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub store: StoreConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Probe subprocess definition (required for `process`, unused by the
    /// read-only operations).
    #[serde(default)]
    pub probe: Option<ProbeCommandConfig>,
}

/// Object store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Bucket holding the marker key space.
    pub bucket: String,
    /// Key prefix all markers live under.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// AWS region; falls back to the ambient environment when unset.
    #[serde(default)]
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores (MinIO, localstack).
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_prefix() -> String {
    "collections".to_string()
}
