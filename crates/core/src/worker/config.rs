use serde::{Deserialize, Serialize};

/// Worker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Cap on items claimed per batch; 0 means no cap.
    #[serde(default)]
    pub max_items: usize,
    /// Concurrent probe attempts within one batch.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Wall-clock budget for a single probe attempt.
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,
    /// This worker's slot in a static partition of the item space.
    #[serde(default)]
    pub worker_index: usize,
    /// Number of workers sharing the item space; 1 disables partitioning.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
}

fn default_parallelism() -> usize {
    4
}

fn default_attempt_timeout_secs() -> u64 {
    180
}

fn default_worker_count() -> usize {
    1
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_items: 0,
            parallelism: default_parallelism(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
            worker_index: 0,
            worker_count: default_worker_count(),
        }
    }
}
