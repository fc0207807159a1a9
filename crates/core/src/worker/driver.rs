use futures::stream::StreamExt;
use futures::TryStreamExt;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::{timeout, Duration};
use tracing::{info, warn};

use crate::keyspace::ItemState;
use crate::lifecycle::{LifecycleEngine, LifecycleError};
use crate::probe::Probe;
use crate::store::StoreError;

use super::config::WorkerConfig;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),
}

/// What a single batch pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Items claimed and probed this pass.
    pub attempted: u64,
    pub committed_success: u64,
    pub committed_failure: u64,
    /// Attempted items left unprocessed: probe crashes, timeouts, and
    /// outcomes the commit path rejected. They stay visible to the next
    /// pass.
    pub still_unprocessed: u64,
}

/// Claims unprocessed items, runs the probe against each with bounded
/// parallelism, and commits whatever outcome comes back.
///
/// There is no claim marker: two workers probing the same item both
/// commit, and the second commit lands on the same or a sibling key.
/// Static partitioning (`worker_index`/`worker_count`) keeps overlap
/// rare when several workers share a key space.
pub struct WorkerDriver {
    engine: Arc<LifecycleEngine>,
    probe: Arc<dyn Probe>,
    config: WorkerConfig,
}

impl WorkerDriver {
    pub fn new(engine: Arc<LifecycleEngine>, probe: Arc<dyn Probe>, config: WorkerConfig) -> Self {
        Self {
            engine,
            probe,
            config,
        }
    }

    /// Run one batch pass. `max_items` of 0 means no cap; `parallelism`
    /// is clamped to at least 1.
    ///
    /// Store unavailability aborts the pass; per-item failures do not.
    pub async fn attempt_batch(
        &self,
        max_items: usize,
        parallelism: usize,
    ) -> Result<BatchReport, WorkerError> {
        let item_ids = self.claim_items(max_items).await?;
        info!(
            "Attempting {} items with parallelism {} (probe: {})",
            item_ids.len(),
            parallelism.max(1),
            self.probe.name()
        );

        let attempt_timeout = Duration::from_secs(self.config.attempt_timeout_secs);
        let mut attempts = futures::stream::iter(item_ids)
            .map(|item_id| {
                let probe = Arc::clone(&self.probe);
                async move {
                    let result = timeout(attempt_timeout, probe.probe(&item_id)).await;
                    (item_id, result)
                }
            })
            .buffer_unordered(parallelism.max(1));

        let mut report = BatchReport::default();
        while let Some((item_id, attempt)) = attempts.next().await {
            report.attempted += 1;
            match attempt {
                Ok(Ok(outcome)) => match self.engine.commit(&outcome).await {
                    Ok(()) => {
                        if outcome.status {
                            report.committed_success += 1;
                        } else {
                            report.committed_failure += 1;
                        }
                    }
                    Err(e @ LifecycleError::Store(_)) => return Err(e.into()),
                    Err(e) => {
                        warn!("Commit rejected for item {}: {}", item_id, e);
                        report.still_unprocessed += 1;
                    }
                },
                Ok(Err(e)) => {
                    warn!("Probe failed for item {}: {}", item_id, e);
                    report.still_unprocessed += 1;
                }
                Err(_) => {
                    warn!(
                        "Probe timed out for item {} after {}s",
                        item_id, self.config.attempt_timeout_secs
                    );
                    report.still_unprocessed += 1;
                }
            }
        }

        info!(
            "Batch done: {} attempted, {} succeeded, {} failed, {} still unprocessed",
            report.attempted,
            report.committed_success,
            report.committed_failure,
            report.still_unprocessed
        );
        Ok(report)
    }

    /// List unprocessed items, keep this worker's partition, and cap the
    /// claim at `max_items`.
    async fn claim_items(&self, max_items: usize) -> Result<Vec<String>, WorkerError> {
        let codec = self.engine.codec();
        let mut seen = HashSet::new();
        let mut item_ids = Vec::new();
        let mut keys = self
            .engine
            .store()
            .list_keys(&codec.unprocessed_prefix());
        while let Some(key) = keys.try_next().await? {
            match codec.decode(&key) {
                Ok((id, ItemState::Unprocessed)) => {
                    if seen.insert(id.clone()) {
                        item_ids.push(id);
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("Skipping unrecognized key during claim: {}", e),
            }
        }

        if self.config.worker_count > 1 {
            let (index, count) = (self.config.worker_index, self.config.worker_count);
            item_ids = item_ids
                .into_iter()
                .enumerate()
                .filter(|(i, _)| i % count == index)
                .map(|(_, id)| id)
                .collect();
        }

        if max_items > 0 {
            item_ids.truncate(max_items);
        }
        Ok(item_ids)
    }
}
