//! Aggregation over the whole key space: progress counts and bulk
//! download of committed outcomes.

use futures::stream::{StreamExt, TryStreamExt};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::keyspace::{ItemState, KeyCodec};
use crate::probe::Outcome;
use crate::store::{ObjectStore, StoreError};

const DOWNLOAD_PARALLELISM: usize = 10;

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Point-in-time progress counts, derived from two prefix listings.
///
/// An item caught mid-transition (committed marker written, unprocessed
/// marker not yet deleted) is counted in both columns, so `total` can
/// briefly exceed the number of enrolled items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStatus {
    pub total: u64,
    pub committed: u64,
    pub unprocessed: u64,
}

/// All committed outcomes that could be fetched and parsed, plus a count
/// of those that could not.
#[derive(Debug, Default, Serialize)]
pub struct ResultSet {
    pub outcomes: Vec<Outcome>,
    pub skipped: u64,
}

/// Read-only views over the whole key space.
pub struct Aggregator {
    store: Arc<dyn ObjectStore>,
    codec: KeyCodec,
}

impl Aggregator {
    pub fn new(store: Arc<dyn ObjectStore>, codec: KeyCodec) -> Self {
        Self { store, codec }
    }

    /// Count items per lifecycle state. Bodies are never read.
    pub async fn status(&self) -> Result<StoreStatus, AggregateError> {
        let unprocessed = self.count_markers(&self.codec.unprocessed_prefix()).await?;
        let committed = self.count_markers(&self.codec.committed_prefix()).await?;
        Ok(StoreStatus {
            total: unprocessed + committed,
            committed,
            unprocessed,
        })
    }

    /// Fetch and parse every committed outcome body.
    ///
    /// Bodies that vanished between listing and fetch, or that fail to
    /// parse, are counted in `skipped` instead of failing the download;
    /// a single corrupt object must not hold the rest hostage.
    pub async fn download_all(&self) -> Result<ResultSet, AggregateError> {
        let mut keys = Vec::new();
        let mut listing = self.store.list_keys(&self.codec.committed_prefix());
        while let Some(key) = listing.try_next().await? {
            match self.codec.decode(&key) {
                Ok((_, ItemState::Committed { .. })) => keys.push(key),
                Ok(_) => {}
                Err(e) => warn!("Skipping unrecognized key during download: {}", e),
            }
        }
        drop(listing);

        let mut result = ResultSet::default();
        let mut fetches = futures::stream::iter(keys)
            .map(|key| {
                let store = Arc::clone(&self.store);
                async move {
                    match store.get_object(&key).await {
                        Ok(body) => match serde_json::from_slice::<Outcome>(&body) {
                            Ok(outcome) => Ok(Some(outcome)),
                            Err(e) => {
                                warn!("Skipping undeserializable outcome at {}: {}", key, e);
                                Ok(None)
                            }
                        },
                        Err(StoreError::NotFound(_)) => {
                            warn!("Outcome body vanished between listing and fetch: {}", key);
                            Ok(None)
                        }
                        Err(e) => Err(e),
                    }
                }
            })
            .buffer_unordered(DOWNLOAD_PARALLELISM);

        while let Some(fetched) = fetches.next().await {
            match fetched? {
                Some(outcome) => result.outcomes.push(outcome),
                None => result.skipped += 1,
            }
        }

        info!(
            "Downloaded {} outcomes ({} skipped)",
            result.outcomes.len(),
            result.skipped
        );
        Ok(result)
    }

    async fn count_markers(&self, prefix: &str) -> Result<u64, AggregateError> {
        let mut count = 0u64;
        let mut keys = self.store.list_keys(prefix);
        while let Some(key) = keys.try_next().await? {
            match self.codec.decode(&key) {
                Ok(_) => count += 1,
                Err(e) => warn!("Skipping unrecognized key during status: {}", e),
            }
        }
        Ok(count)
    }
}
