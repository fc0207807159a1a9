//! Listing-only queries over committed outcomes.
//!
//! Queries never read object bodies; everything they report is decoded
//! from marker keys. The filter picks the narrowest listing prefix it
//! can, so a fully specified filter costs one prefix listing.

use futures::TryStreamExt;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::keyspace::{ItemState, KeyCodec, OutcomeFilter};
use crate::store::{ObjectStore, StoreError};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Answers "which items committed with status X / reason Y" from key
/// listings alone.
pub struct QueryEngine {
    store: Arc<dyn ObjectStore>,
    codec: KeyCodec,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn ObjectStore>, codec: KeyCodec) -> Self {
        Self { store, codec }
    }

    /// Item ids of committed outcomes matching `filter`, in listing
    /// order, deduplicated.
    ///
    /// Keys that do not decode are skipped with a warning; a foreign
    /// object under the prefix must not poison the whole query.
    pub async fn find(&self, filter: &OutcomeFilter) -> Result<Vec<String>, QueryError> {
        if filter.is_degraded_scan() {
            debug!("Reason-only filter: scanning all committed markers");
        }

        let mut seen = HashSet::new();
        let mut item_ids = Vec::new();
        let mut keys = self.store.list_keys(&filter.listing_prefix(&self.codec));
        while let Some(key) = keys.try_next().await? {
            match self.codec.decode(&key) {
                Ok((id, ItemState::Committed { status, reason }))
                    if filter.matches(status, reason) =>
                {
                    if seen.insert(id.clone()) {
                        item_ids.push(id);
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("Skipping unrecognized key during query: {}", e),
            }
        }

        Ok(item_ids)
    }
}
