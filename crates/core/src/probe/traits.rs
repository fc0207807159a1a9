//! Trait definition for the probe seam.

use async_trait::async_trait;

use super::types::{Outcome, ProbeError};

/// The per-item work function supplied to the worker driver.
///
/// A probe either produces a domain [`Outcome`] (success or classified
/// failure) or fails as a harness error, in which case the item is left
/// unprocessed and retried on a later pass. Implementations must be safe
/// for concurrent use; the driver calls `probe` from many tasks at once.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Name of this probe implementation, for logs.
    fn name(&self) -> &str;

    /// Probe one item.
    async fn probe(&self, item_id: &str) -> Result<Outcome, ProbeError>;
}
