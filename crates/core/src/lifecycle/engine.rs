use futures::TryStreamExt;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::keyspace::{ItemState, KeyCodec, OutcomeFilter};
use crate::probe::{Outcome, ReasonCode};
use crate::store::ObjectStore;

use super::types::{EnrollReport, LifecycleError};

/// Performs the marker-key transitions that move items through their
/// lifecycle: enroll, commit, reprocess.
pub struct LifecycleEngine {
    store: Arc<dyn ObjectStore>,
    codec: KeyCodec,
}

impl LifecycleEngine {
    pub fn new(store: Arc<dyn ObjectStore>, codec: KeyCodec) -> Self {
        Self { store, codec }
    }

    pub fn codec(&self) -> &KeyCodec {
        &self.codec
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Enroll `item_ids`, creating an unprocessed marker for each id not
    /// already known to the key space.
    ///
    /// Known ids (unprocessed or committed) are skipped, so re-running
    /// enroll with the same input after a crash converges instead of
    /// resurrecting completed items.
    pub async fn enroll(&self, item_ids: &[String]) -> Result<EnrollReport, LifecycleError> {
        let mut known = HashSet::new();
        let mut keys = self.store.list_keys(&self.codec.root_prefix());
        while let Some(key) = keys.try_next().await? {
            match self.codec.decode(&key) {
                Ok((id, _)) => {
                    known.insert(id);
                }
                Err(e) => warn!("Skipping unrecognized key during enroll: {}", e),
            }
        }
        drop(keys);

        let mut report = EnrollReport::default();
        for id in item_ids {
            if known.contains(id) {
                report.already_present += 1;
                continue;
            }
            let key = self.codec.unprocessed_key(id)?;
            self.store.put_object(&key, Vec::new()).await?;
            known.insert(id.clone());
            report.enrolled += 1;
        }

        info!(
            "Enrolled {} items ({} already present)",
            report.enrolled, report.already_present
        );
        Ok(report)
    }

    /// Commit an outcome: write the committed marker, then delete the
    /// unprocessed one.
    ///
    /// Committing the same outcome twice converges to the same final
    /// state. Two workers committing different outcomes for one item both
    /// succeed and leave both committed markers behind; aggregation
    /// tolerates that rather than the commit path trying to lock.
    pub async fn commit(&self, outcome: &Outcome) -> Result<(), LifecycleError> {
        if outcome.status && outcome.reason != ReasonCode::None {
            return Err(LifecycleError::InvalidReasonCode {
                item_id: outcome.item_id.clone(),
                reason: outcome.reason.to_string(),
            });
        }

        let committed_key =
            self.codec
                .committed_key(&outcome.item_id, outcome.status, outcome.reason)?;
        let body = serde_json::to_vec(outcome)?;
        self.store.put_object(&committed_key, body).await?;

        let unprocessed_key = self.codec.unprocessed_key(&outcome.item_id)?;
        self.store.delete_object(&unprocessed_key).await?;

        debug!(
            "Committed item {} status={} reason={}",
            outcome.item_id, outcome.status, outcome.reason
        );
        Ok(())
    }

    /// Move committed items matching `filter` back to unprocessed, so the
    /// next processing pass picks them up again. Returns how many items
    /// were moved.
    pub async fn reprocess(&self, filter: &OutcomeFilter) -> Result<u64, LifecycleError> {
        if filter.is_degraded_scan() {
            debug!("Reason-only filter: scanning all committed markers");
        }

        // Collect matches before mutating, so the moves never race the
        // listing they came from.
        let mut matched: Vec<(String, String)> = Vec::new();
        let mut seen = HashSet::new();
        let mut keys = self.store.list_keys(&filter.listing_prefix(&self.codec));
        while let Some(key) = keys.try_next().await? {
            match self.codec.decode(&key) {
                Ok((id, ItemState::Committed { status, reason }))
                    if filter.matches(status, reason) =>
                {
                    if seen.insert(id.clone()) {
                        matched.push((id, key));
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("Skipping unrecognized key during reprocess: {}", e),
            }
        }
        drop(keys);

        let mut moved = 0u64;
        for (id, committed_key) in matched {
            let unprocessed_key = self.codec.unprocessed_key(&id)?;
            self.store.put_object(&unprocessed_key, Vec::new()).await?;
            self.store.delete_object(&committed_key).await?;
            moved += 1;
        }

        info!("Moved {} items back to unprocessed", moved);
        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryObjectStore;

    fn engine(store: &Arc<InMemoryObjectStore>) -> LifecycleEngine {
        LifecycleEngine::new(
            Arc::clone(store) as Arc<dyn ObjectStore>,
            KeyCodec::new("collections"),
        )
    }

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_enroll_creates_unprocessed_markers() {
        let store = Arc::new(InMemoryObjectStore::new());
        let engine = engine(&store);

        let report = engine.enroll(&ids(&["C1", "C2"])).await.unwrap();
        assert_eq!(report.enrolled, 2);
        assert_eq!(report.already_present, 0);
        assert!(store.contains_key("collections/unprocessed/C1").await);
        assert!(store.contains_key("collections/unprocessed/C2").await);
    }

    #[tokio::test]
    async fn test_enroll_skips_known_items() {
        let store = Arc::new(InMemoryObjectStore::new());
        let engine = engine(&store);

        engine.enroll(&ids(&["C1"])).await.unwrap();
        engine
            .commit(&Outcome::success("C1"))
            .await
            .unwrap();

        // C1 is committed now; re-enrolling must not resurrect it.
        let report = engine.enroll(&ids(&["C1", "C2"])).await.unwrap();
        assert_eq!(report.enrolled, 1);
        assert_eq!(report.already_present, 1);
        assert!(!store.contains_key("collections/unprocessed/C1").await);
    }

    #[tokio::test]
    async fn test_enroll_dedupes_input_batch() {
        let store = Arc::new(InMemoryObjectStore::new());
        let engine = engine(&store);

        let report = engine.enroll(&ids(&["C1", "C1"])).await.unwrap();
        assert_eq!(report.enrolled, 1);
        assert_eq!(report.already_present, 1);
    }

    #[tokio::test]
    async fn test_commit_writes_then_deletes() {
        let store = Arc::new(InMemoryObjectStore::new());
        let engine = engine(&store);
        engine.enroll(&ids(&["C1"])).await.unwrap();

        let outcome = Outcome::failure("C1", ReasonCode::Timeout);
        engine.commit(&outcome).await.unwrap();

        assert!(
            store
                .contains_key("collections/committed/status=false/reason=timeout/C1")
                .await
        );
        assert!(!store.contains_key("collections/unprocessed/C1").await);
    }

    #[tokio::test]
    async fn test_commit_body_is_the_outcome_json() {
        let store = Arc::new(InMemoryObjectStore::new());
        let engine = engine(&store);
        engine.enroll(&ids(&["C1"])).await.unwrap();

        let outcome = Outcome::failure("C1", ReasonCode::CantOpenFile)
            .with_message("read past EOF");
        engine.commit(&outcome).await.unwrap();

        let body = store
            .get_body("collections/committed/status=false/reason=cant_open_file/C1")
            .await
            .unwrap();
        let parsed: Outcome = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.item_id, "C1");
        assert_eq!(parsed.message.as_deref(), Some("read past EOF"));
    }

    #[tokio::test]
    async fn test_commit_is_idempotent() {
        let store = Arc::new(InMemoryObjectStore::new());
        let engine = engine(&store);
        engine.enroll(&ids(&["C1"])).await.unwrap();

        let outcome = Outcome::success("C1");
        engine.commit(&outcome).await.unwrap();
        engine.commit(&outcome).await.unwrap();

        assert_eq!(store.object_count().await, 1);
    }

    #[tokio::test]
    async fn test_commit_rejects_success_with_failure_reason() {
        let store = Arc::new(InMemoryObjectStore::new());
        let engine = engine(&store);

        let mut outcome = Outcome::success("C1");
        outcome.reason = ReasonCode::Timeout;
        let err = engine.commit(&outcome).await.unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidReasonCode { .. }));
        assert_eq!(store.object_count().await, 0);
    }

    #[tokio::test]
    async fn test_commit_allows_failure_with_reason_none() {
        let store = Arc::new(InMemoryObjectStore::new());
        let engine = engine(&store);
        engine.enroll(&ids(&["C1"])).await.unwrap();

        engine
            .commit(&Outcome::failure("C1", ReasonCode::None))
            .await
            .unwrap();
        assert!(
            store
                .contains_key("collections/committed/status=false/reason=none/C1")
                .await
        );
    }

    #[tokio::test]
    async fn test_reprocess_moves_matching_items() {
        let store = Arc::new(InMemoryObjectStore::new());
        let engine = engine(&store);
        engine.enroll(&ids(&["C1", "C2", "C3"])).await.unwrap();
        engine
            .commit(&Outcome::failure("C1", ReasonCode::Timeout))
            .await
            .unwrap();
        engine
            .commit(&Outcome::failure("C2", ReasonCode::CantOpenFile))
            .await
            .unwrap();
        engine.commit(&Outcome::success("C3")).await.unwrap();

        let filter = OutcomeFilter::new()
            .with_status(false)
            .with_reason(ReasonCode::Timeout);
        let moved = engine.reprocess(&filter).await.unwrap();
        assert_eq!(moved, 1);

        assert!(store.contains_key("collections/unprocessed/C1").await);
        assert!(
            !store
                .contains_key("collections/committed/status=false/reason=timeout/C1")
                .await
        );
        // Non-matching items untouched.
        assert!(
            store
                .contains_key("collections/committed/status=false/reason=cant_open_file/C2")
                .await
        );
        assert!(
            store
                .contains_key("collections/committed/status=true/reason=none/C3")
                .await
        );
    }

    #[tokio::test]
    async fn test_reprocess_reason_only_filter_scans_all_committed() {
        let store = Arc::new(InMemoryObjectStore::new());
        let engine = engine(&store);
        engine.enroll(&ids(&["C1", "C2"])).await.unwrap();
        engine
            .commit(&Outcome::failure("C1", ReasonCode::Timeout))
            .await
            .unwrap();
        engine.commit(&Outcome::success("C2")).await.unwrap();

        let filter = OutcomeFilter::new().with_reason(ReasonCode::Timeout);
        let moved = engine.reprocess(&filter).await.unwrap();
        assert_eq!(moved, 1);
        assert!(store.contains_key("collections/unprocessed/C1").await);
    }

    #[tokio::test]
    async fn test_reprocess_empty_match_is_a_noop() {
        let store = Arc::new(InMemoryObjectStore::new());
        let engine = engine(&store);
        engine.enroll(&ids(&["C1"])).await.unwrap();

        let moved = engine
            .reprocess(&OutcomeFilter::new().with_status(false))
            .await
            .unwrap();
        assert_eq!(moved, 0);
        assert!(store.contains_key("collections/unprocessed/C1").await);
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let store = Arc::new(InMemoryObjectStore::new());
        let engine = engine(&store);

        store
            .set_next_error(crate::store::StoreError::Unavailable {
                attempts: 4,
                message: "503".to_string(),
            })
            .await;
        let err = engine.enroll(&ids(&["C1"])).await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Store(crate::store::StoreError::Unavailable { .. })
        ));
    }
}
