//! Mock probe for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;

use crate::probe::{Outcome, Probe, ProbeError};

/// What the mock should do when asked to probe a given item.
#[derive(Debug, Clone)]
enum Scripted {
    /// Return this outcome.
    Outcome(Outcome),
    /// Fail as if the probe process crashed.
    Crash(String),
    /// Never return, for exercising attempt timeouts.
    Hang,
}

/// Mock implementation of the Probe trait.
///
/// Provides controllable behavior for testing:
/// - Script an outcome, a crash, or a hang per item id
/// - Track which items were probed, and how often
///
/// Scripts persist across calls and can be overwritten between passes,
/// so a retry flow can script a failure first and a success later.
#[derive(Debug)]
pub struct MockProbe {
    scripts: Arc<RwLock<HashMap<String, Scripted>>>,
    /// Item ids in probe order.
    calls: Arc<RwLock<Vec<String>>>,
}

impl Default for MockProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProbe {
    /// Create a new mock probe with no scripts.
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Script an outcome for its item id.
    pub async fn set_outcome(&self, outcome: Outcome) {
        self.scripts
            .write()
            .await
            .insert(outcome.item_id.clone(), Scripted::Outcome(outcome));
    }

    /// Script a crash for `item_id`.
    pub async fn set_crash(&self, item_id: &str, message: &str) {
        self.scripts
            .write()
            .await
            .insert(item_id.to_string(), Scripted::Crash(message.to_string()));
    }

    /// Script `item_id` to hang until the caller's timeout fires.
    pub async fn set_hang(&self, item_id: &str) {
        self.scripts
            .write()
            .await
            .insert(item_id.to_string(), Scripted::Hang);
    }

    /// Item ids probed so far, in order.
    pub async fn probed_ids(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }

    /// Number of probe calls performed.
    pub async fn probe_count(&self) -> usize {
        self.calls.read().await.len()
    }
}

#[async_trait]
impl Probe for MockProbe {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, item_id: &str) -> Result<Outcome, ProbeError> {
        self.calls.write().await.push(item_id.to_string());

        let script = self.scripts.read().await.get(item_id).cloned();
        match script {
            Some(Scripted::Outcome(outcome)) => Ok(outcome),
            Some(Scripted::Crash(message)) => Err(ProbeError::Crashed(message)),
            Some(Scripted::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ProbeError::Crashed("hang elapsed".to_string()))
            }
            None => Err(ProbeError::Crashed(format!(
                "no scripted result for item {item_id}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ReasonCode;

    #[tokio::test]
    async fn test_scripted_outcome() {
        let probe = MockProbe::new();
        probe
            .set_outcome(Outcome::failure("C1", ReasonCode::Timeout))
            .await;

        let outcome = probe.probe("C1").await.unwrap();
        assert_eq!(outcome.item_id, "C1");
        assert!(!outcome.status);
        assert_eq!(outcome.reason, ReasonCode::Timeout);
    }

    #[tokio::test]
    async fn test_scripted_crash() {
        let probe = MockProbe::new();
        probe.set_crash("C1", "segfault").await;

        let err = probe.probe("C1").await.unwrap_err();
        assert!(matches!(err, ProbeError::Crashed(_)));
    }

    #[tokio::test]
    async fn test_unscripted_item_crashes() {
        let probe = MockProbe::new();
        assert!(probe.probe("C1").await.is_err());
    }

    #[tokio::test]
    async fn test_calls_are_recorded() {
        let probe = MockProbe::new();
        probe.set_outcome(Outcome::success("C1")).await;
        probe.probe("C1").await.unwrap();
        let _ = probe.probe("C2").await;

        assert_eq!(probe.probed_ids().await, vec!["C1", "C2"]);
        assert_eq!(probe.probe_count().await, 2);
    }

    #[tokio::test]
    async fn test_scripts_can_be_overwritten() {
        let probe = MockProbe::new();
        probe
            .set_outcome(Outcome::failure("C1", ReasonCode::CantOpenFile))
            .await;
        assert!(!probe.probe("C1").await.unwrap().status);

        probe.set_outcome(Outcome::success("C1")).await;
        assert!(probe.probe("C1").await.unwrap().status);
    }
}
