//! Probe implementation that shells out to an external command.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;

use crate::classify::ClassifierTable;

use super::traits::Probe;
use super::types::{Outcome, ProbeError, ReasonCode};

/// Placeholder in probe command arguments replaced by the item id.
const ITEM_ID_PLACEHOLDER: &str = "{id}";

/// Configuration for [`CommandProbe`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeCommandConfig {
    /// Program to run for each item.
    pub command: String,
    /// Arguments; occurrences of `{id}` are replaced by the item id. If no
    /// argument contains the placeholder, the id is appended as the last
    /// argument.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Runs a configured external command once per item and interprets its
/// output as the probe outcome.
///
/// Contract with the command:
/// - exit code 0 with a JSON [`Outcome`] on stdout → that outcome;
/// - non-zero exit → a failure outcome whose reason is classified from
///   stderr through the rules table;
/// - anything else (spawn failure, kill signal, unparseable stdout) is a
///   harness failure, leaving the item unprocessed.
pub struct CommandProbe {
    config: ProbeCommandConfig,
    classifier: ClassifierTable,
}

impl CommandProbe {
    pub fn new(config: ProbeCommandConfig) -> Self {
        Self {
            config,
            classifier: ClassifierTable::default(),
        }
    }

    pub fn with_classifier(mut self, classifier: ClassifierTable) -> Self {
        self.classifier = classifier;
        self
    }

    fn build_args(&self, item_id: &str) -> Vec<String> {
        let mut substituted = false;
        let mut args: Vec<String> = self
            .config
            .args
            .iter()
            .map(|arg| {
                if arg.contains(ITEM_ID_PLACEHOLDER) {
                    substituted = true;
                    arg.replace(ITEM_ID_PLACEHOLDER, item_id)
                } else {
                    arg.clone()
                }
            })
            .collect();
        if !substituted {
            args.push(item_id.to_string());
        }
        args
    }

    fn parse_stdout(&self, item_id: &str, stdout: &[u8]) -> Result<Outcome, ProbeError> {
        let outcome: Outcome = serde_json::from_slice(stdout)
            .map_err(|e| ProbeError::UnparseableOutput(e.to_string()))?;
        if outcome.item_id != item_id {
            return Err(ProbeError::UnparseableOutput(format!(
                "outcome is for item {:?}, expected {:?}",
                outcome.item_id, item_id
            )));
        }
        Ok(outcome)
    }
}

#[async_trait]
impl Probe for CommandProbe {
    fn name(&self) -> &str {
        "command"
    }

    async fn probe(&self, item_id: &str) -> Result<Outcome, ProbeError> {
        let args = self.build_args(item_id);
        tracing::debug!(item_id, command = %self.config.command, "Spawning probe command");

        let output = Command::new(&self.config.command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(ProbeError::Spawn)?;

        if output.status.success() {
            return self.parse_stdout(item_id, &output.stdout);
        }

        match output.status.code() {
            Some(code) => {
                // A clean non-zero exit is a domain failure, classified
                // from whatever the command wrote to stderr.
                let stderr = String::from_utf8_lossy(&output.stderr);
                let message = stderr.trim();
                let reason = if message.is_empty() {
                    ReasonCode::CantOpenFile
                } else {
                    self.classifier.classify(message)
                };
                tracing::debug!(item_id, code, %reason, "Probe command reported failure");
                let mut outcome = Outcome::failure(item_id, reason);
                if !message.is_empty() {
                    outcome = outcome.with_message(message);
                }
                Ok(outcome)
            }
            // Killed by signal: the probe never got to report anything.
            None => Err(ProbeError::Crashed(format!(
                "probe for {} terminated by signal",
                item_id
            ))),
        }
    }
}
