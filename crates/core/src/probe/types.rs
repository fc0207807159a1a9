//! Types for probe outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed enumeration classifying why an item failed its probe.
///
/// `None` is reserved for successful outcomes. The tokens are embedded in
/// committed marker keys, so they are restricted to lowercase, digits and
/// underscore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// No failure (successful outcome).
    None,
    /// The item's data format is not supported by any reader.
    UnsupportedFormat,
    /// The data file could not be opened.
    CantOpenFile,
    /// The probe exceeded its time budget.
    Timeout,
    /// Opening worked but tile generation failed.
    TileGenerationFailed,
    /// No granule was found to probe for this item.
    NoGranuleFound,
    /// A data URL could not be extracted from the item's metadata.
    FailedToExtractUrl,
}

impl ReasonCode {
    /// All members of the closed set, in a stable order.
    pub const ALL: [ReasonCode; 7] = [
        ReasonCode::None,
        ReasonCode::UnsupportedFormat,
        ReasonCode::CantOpenFile,
        ReasonCode::Timeout,
        ReasonCode::TileGenerationFailed,
        ReasonCode::NoGranuleFound,
        ReasonCode::FailedToExtractUrl,
    ];

    /// The key-path token for this reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::None => "none",
            ReasonCode::UnsupportedFormat => "unsupported_format",
            ReasonCode::CantOpenFile => "cant_open_file",
            ReasonCode::Timeout => "timeout",
            ReasonCode::TileGenerationFailed => "tile_generation_failed",
            ReasonCode::NoGranuleFound => "no_granule_found",
            ReasonCode::FailedToExtractUrl => "failed_to_extract_url",
        }
    }

    /// Parse a token back into a reason code.
    ///
    /// Any token outside the closed set is a contract violation on the
    /// producer's side and is rejected, never stored.
    pub fn parse(token: &str) -> Result<Self, ProbeError> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == token)
            .ok_or_else(|| ProbeError::InvalidReasonCode(token.to_string()))
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of probing one item.
///
/// `payload` carries whatever structured metadata the probe produced
/// (identifiers, URLs, diagnostics); the core stores it verbatim in the
/// committed marker body and never interprets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    /// Id of the probed item.
    pub item_id: String,
    /// Whether the probe succeeded.
    pub status: bool,
    /// Failure classification; `none` for success.
    pub reason: ReasonCode,
    /// Free-form diagnostic text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Opaque structured metadata from the probe.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
    /// When the probe completed.
    pub completed_at: DateTime<Utc>,
}

impl Outcome {
    /// A successful outcome with an empty payload.
    pub fn success(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            status: true,
            reason: ReasonCode::None,
            message: None,
            payload: serde_json::Value::Null,
            completed_at: Utc::now(),
        }
    }

    /// A failed outcome with the given reason.
    pub fn failure(item_id: impl Into<String>, reason: ReasonCode) -> Self {
        Self {
            item_id: item_id.into(),
            status: false,
            reason,
            message: None,
            payload: serde_json::Value::Null,
            completed_at: Utc::now(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// A failure of the probe harness itself, as opposed to a domain outcome.
///
/// Harness failures never reach the store: the item's unprocessed marker
/// is left untouched and the item stays eligible for a later attempt.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The probe process could not be started.
    #[error("failed to spawn probe: {0}")]
    Spawn(#[source] std::io::Error),

    /// The probe produced output the harness could not understand.
    #[error("unparseable probe output: {0}")]
    UnparseableOutput(String),

    /// The probe reported a reason token outside the closed set.
    #[error("invalid reason code: {0:?}")]
    InvalidReasonCode(String),

    /// The probe crashed or was killed.
    #[error("probe crashed: {0}")]
    Crashed(String),
}
