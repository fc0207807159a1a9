//! Key encoding for item lifecycle state.
//!
//! The object store's key space doubles as the index: an item's current
//! lifecycle state is derivable from which marker key exists, without
//! reading any object body. Two key templates are recognized:
//!
//! ```text
//! <prefix>/unprocessed/<itemID>
//! <prefix>/committed/status=<true|false>/reason=<reasonCode>/<itemID>
//! ```
//!
//! Status and reason are embedded positionally in the path so that prefix
//! listings can filter on them. Everything in this module is pure; no I/O.

use thiserror::Error;

use crate::probe::ReasonCode;

/// Lifecycle state of a single item, as encoded in its marker key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    /// Enrolled, not yet successfully completed.
    Unprocessed,
    /// Completed with an outcome.
    Committed { status: bool, reason: ReasonCode },
}

/// Errors from key encoding/decoding.
#[derive(Debug, Error)]
pub enum KeyError {
    /// Key does not match either recognized template.
    #[error("malformed key: {0}")]
    Malformed(String),

    /// Item id cannot be used as a path segment.
    #[error("invalid item id: {0:?}")]
    InvalidItemId(String),
}

/// Filter over committed outcomes, by status and/or reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeFilter {
    pub status: Option<bool>,
    pub reason: Option<ReasonCode>,
}

impl OutcomeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: bool) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_reason(mut self, reason: ReasonCode) -> Self {
        self.reason = Some(reason);
        self
    }

    /// Whether a committed (status, reason) pair passes the filter.
    pub fn matches(&self, status: bool, reason: ReasonCode) -> bool {
        self.status.map_or(true, |s| s == status) && self.reason.map_or(true, |r| r == reason)
    }

    /// The most specific committed-key prefix this filter can be listed
    /// under. A reason without a status cannot form a valid prefix, so
    /// that combination degrades to listing all committed markers and
    /// filtering client-side.
    pub fn listing_prefix(&self, codec: &KeyCodec) -> String {
        match (self.status, self.reason) {
            (Some(status), Some(reason)) => codec.reason_prefix(status, reason),
            (Some(status), None) => codec.status_prefix(status),
            _ => codec.committed_prefix(),
        }
    }

    /// Whether [`OutcomeFilter::listing_prefix`] had to fall back to the
    /// full committed scan despite a filter being present.
    pub fn is_degraded_scan(&self) -> bool {
        self.status.is_none() && self.reason.is_some()
    }
}

/// Maps item ids and lifecycle states to object-store keys and back.
///
/// The codec owns only the key-space prefix; it is cheap to clone and
/// safe to share.
#[derive(Debug, Clone)]
pub struct KeyCodec {
    prefix: String,
}

impl KeyCodec {
    /// Create a codec rooted at `prefix`. A trailing slash is stripped.
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        while prefix.ends_with('/') {
            prefix.pop();
        }
        Self { prefix }
    }

    /// Prefix covering every marker in the key space.
    pub fn root_prefix(&self) -> String {
        format!("{}/", self.prefix)
    }

    /// Prefix covering all unprocessed markers.
    pub fn unprocessed_prefix(&self) -> String {
        format!("{}/unprocessed/", self.prefix)
    }

    /// Prefix covering all committed markers.
    pub fn committed_prefix(&self) -> String {
        format!("{}/committed/", self.prefix)
    }

    /// Prefix covering committed markers with the given status.
    pub fn status_prefix(&self, status: bool) -> String {
        format!("{}/committed/status={}/", self.prefix, status_token(status))
    }

    /// Prefix covering committed markers with the given status and reason.
    pub fn reason_prefix(&self, status: bool, reason: ReasonCode) -> String {
        format!(
            "{}/committed/status={}/reason={}/",
            self.prefix,
            status_token(status),
            reason.as_str()
        )
    }

    /// Key of the unprocessed marker for `item_id`.
    pub fn unprocessed_key(&self, item_id: &str) -> Result<String, KeyError> {
        validate_item_id(item_id)?;
        Ok(format!("{}{}", self.unprocessed_prefix(), item_id))
    }

    /// Key of the committed marker for `item_id` with the given outcome.
    pub fn committed_key(
        &self,
        item_id: &str,
        status: bool,
        reason: ReasonCode,
    ) -> Result<String, KeyError> {
        validate_item_id(item_id)?;
        Ok(format!("{}{}", self.reason_prefix(status, reason), item_id))
    }

    /// Key of the marker encoding `state` for `item_id`.
    pub fn encode(&self, item_id: &str, state: ItemState) -> Result<String, KeyError> {
        match state {
            ItemState::Unprocessed => self.unprocessed_key(item_id),
            ItemState::Committed { status, reason } => {
                self.committed_key(item_id, status, reason)
            }
        }
    }

    /// Parse a key back into `(item_id, state)`.
    ///
    /// Fails with [`KeyError::Malformed`] for anything that does not match
    /// one of the two templates, including foreign objects placed under
    /// the prefix.
    pub fn decode(&self, key: &str) -> Result<(String, ItemState), KeyError> {
        let malformed = || KeyError::Malformed(key.to_string());

        let rest = key
            .strip_prefix(&self.prefix)
            .and_then(|r| r.strip_prefix('/'))
            .ok_or_else(malformed)?;

        if let Some(item_id) = rest.strip_prefix("unprocessed/") {
            if item_id.is_empty() || item_id.contains('/') {
                return Err(malformed());
            }
            return Ok((item_id.to_string(), ItemState::Unprocessed));
        }

        let rest = rest.strip_prefix("committed/").ok_or_else(malformed)?;
        let mut segments = rest.split('/');

        let status = segments
            .next()
            .and_then(|s| s.strip_prefix("status="))
            .and_then(parse_status_token)
            .ok_or_else(malformed)?;

        let reason = segments
            .next()
            .and_then(|s| s.strip_prefix("reason="))
            .and_then(|token| ReasonCode::parse(token).ok())
            .ok_or_else(malformed)?;

        let item_id = segments.next().filter(|s| !s.is_empty()).ok_or_else(malformed)?;
        if segments.next().is_some() {
            return Err(malformed());
        }

        Ok((item_id.to_string(), ItemState::Committed { status, reason }))
    }
}

fn status_token(status: bool) -> &'static str {
    if status {
        "true"
    } else {
        "false"
    }
}

fn parse_status_token(token: &str) -> Option<bool> {
    match token {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn validate_item_id(item_id: &str) -> Result<(), KeyError> {
    if item_id.is_empty() || item_id.contains('/') {
        return Err(KeyError::InvalidItemId(item_id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> KeyCodec {
        KeyCodec::new("collections")
    }

    #[test]
    fn test_unprocessed_round_trip() {
        let key = codec().unprocessed_key("C123-PROV").unwrap();
        assert_eq!(key, "collections/unprocessed/C123-PROV");

        let (id, state) = codec().decode(&key).unwrap();
        assert_eq!(id, "C123-PROV");
        assert_eq!(state, ItemState::Unprocessed);
    }

    #[test]
    fn test_committed_round_trip() {
        let key = codec()
            .committed_key("C42", false, ReasonCode::UnsupportedFormat)
            .unwrap();
        assert_eq!(
            key,
            "collections/committed/status=false/reason=unsupported_format/C42"
        );

        let (id, state) = codec().decode(&key).unwrap();
        assert_eq!(id, "C42");
        assert_eq!(
            state,
            ItemState::Committed {
                status: false,
                reason: ReasonCode::UnsupportedFormat
            }
        );
    }

    #[test]
    fn test_success_key_uses_reason_none() {
        let key = codec().committed_key("C1", true, ReasonCode::None).unwrap();
        assert_eq!(key, "collections/committed/status=true/reason=none/C1");
    }

    #[test]
    fn test_trailing_slash_in_prefix_is_stripped() {
        let codec = KeyCodec::new("collections/");
        assert_eq!(
            codec.unprocessed_key("C1").unwrap(),
            "collections/unprocessed/C1"
        );
    }

    #[test]
    fn test_decode_rejects_foreign_keys() {
        for key in [
            "collections/other/C1",
            "collections/committed/status=maybe/reason=none/C1",
            "collections/committed/status=true/reason=bogus_reason/C1",
            "collections/committed/status=true/C1",
            "collections/committed/status=true/reason=none/",
            "collections/committed/status=true/reason=none/C1/extra",
            "elsewhere/unprocessed/C1",
            "collections/unprocessed/",
        ] {
            assert!(
                matches!(codec().decode(key), Err(KeyError::Malformed(_))),
                "expected malformed: {key}"
            );
        }
    }

    #[test]
    fn test_invalid_item_ids_rejected() {
        assert!(matches!(
            codec().unprocessed_key(""),
            Err(KeyError::InvalidItemId(_))
        ));
        assert!(matches!(
            codec().committed_key("a/b", true, ReasonCode::None),
            Err(KeyError::InvalidItemId(_))
        ));
    }

    #[test]
    fn test_distinct_states_encode_to_distinct_keys() {
        let c = codec();
        let keys = [
            c.encode("C1", ItemState::Unprocessed).unwrap(),
            c.encode(
                "C1",
                ItemState::Committed {
                    status: true,
                    reason: ReasonCode::None,
                },
            )
            .unwrap(),
            c.encode(
                "C1",
                ItemState::Committed {
                    status: false,
                    reason: ReasonCode::Timeout,
                },
            )
            .unwrap(),
        ];
        for (i, a) in keys.iter().enumerate() {
            for b in keys.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_filter_matches() {
        let filter = OutcomeFilter::new()
            .with_status(false)
            .with_reason(ReasonCode::Timeout);
        assert!(filter.matches(false, ReasonCode::Timeout));
        assert!(!filter.matches(false, ReasonCode::CantOpenFile));
        assert!(!filter.matches(true, ReasonCode::Timeout));

        let all = OutcomeFilter::new();
        assert!(all.matches(true, ReasonCode::None));
        assert!(all.matches(false, ReasonCode::Timeout));
    }
}
