use serde::Serialize;
use thiserror::Error;

use crate::keyspace::KeyError;
use crate::store::StoreError;

/// Errors from lifecycle transitions.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A successful outcome must carry reason `none`; anything else is a
    /// contradiction the key space cannot represent.
    #[error("invalid reason code for item {item_id}: status=true with reason={reason}")]
    InvalidReasonCode { item_id: String, reason: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("key error: {0}")]
    Key(#[from] KeyError),

    #[error("outcome serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// What an enroll pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnrollReport {
    /// Items newly given an unprocessed marker.
    pub enrolled: u64,
    /// Items skipped because a marker for them already existed, in any
    /// lifecycle state.
    pub already_present: u64,
}
