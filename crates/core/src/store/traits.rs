//! Trait definition for the object-store seam.

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested key does not exist.
    #[error("object not found: {0}")]
    NotFound(String),

    /// A single transport-level failure (connection reset, throttle,
    /// 5xx). Retryable; callers normally never see this because the
    /// implementations retry internally and surface [`StoreError::Unavailable`]
    /// instead.
    #[error("store transport error: {0}")]
    Transport(String),

    /// Transport retries were exhausted. The only error class the layers
    /// above handle specially: it aborts the batch operation in progress,
    /// since nothing can make progress without the store.
    #[error("store unavailable after {attempts} attempts: {message}")]
    Unavailable { attempts: u32, message: String },
}

impl StoreError {
    /// Whether retrying the operation could help.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transport(_))
    }
}

/// A lazy, finite sequence of keys. Pagination happens inside the store
/// implementation; callers never see continuation tokens.
pub type KeyStream<'a> = BoxStream<'a, Result<String, StoreError>>;

/// The four object-store primitives the rest of the system is built on.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Name of this store implementation, for logs.
    fn name(&self) -> &str;

    /// Lazily list every key under `prefix`.
    fn list_keys(&self, prefix: &str) -> KeyStream<'_>;

    /// Write an object, overwriting any existing one at `key`.
    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<(), StoreError>;

    /// Read an object's body. Fails with [`StoreError::NotFound`] if absent.
    async fn get_object(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Delete an object. Deleting an absent key is a no-op, not an error,
    /// so deletes stay idempotent under retry.
    async fn delete_object(&self, key: &str) -> Result<(), StoreError>;
}
