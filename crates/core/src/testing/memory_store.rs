//! In-memory object store for testing.

use async_trait::async_trait;
use futures::stream::TryStreamExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::store::{KeyStream, ObjectStore, StoreError};

/// In-memory implementation of the ObjectStore trait.
///
/// Provides controllable behavior for testing:
/// - Keys list in lexicographic order, like a real bucket
/// - Inspect the key space directly for assertions
/// - Inject errors into the next operation
/// - Simulate listings that repeat keys across page boundaries
#[derive(Debug)]
pub struct InMemoryObjectStore {
    objects: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<StoreError>>>,
    /// When true, listings yield every key twice.
    duplicate_listings: Arc<RwLock<bool>>,
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryObjectStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            objects: Arc::new(RwLock::new(BTreeMap::new())),
            next_error: Arc::new(RwLock::new(None)),
            duplicate_listings: Arc::new(RwLock::new(false)),
        }
    }

    /// Write an object directly, bypassing error injection. Useful for
    /// seeding foreign or corrupt keys.
    pub async fn put_raw(&self, key: &str, body: Vec<u8>) {
        self.objects.write().await.insert(key.to_string(), body);
    }

    /// Whether a key currently exists.
    pub async fn contains_key(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(key)
    }

    /// Read an object's body directly, bypassing error injection.
    pub async fn get_body(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(key).cloned()
    }

    /// Total number of objects.
    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }

    /// All keys under `prefix`, sorted.
    pub async fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.objects
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: StoreError) {
        *self.next_error.write().await = Some(error);
    }

    /// Clear any pending error.
    pub async fn clear_next_error(&self) {
        *self.next_error.write().await = None;
    }

    /// Make listings yield every key twice, as a restarted pagination
    /// would.
    pub async fn set_duplicate_listings(&self, duplicate: bool) {
        *self.duplicate_listings.write().await = duplicate;
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<StoreError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn list_keys(&self, prefix: &str) -> KeyStream<'_> {
        let prefix = prefix.to_string();
        Box::pin(
            futures::stream::once(async move {
                if let Some(err) = self.take_error().await {
                    return Err(err);
                }
                let duplicate = *self.duplicate_listings.read().await;
                let mut keys: Vec<String> = self
                    .objects
                    .read()
                    .await
                    .keys()
                    .filter(|k| k.starts_with(&prefix))
                    .cloned()
                    .collect();
                if duplicate {
                    keys = keys.into_iter().flat_map(|k| [k.clone(), k]).collect();
                }
                Ok(keys)
            })
            .map_ok(|keys| futures::stream::iter(keys.into_iter().map(Ok)))
            .try_flatten(),
        )
    }

    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.objects.write().await.insert(key.to_string(), body);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn delete_object(&self, key: &str) -> Result<(), StoreError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        // Absent keys delete cleanly, matching the S3 contract.
        self.objects.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = InMemoryObjectStore::new();
        store.put_object("a/b", b"body".to_vec()).await.unwrap();
        assert_eq!(store.get_object("a/b").await.unwrap(), b"body");

        store.delete_object("a/b").await.unwrap();
        assert!(matches!(
            store.get_object("a/b").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_absent_key_is_ok() {
        let store = InMemoryObjectStore::new();
        store.delete_object("missing").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_keys_filters_by_prefix_in_order() {
        let store = InMemoryObjectStore::new();
        store.put_raw("a/2", Vec::new()).await;
        store.put_raw("a/1", Vec::new()).await;
        store.put_raw("b/1", Vec::new()).await;

        let keys: Vec<String> = store.list_keys("a/").try_collect().await.unwrap();
        assert_eq!(keys, vec!["a/1", "a/2"]);
    }

    #[tokio::test]
    async fn test_error_injection_is_single_shot() {
        let store = InMemoryObjectStore::new();
        store
            .set_next_error(StoreError::Transport("reset".to_string()))
            .await;

        assert!(store.put_object("k", Vec::new()).await.is_err());
        assert!(store.put_object("k", Vec::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_listings() {
        let store = InMemoryObjectStore::new();
        store.put_raw("a/1", Vec::new()).await;
        store.set_duplicate_listings(true).await;

        let keys: Vec<String> = store.list_keys("a/").try_collect().await.unwrap();
        assert_eq!(keys, vec!["a/1", "a/1"]);
    }
}
