//! S3-backed object store implementation.

use async_trait::async_trait;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use futures::stream::try_unfold;
use std::collections::VecDeque;

use crate::config::StoreConfig;

use super::retry::{with_retry, RetryPolicy};
use super::traits::{KeyStream, ObjectStore, StoreError};

/// Object store over an S3 (or S3-compatible) bucket.
///
/// The underlying client is cheap to clone and safe for concurrent use;
/// one `S3ObjectStore` is shared across all worker tasks.
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    retry: RetryPolicy,
}

/// Pagination state for the lazy key listing.
struct ListState {
    continuation: Option<String>,
    buffered: VecDeque<String>,
    done: bool,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            retry,
        }
    }

    /// Build a store from configuration, resolving credentials and region
    /// from the ambient AWS environment. A custom `endpoint` (MinIO,
    /// localstack) switches to path-style addressing.
    pub async fn connect(config: &StoreConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self::new(
            Client::from_conf(builder.build()),
            config.bucket.clone(),
            config.retry.clone(),
        )
    }

    async fn fetch_page(
        &self,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<(VecDeque<String>, Option<String>), StoreError> {
        let page = with_retry(&self.retry, "list_objects_v2", || {
            let continuation = continuation.clone();
            async move {
                let mut request = self
                    .client
                    .list_objects_v2()
                    .bucket(&self.bucket)
                    .prefix(prefix);
                if let Some(token) = continuation {
                    request = request.continuation_token(token);
                }
                request
                    .send()
                    .await
                    .map_err(|e| StoreError::Transport(e.to_string()))
            }
        })
        .await?;

        let keys = page
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect();
        let next = page.next_continuation_token().map(str::to_string);
        Ok((keys, next))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn name(&self) -> &str {
        "s3"
    }

    fn list_keys(&self, prefix: &str) -> KeyStream<'_> {
        let prefix = prefix.to_string();
        let state = ListState {
            continuation: None,
            buffered: VecDeque::new(),
            done: false,
        };

        Box::pin(try_unfold(
            (self, prefix, state),
            |(store, prefix, mut state)| async move {
                loop {
                    if let Some(key) = state.buffered.pop_front() {
                        return Ok(Some((key, (store, prefix, state))));
                    }
                    if state.done {
                        return Ok(None);
                    }

                    let (keys, next) = store
                        .fetch_page(&prefix, state.continuation.take())
                        .await?;
                    state.buffered = keys;
                    state.done = next.is_none();
                    state.continuation = next;
                }
            },
        ))
    }

    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        with_retry(&self.retry, "put_object", || {
            let body = body.clone();
            async move {
                self.client
                    .put_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .body(ByteStream::from(body))
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|e| StoreError::Transport(e.to_string()))
            }
        })
        .await
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        with_retry(&self.retry, "get_object", || async move {
            let response = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| match e.as_service_error() {
                    Some(GetObjectError::NoSuchKey(_)) => StoreError::NotFound(key.to_string()),
                    _ => StoreError::Transport(e.to_string()),
                })?;

            let bytes = response
                .body
                .collect()
                .await
                .map_err(|e| StoreError::Transport(e.to_string()))?;
            Ok(bytes.into_bytes().to_vec())
        })
        .await
    }

    async fn delete_object(&self, key: &str) -> Result<(), StoreError> {
        // S3 deletes are already idempotent: deleting an absent key
        // succeeds, which is exactly the contract callers rely on.
        with_retry(&self.retry, "delete_object", || async move {
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .map(|_| ())
                .map_err(|e| StoreError::Transport(e.to_string()))
        })
        .await
    }
}
