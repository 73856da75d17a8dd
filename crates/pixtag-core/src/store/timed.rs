use std::{future::Future, time::Duration};

use async_trait::async_trait;
use pixtag_model::{JobId, Metadata, TimeoutMs};

use crate::store::{ContentStore, StoreError, StoreResult, StoredFile};

/// Wraps a store so that every call fails with [`StoreError::Timeout`] after a fixed deadline.
pub struct TimedStore<S> {
    inner: S,
    timeout_ms: TimeoutMs,
}

impl<S: ContentStore> TimedStore<S> {
    pub fn new(inner: S, timeout_ms: TimeoutMs) -> Self {
        Self { inner, timeout_ms }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match tokio::time::timeout(Duration::from_millis(self.timeout_ms), fut).await {
            Ok(res) => res,
            Err(_) => Err(StoreError::Timeout {
                op,
                timeout_ms: self.timeout_ms,
            }),
        }
    }
}

#[async_trait]
impl<S: ContentStore> ContentStore for TimedStore<S> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn ping(&self) -> StoreResult<()> {
        self.bounded("ping", self.inner.ping()).await
    }

    async fn describe(&self, id: &JobId) -> StoreResult<StoredFile> {
        self.bounded("describe", self.inner.describe(id)).await
    }

    async fn get(&self, id: &JobId) -> StoreResult<Vec<u8>> {
        self.bounded("get", self.inner.get(id)).await
    }

    async fn put(&self, id: &JobId, filename: &str, bytes: Vec<u8>) -> StoreResult<()> {
        self.bounded("put", self.inner.put(id, filename, bytes)).await
    }

    async fn delete(&self, id: &JobId) -> StoreResult<()> {
        self.bounded("delete", self.inner.delete(id)).await
    }

    async fn write_metadata(&self, id: &JobId, metadata: &Metadata) -> StoreResult<()> {
        self.bounded("write_metadata", self.inner.write_metadata(id, metadata))
            .await
    }

    async fn merge_metadata(&self, id: &JobId, fragment: &Metadata) -> StoreResult<()> {
        self.bounded("merge_metadata", self.inner.merge_metadata(id, fragment))
            .await
    }

    /// One deadline covers the whole delete-then-put. A timeout after the delete leaves the id
    /// empty, and later deliveries of that job fail with `NotFound`.
    async fn replace(&self, id: &JobId, bytes: Vec<u8>) -> StoreResult<()> {
        self.bounded("replace", self.inner.replace(id, bytes)).await
    }
}
