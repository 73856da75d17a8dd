//! Content store abstraction.
//!
//! A store addresses image blobs by [`JobId`] and keeps one metadata record per blob.
//! Backends (GridFS, in-memory) implement [`ContentStore`]; [`TimedStore`] bounds every call.
#[cfg(any(test, feature = "testing"))]
mod memory;
#[cfg(any(test, feature = "testing"))]
pub use memory::{MemoryStore, StoreOps};

mod timed;
pub use timed::TimedStore;

use std::sync::Arc;

use async_trait::async_trait;
use pixtag_model::{JobId, Metadata};

pub use crate::error::{StoreError, StoreResult};

/// Stored blob description without its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub filename: String,
    pub length: u64,
    /// `None` when the record carries no metadata field yet.
    pub metadata: Option<Metadata>,
}

/// Blob store with a metadata record per id.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Backend name used in logs.
    fn name(&self) -> &'static str;

    /// Cheap reachability check used at startup.
    async fn ping(&self) -> StoreResult<()>;

    /// Describe the record; [`StoreError::NotFound`] when the id is absent.
    async fn describe(&self, id: &JobId) -> StoreResult<StoredFile>;

    /// Full payload of the blob.
    async fn get(&self, id: &JobId) -> StoreResult<Vec<u8>>;

    /// Store `bytes` under `id`. Fails if the id already exists.
    async fn put(&self, id: &JobId, filename: &str, bytes: Vec<u8>) -> StoreResult<()>;

    /// Remove the blob and its record.
    async fn delete(&self, id: &JobId) -> StoreResult<()>;

    /// Overwrite the metadata field of an existing record.
    async fn write_metadata(&self, id: &JobId, metadata: &Metadata) -> StoreResult<()>;

    /// Merge `fragment` into the stored record; keys outside the fragment keep their stored value.
    async fn merge_metadata(&self, id: &JobId, fragment: &Metadata) -> StoreResult<()> {
        let current = self.metadata(id).await?;
        self.write_metadata(id, &current.merged(fragment)).await
    }

    /// Current metadata, empty when the record has none.
    async fn metadata(&self, id: &JobId) -> StoreResult<Metadata> {
        Ok(self.describe(id).await?.metadata.unwrap_or_default())
    }

    /// Replace the payload under the same id, keeping file name and metadata.
    ///
    /// Delete-then-put: a crash between the two leaves the id empty.
    async fn replace(&self, id: &JobId, bytes: Vec<u8>) -> StoreResult<()> {
        let current = self.describe(id).await?;
        self.delete(id).await?;
        self.put(id, &current.filename, bytes).await?;
        if let Some(metadata) = current.metadata {
            self.write_metadata(id, &metadata).await?;
        }
        Ok(())
    }
}

/// Shared handle to a store backend.
pub type StoreHandle = Arc<dyn ContentStore>;
