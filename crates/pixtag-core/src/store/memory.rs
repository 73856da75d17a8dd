use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use pixtag_model::{JobId, Metadata};

use crate::store::{ContentStore, StoreError, StoreResult, StoredFile};

#[derive(Debug, Clone)]
struct Entry {
    filename: String,
    bytes: Vec<u8>,
    metadata: Option<Metadata>,
}

/// Counters of mutating calls, for assertions in tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOps {
    pub puts: usize,
    pub deletes: usize,
    pub metadata_writes: usize,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<JobId, Entry>,
    ops: StoreOps,
}

/// Process-local [`ContentStore`].
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a blob without touching the op counters.
    pub fn insert(&self, id: JobId, filename: impl Into<String>, bytes: Vec<u8>) {
        self.lock().entries.insert(
            id,
            Entry {
                filename: filename.into(),
                bytes,
                metadata: None,
            },
        );
    }

    /// Seed a metadata record without touching the op counters.
    pub fn seed_metadata(&self, id: &JobId, metadata: Metadata) {
        if let Some(entry) = self.lock().entries.get_mut(id) {
            entry.metadata = Some(metadata);
        }
    }

    pub fn bytes(&self, id: &JobId) -> Option<Vec<u8>> {
        self.lock().entries.get(id).map(|e| e.bytes.clone())
    }

    pub fn stored_metadata(&self, id: &JobId) -> Option<Metadata> {
        self.lock().entries.get(id).and_then(|e| e.metadata.clone())
    }

    pub fn ops(&self) -> StoreOps {
        self.lock().ops
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn describe(&self, id: &JobId) -> StoreResult<StoredFile> {
        let inner = self.lock();
        let entry = inner
            .entries
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(StoredFile {
            filename: entry.filename.clone(),
            length: entry.bytes.len() as u64,
            metadata: entry.metadata.clone(),
        })
    }

    async fn get(&self, id: &JobId) -> StoreResult<Vec<u8>> {
        self.bytes(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn put(&self, id: &JobId, filename: &str, bytes: Vec<u8>) -> StoreResult<()> {
        let mut inner = self.lock();
        if inner.entries.contains_key(id) {
            return Err(StoreError::Backend(format!("duplicate id {id}")));
        }
        inner.entries.insert(
            id.clone(),
            Entry {
                filename: filename.to_string(),
                bytes,
                metadata: None,
            },
        );
        inner.ops.puts += 1;
        Ok(())
    }

    async fn delete(&self, id: &JobId) -> StoreResult<()> {
        let mut inner = self.lock();
        inner
            .entries
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        inner.ops.deletes += 1;
        Ok(())
    }

    async fn write_metadata(&self, id: &JobId, metadata: &Metadata) -> StoreResult<()> {
        let mut inner = self.lock();
        let entry = inner
            .entries
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        entry.metadata = Some(metadata.clone());
        inner.ops.metadata_writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> JobId {
        "65f1c2a9e4b0a1b2c3d4e5f6".parse().unwrap()
    }

    #[tokio::test]
    async fn missing_record_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.get(&id()).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.metadata(&id()).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn absent_metadata_reads_as_empty() {
        let store = MemoryStore::new();
        store.insert(id(), "dog.jpg", vec![0]);
        assert!(store.metadata(&id()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn replace_keeps_filename_and_metadata() {
        let store = MemoryStore::new();
        store.insert(id(), "dog.jpg", vec![1, 1, 1]);
        let mut md = Metadata::new();
        md.insert("owner", "alice");
        store.seed_metadata(&id(), md.clone());

        store.replace(&id(), vec![2, 2]).await.unwrap();

        let file = store.describe(&id()).await.unwrap();
        assert_eq!(file.filename, "dog.jpg");
        assert_eq!(file.length, 2);
        assert_eq!(file.metadata, Some(md));
        assert_eq!(
            store.ops(),
            StoreOps {
                puts: 1,
                deletes: 1,
                metadata_writes: 1
            }
        );
    }
}
