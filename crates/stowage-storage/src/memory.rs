use crate::traits::{BlobStore, BlockToken, BlockUpload, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// An object held by [`MemoryStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
}

#[derive(Default)]
struct MemoryState {
    objects: HashMap<String, StoredObject>,
    staged: HashMap<String, StagedUpload>,
}

struct StagedUpload {
    key: String,
    blocks: HashMap<String, Bytes>,
}

/// In-process storage backend.
///
/// Objects live in a shared map, so clones of a `MemoryStorage` see the same contents. Useful
/// for development and for tests that need to inspect what was written.
#[derive(Clone)]
pub struct MemoryStorage {
    base_url: String,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            state: Arc::new(Mutex::new(MemoryState::default())),
        }
    }

    fn state(&self) -> StorageResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| StorageError::BackendError("memory store lock poisoned".to_string()))
    }

    /// Snapshot of the object stored at `key`.
    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.state().ok()?.objects.get(key).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.state().map(|s| s.objects.len()).unwrap_or(0)
    }

    /// Sorted keys of every stored object.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .state()
            .map(|s| s.objects.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Number of staged uploads that were neither committed nor released.
    pub fn staged_upload_count(&self) -> usize {
        self.state().map(|s| s.staged.len()).unwrap_or(0)
    }
}

#[async_trait]
impl BlobStore for MemoryStorage {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        let size = data.len();
        self.state()?.objects.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );

        tracing::debug!(key = %key, size_bytes = size, "Memory storage upload successful");
        Ok(())
    }

    async fn begin_block_upload(
        &self,
        key: &str,
        _content_type: &str,
    ) -> StorageResult<BlockUpload> {
        let upload = BlockUpload {
            key: key.to_string(),
            upload_id: Uuid::new_v4().to_string(),
        };
        self.state()?.staged.insert(
            upload.upload_id.clone(),
            StagedUpload {
                key: key.to_string(),
                blocks: HashMap::new(),
            },
        );
        Ok(upload)
    }

    async fn stage_block(
        &self,
        upload: &BlockUpload,
        index: usize,
        data: Bytes,
    ) -> StorageResult<BlockToken> {
        let mut state = self.state()?;
        let staged = state.staged.get_mut(&upload.upload_id).ok_or_else(|| {
            StorageError::UploadFailed(format!("unknown staged upload {}", upload.upload_id))
        })?;

        let id = format!("block-{:06}", index);
        let size = data.len();
        staged.blocks.insert(id.clone(), data);

        Ok(BlockToken { index, id, size })
    }

    async fn commit_blocks(
        &self,
        upload: &BlockUpload,
        blocks: Vec<BlockToken>,
        content_type: &str,
    ) -> StorageResult<()> {
        let mut state = self.state()?;
        let staged = state.staged.remove(&upload.upload_id).ok_or_else(|| {
            StorageError::UploadFailed(format!("unknown staged upload {}", upload.upload_id))
        })?;

        let total: usize = blocks.iter().map(|b| b.size).sum();
        let mut data = BytesMut::with_capacity(total);
        for token in &blocks {
            let block = staged.blocks.get(&token.id).ok_or_else(|| {
                StorageError::UploadFailed(format!(
                    "block {} was never staged for {}",
                    token.id, staged.key
                ))
            })?;
            data.extend_from_slice(block);
        }

        state.objects.insert(
            staged.key,
            StoredObject {
                data: data.freeze(),
                content_type: content_type.to_string(),
            },
        );

        tracing::debug!(
            key = %upload.key,
            size_bytes = total,
            blocks = blocks.len(),
            "Memory storage commit successful"
        );
        Ok(())
    }

    fn release_block_upload(&self, upload: &BlockUpload) {
        if let Ok(mut state) = self.state() {
            state.staged.remove(&upload.upload_id);
        }
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        match self.state()?.objects.remove(key) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(key.to_string())),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.state()?.objects.contains_key(key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

#[cfg(all(test, feature = "storage-memory"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_delete() {
        let storage = MemoryStorage::new("memory://test/");
        assert_eq!(storage.base_url(), "memory://test");

        storage
            .put_object("a.txt", Bytes::from_static(b"hello"), "text/plain")
            .await
            .unwrap();
        assert!(storage.exists("a.txt").await.unwrap());
        assert_eq!(
            storage.object("a.txt"),
            Some(StoredObject {
                data: Bytes::from_static(b"hello"),
                content_type: "text/plain".to_string(),
            })
        );

        storage.delete_object("a.txt").await.unwrap();
        assert!(matches!(
            storage.delete_object("a.txt").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_commit_follows_manifest_order() {
        let storage = MemoryStorage::new("memory://test");
        let upload = storage.begin_block_upload("big.bin", "x/y").await.unwrap();

        let second = storage
            .stage_block(&upload, 1, Bytes::from_static(b"world"))
            .await
            .unwrap();
        let first = storage
            .stage_block(&upload, 0, Bytes::from_static(b"hello "))
            .await
            .unwrap();
        assert!(!storage.exists("big.bin").await.unwrap());

        storage
            .commit_blocks(&upload, vec![first, second], "x/y")
            .await
            .unwrap();

        let object = storage.object("big.bin").unwrap();
        assert_eq!(object.data, Bytes::from_static(b"hello world"));
        assert_eq!(object.content_type, "x/y");
        assert_eq!(storage.staged_upload_count(), 0);
    }

    #[tokio::test]
    async fn test_release_discards_staged_blocks() {
        let storage = MemoryStorage::new("memory://test");
        let upload = storage.begin_block_upload("gone.bin", "x/y").await.unwrap();
        let token = storage
            .stage_block(&upload, 0, Bytes::from_static(b"data"))
            .await
            .unwrap();

        storage.release_block_upload(&upload);

        assert_eq!(storage.staged_upload_count(), 0);
        assert!(storage.commit_blocks(&upload, vec![token], "x/y").await.is_err());
        assert_eq!(storage.object_count(), 0);
    }
}
