use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;
use stowage_core::StorageBackend;
use stowage_storage::{
    BlobStore, BlockToken, BlockUpload, MemoryStorage, StorageError, StorageResult, StoredObject,
};

/// Every store call seen so far, by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Calls {
    pub puts: Vec<String>,
    pub stages: Vec<(String, usize)>,
    pub commits: Vec<String>,
    pub deletes: Vec<String>,
}

impl Calls {
    /// Puts plus commits: the number of objects written.
    pub fn stored(&self) -> usize {
        self.puts.len() + self.commits.len()
    }

    pub fn stages_for(&self, key: &str) -> usize {
        self.stages.iter().filter(|(k, _)| k == key).count()
    }
}

/// Memory store that records calls and can be told to fail or stall.
pub struct RecordingStore {
    inner: MemoryStorage,
    calls: Mutex<Calls>,
    failing_puts: HashSet<String>,
    failing_deletes: HashSet<String>,
    stage_delay: Option<Duration>,
}

impl RecordingStore {
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: MemoryStorage::new(base_url),
            calls: Mutex::new(Calls::default()),
            failing_puts: HashSet::new(),
            failing_deletes: HashSet::new(),
            stage_delay: None,
        }
    }

    /// Reject direct puts and commits for `key` with a transport error.
    pub fn failing_put(mut self, key: &str) -> Self {
        self.failing_puts.insert(key.to_string());
        self
    }

    /// Reject deletes of `key` with a transport error.
    pub fn failing_delete(mut self, key: &str) -> Self {
        self.failing_deletes.insert(key.to_string());
        self
    }

    /// Sleep this long in every block stage.
    pub fn stalling_stages(mut self, delay: Duration) -> Self {
        self.stage_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Calls {
        self.calls.lock().unwrap().clone()
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.inner.object(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }

    /// Seed an object without recording a call.
    pub async fn seed(&self, key: &str, data: &[u8], content_type: &str) {
        self.inner
            .put_object(key, Bytes::copy_from_slice(data), content_type)
            .await
            .unwrap();
    }
}

#[async_trait]
impl BlobStore for RecordingStore {
    fn base_url(&self) -> &str {
        self.inner.base_url()
    }

    async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        self.calls.lock().unwrap().puts.push(key.to_string());
        if self.failing_puts.contains(key) {
            return Err(StorageError::UploadFailed(format!("503 Slow Down: {}", key)));
        }
        self.inner.put_object(key, data, content_type).await
    }

    async fn begin_block_upload(
        &self,
        key: &str,
        content_type: &str,
    ) -> StorageResult<BlockUpload> {
        self.inner.begin_block_upload(key, content_type).await
    }

    async fn stage_block(
        &self,
        upload: &BlockUpload,
        index: usize,
        data: Bytes,
    ) -> StorageResult<BlockToken> {
        if let Some(delay) = self.stage_delay {
            tokio::time::sleep(delay).await;
        }
        self.calls
            .lock()
            .unwrap()
            .stages
            .push((upload.key.clone(), index));
        self.inner.stage_block(upload, index, data).await
    }

    async fn commit_blocks(
        &self,
        upload: &BlockUpload,
        blocks: Vec<BlockToken>,
        content_type: &str,
    ) -> StorageResult<()> {
        self.calls.lock().unwrap().commits.push(upload.key.clone());
        if self.failing_puts.contains(&upload.key) {
            return Err(StorageError::UploadFailed(format!(
                "503 Slow Down: {}",
                upload.key
            )));
        }
        self.inner.commit_blocks(upload, blocks, content_type).await
    }

    fn release_block_upload(&self, upload: &BlockUpload) {
        self.inner.release_block_upload(upload)
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.calls.lock().unwrap().deletes.push(key.to_string());
        if self.failing_deletes.contains(key) {
            return Err(StorageError::DeleteFailed(format!("500 Internal Error: {}", key)));
        }
        self.inner.delete_object(key).await
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(key).await
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
