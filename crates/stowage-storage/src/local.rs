use crate::traits::{BlobStore, BlockToken, BlockUpload, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Directory under the storage root that holds staged blocks, one subdirectory per upload.
const STAGING_DIR: &str = ".staging";

/// Local filesystem storage implementation
///
/// Content types are not persisted; whatever serves `base_url` decides them.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/stowage/files")
    /// * `base_url` - Base URL for serving files (e.g., "http://localhost:3000/files")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Convert storage key to filesystem path, rejecting keys that could escape the base
    /// directory or collide with the staging area.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.is_empty()
            || storage_key.contains("..")
            || storage_key.starts_with('/')
            || storage_key.starts_with(STAGING_DIR)
        {
            return Err(StorageError::InvalidKey(format!(
                "Storage key {:?} contains invalid characters",
                storage_key
            )));
        }

        let path = self.base_path.join(storage_key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    fn staging_dir(&self, upload_id: &str) -> PathBuf {
        self.base_path.join(STAGING_DIR).join(upload_id)
    }

    fn block_path(&self, upload: &BlockUpload, block_id: &str) -> PathBuf {
        self.staging_dir(&upload.upload_id).join(block_id)
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn write_synced(path: &Path, data: &[u8]) -> StorageResult<()> {
        let mut file = fs::File::create(path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        Ok(())
    }

    async fn assemble(
        &self,
        upload: &BlockUpload,
        blocks: &[BlockToken],
        path: &Path,
    ) -> StorageResult<u64> {
        let temp = TempFile::beside(path);
        let concatenated = self.concat_blocks(upload, blocks, temp.path()).await;
        match concatenated {
            Ok(written) => {
                temp.persist(path).await?;
                Ok(written)
            }
            Err(e) => {
                temp.discard().await;
                Err(e)
            }
        }
    }

    async fn concat_blocks(
        &self,
        upload: &BlockUpload,
        blocks: &[BlockToken],
        temp_path: &Path,
    ) -> StorageResult<u64> {
        let mut file = fs::File::create(temp_path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to create file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        let mut written = 0u64;
        for token in blocks {
            let block_path = self.block_path(upload, &token.id);
            let mut block = fs::File::open(&block_path).await.map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Block {} of {} is not staged: {}",
                    token.id, upload.key, e
                ))
            })?;
            written += tokio::io::copy(&mut block, &mut file).await?;
        }

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to sync file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        Ok(written)
    }
}

/// Sibling temp file for an object being written. Unless it is persisted, the file is removed:
/// explicitly on error, or in the background when the owning future is dropped mid-write.
struct TempFile {
    path: PathBuf,
    settled: bool,
}

impl TempFile {
    /// Same directory as `target`, so the final rename stays on one filesystem.
    fn beside(target: &Path) -> Self {
        let mut name = target
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}.tmp", Uuid::new_v4()));
        Self {
            path: target.with_file_name(name),
            settled: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically move the file to `target`.
    async fn persist(mut self, target: &Path) -> StorageResult<()> {
        match fs::rename(&self.path, target).await {
            Ok(()) => {
                self.settled = true;
                Ok(())
            }
            Err(e) => {
                self.discard().await;
                Err(StorageError::UploadFailed(format!(
                    "Failed to move {} into place: {}",
                    target.display(),
                    e
                )))
            }
        }
    }

    async fn discard(mut self) {
        let _ = fs::remove_file(&self.path).await;
        self.settled = true;
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if !self.settled {
            let path = std::mem::take(&mut self.path);
            remove_in_background(move || {
                let _ = std::fs::remove_file(path);
            });
        }
    }
}

/// Run filesystem cleanup off the async worker threads when a runtime is available.
fn remove_in_background<F>(cleanup: F)
where
    F: FnOnce() + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn_blocking(cleanup);
        }
        Err(_) => cleanup(),
    }
}

#[async_trait]
impl BlobStore for LocalStorage {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn put_object(&self, key: &str, data: Bytes, _content_type: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let temp = TempFile::beside(&path);
        let written = Self::write_synced(temp.path(), &data).await;
        if let Err(e) = written {
            temp.discard().await;
            return Err(e);
        }
        temp.persist(&path).await?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(())
    }

    async fn begin_block_upload(
        &self,
        key: &str,
        _content_type: &str,
    ) -> StorageResult<BlockUpload> {
        self.key_to_path(key)?;

        let upload = BlockUpload {
            key: key.to_string(),
            upload_id: Uuid::new_v4().to_string(),
        };
        fs::create_dir_all(self.staging_dir(&upload.upload_id)).await?;

        Ok(upload)
    }

    async fn stage_block(
        &self,
        upload: &BlockUpload,
        index: usize,
        data: Bytes,
    ) -> StorageResult<BlockToken> {
        let id = format!("{:010}", index);
        let path = self.block_path(upload, &id);

        Self::write_synced(&path, &data).await?;

        Ok(BlockToken {
            index,
            id,
            size: data.len(),
        })
    }

    async fn commit_blocks(
        &self,
        upload: &BlockUpload,
        blocks: Vec<BlockToken>,
        _content_type: &str,
    ) -> StorageResult<()> {
        let path = self.key_to_path(&upload.key)?;
        let start = std::time::Instant::now();

        self.ensure_parent_dir(&path).await?;

        let result = self.assemble(upload, &blocks, &path).await;
        let _ = fs::remove_dir_all(self.staging_dir(&upload.upload_id)).await;
        let size = result?;

        tracing::info!(
            path = %path.display(),
            key = %upload.key,
            size_bytes = size,
            blocks = blocks.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage block commit successful"
        );

        Ok(())
    }

    fn release_block_upload(&self, upload: &BlockUpload) {
        // Best effort; leftovers under .staging are never read.
        let dir = self.staging_dir(&upload.upload_id);
        remove_in_background(move || {
            let _ = std::fs::remove_dir_all(dir);
        });
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(key.to_string()));
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
