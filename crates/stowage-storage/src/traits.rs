//! Storage abstraction trait
//!
//! This module defines the BlobStore trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use stowage_core::ProviderError;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Upload timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for ProviderError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => ProviderError::NotFound(key),
            StorageError::Timeout(budget) => ProviderError::Timeout(budget),
            StorageError::ConfigError(msg) => ProviderError::Config(msg),
            other => ProviderError::Transport(other.to_string()),
        }
    }
}

/// Handle for a staged (block) upload in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockUpload {
    pub key: String,
    pub upload_id: String,
}

/// Receipt for one staged block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockToken {
    /// Position of the block in the source payload, starting at 0.
    pub index: usize,
    /// Backend-specific identifier of the staged block.
    pub id: String,
    pub size: usize,
}

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem, memory) implement this trait. The provider only
/// ever talks to the store through it, which keeps vendor plumbing (credentials, endpoints,
/// request signing) out of the upload and delete pipeline.
///
/// Large payloads are written in two phases: blocks are staged independently with
/// [`stage_block`](BlobStore::stage_block), possibly concurrently and in any order, then
/// [`commit_blocks`](BlobStore::commit_blocks) assembles them in the order of the manifest it
/// is given. Nothing is readable at the key before the commit succeeds.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Prefix of every public object URL, without a trailing slash.
    fn base_url(&self) -> &str;

    /// Store `data` at `key` in a single request.
    async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()>;

    /// Open a staged upload for `key`.
    async fn begin_block_upload(&self, key: &str, content_type: &str)
        -> StorageResult<BlockUpload>;

    /// Stage block number `index` of an open upload.
    async fn stage_block(
        &self,
        upload: &BlockUpload,
        index: usize,
        data: Bytes,
    ) -> StorageResult<BlockToken>;

    /// Assemble staged blocks into the object, in the order of `blocks`.
    async fn commit_blocks(
        &self,
        upload: &BlockUpload,
        blocks: Vec<BlockToken>,
        content_type: &str,
    ) -> StorageResult<()>;

    /// Forget a staged upload that will never be committed.
    ///
    /// Called after a failed or timed-out transfer. Blocks already staged remotely are not
    /// deleted; reclaiming them is the store's own garbage collection.
    fn release_block_upload(&self, upload: &BlockUpload);

    /// Delete the object at `key`. Returns `NotFound` when there is nothing to delete.
    async fn delete_object(&self, key: &str) -> StorageResult<()>;

    /// Check if an object exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
