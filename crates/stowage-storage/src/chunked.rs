//! Chunked uploader
//!
//! Streams a payload to a [`BlobStore`] in fixed-size blocks. Up to `max_concurrency` block
//! stages are in flight at once; the commit manifest is always rebuilt in source order from the
//! block indices, whatever order the stages complete in.
//!
//! The whole transfer runs under one deadline taken at call start. When it passes, the transfer
//! future is dropped, which cancels every in-flight stage request and skips the commit, so no
//! object becomes visible at the key.

use crate::traits::{BlobStore, BlockToken, BlockUpload, StorageError, StorageResult};
use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Duration;
use stowage_core::constants::{
    DEFAULT_BLOCK_SIZE_BYTES, DEFAULT_MAX_CONCURRENCY, DEFAULT_UPLOAD_TIMEOUT_SECS,
};
use stowage_core::{Config, TransferMode};
use tokio::time::{timeout_at, Instant};

/// Tuning for one upload call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOptions {
    pub block_size: usize,
    pub max_concurrency: usize,
    pub timeout: Duration,
    pub mode: TransferMode,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE_BYTES,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            timeout: Duration::from_secs(DEFAULT_UPLOAD_TIMEOUT_SECS),
            mode: TransferMode::Auto,
        }
    }
}

impl UploadOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            block_size: config.block_size_bytes,
            max_concurrency: config.max_concurrency,
            timeout: config.upload_timeout(),
            mode: config.transfer_mode,
        }
    }
}

/// Uploads payloads to a store, directly or as staged blocks.
#[derive(Clone)]
pub struct ChunkedUploader {
    store: Arc<dyn BlobStore>,
    options: UploadOptions,
}

impl ChunkedUploader {
    pub fn new(store: Arc<dyn BlobStore>, options: UploadOptions) -> Self {
        let options = UploadOptions {
            block_size: options.block_size.max(1),
            max_concurrency: options.max_concurrency.max(1),
            ..options
        };
        Self { store, options }
    }

    pub fn options(&self) -> &UploadOptions {
        &self.options
    }

    /// Number of blocks a payload of `size` bytes is staged as, 0 for a direct put.
    pub fn block_count(&self, size: u64) -> u64 {
        if self.is_direct(size) {
            0
        } else {
            size.div_ceil(self.options.block_size as u64)
        }
    }

    fn is_direct(&self, size: u64) -> bool {
        if size == 0 {
            return true;
        }
        match self.options.mode {
            TransferMode::Direct => true,
            TransferMode::Chunked => false,
            TransferMode::Auto => size <= self.options.block_size as u64,
        }
    }

    /// Upload an in-memory payload. Blocks are zero-copy slices of `data`.
    pub async fn upload(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        let deadline = Instant::now() + self.options.timeout;
        let total_size = data.len() as u64;

        if self.is_direct(total_size) {
            return self.put_direct(key, data, content_type, deadline).await;
        }

        let blocks = split_blocks(data, self.options.block_size);
        self.upload_blocks(
            key,
            stream::iter(blocks.into_iter().map(Ok)),
            total_size,
            content_type,
            deadline,
        )
        .await
    }

    /// Upload from a byte stream of `total_size` bytes.
    ///
    /// The stream is re-chunked into blocks as it is read; at most `max_concurrency` blocks are
    /// buffered at any time.
    pub async fn upload_stream<S>(
        &self,
        key: &str,
        source: S,
        total_size: u64,
        content_type: &str,
    ) -> StorageResult<()>
    where
        S: Stream<Item = std::io::Result<Bytes>> + Send + Unpin,
    {
        let deadline = Instant::now() + self.options.timeout;

        if self.is_direct(total_size) {
            let data = match timeout_at(deadline, read_to_end(source, total_size)).await {
                Ok(result) => result?,
                Err(_) => return Err(self.timed_out(key)),
            };
            check_size(key, data.len() as u64, total_size)?;
            return self.put_direct(key, data, content_type, deadline).await;
        }

        let blocks = rechunk(source, self.options.block_size);
        self.upload_blocks(key, blocks, total_size, content_type, deadline)
            .await
    }

    async fn put_direct(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        deadline: Instant,
    ) -> StorageResult<()> {
        let size = data.len();
        let start = Instant::now();

        match timeout_at(deadline, self.store.put_object(key, data, content_type)).await {
            Ok(result) => result?,
            Err(_) => return Err(self.timed_out(key)),
        }

        tracing::debug!(
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Direct upload complete"
        );
        Ok(())
    }

    async fn upload_blocks<S>(
        &self,
        key: &str,
        blocks: S,
        total_size: u64,
        content_type: &str,
        deadline: Instant,
    ) -> StorageResult<()>
    where
        S: Stream<Item = StorageResult<Bytes>> + Send,
    {
        let start = Instant::now();

        let upload =
            match timeout_at(deadline, self.store.begin_block_upload(key, content_type)).await {
                Ok(result) => result?,
                Err(_) => return Err(self.timed_out(key)),
            };

        let outcome = match timeout_at(
            deadline,
            self.stage_and_commit(&upload, blocks, total_size, content_type),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(self.timed_out(key)),
        };

        match outcome {
            Ok(block_count) => {
                tracing::info!(
                    key = %key,
                    upload_id = %upload.upload_id,
                    size_bytes = total_size,
                    blocks = block_count,
                    max_concurrency = self.options.max_concurrency,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Chunked upload committed"
                );
                Ok(())
            }
            Err(e) => {
                self.store.release_block_upload(&upload);
                tracing::error!(
                    error = %e,
                    key = %key,
                    upload_id = %upload.upload_id,
                    size_bytes = total_size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Chunked upload failed"
                );
                Err(e)
            }
        }
    }

    async fn stage_and_commit<S>(
        &self,
        upload: &BlockUpload,
        blocks: S,
        total_size: u64,
        content_type: &str,
    ) -> StorageResult<usize>
    where
        S: Stream<Item = StorageResult<Bytes>> + Send,
    {
        let store = &self.store;

        // try_collect stops at the first failure and drops the remaining stage futures.
        let mut staged: Vec<BlockToken> = blocks
            .enumerate()
            .map(|(index, block)| async move {
                let block = block?;
                store.stage_block(upload, index, block).await
            })
            .buffer_unordered(self.options.max_concurrency)
            .try_collect()
            .await?;

        staged.sort_by_key(|token| token.index);

        if let Some((expected, token)) = staged
            .iter()
            .enumerate()
            .find(|(expected, token)| token.index != *expected)
        {
            return Err(StorageError::UploadFailed(format!(
                "block manifest for {} has a gap: expected block {}, found {}",
                upload.key, expected, token.index
            )));
        }

        let staged_bytes: u64 = staged.iter().map(|token| token.size as u64).sum();
        check_size(&upload.key, staged_bytes, total_size)?;

        let block_count = staged.len();
        store.commit_blocks(upload, staged, content_type).await?;
        Ok(block_count)
    }

    fn timed_out(&self, key: &str) -> StorageError {
        tracing::warn!(
            key = %key,
            timeout_secs = self.options.timeout.as_secs_f64(),
            "Upload timed out, cancelling in-flight block operations"
        );
        StorageError::Timeout(self.options.timeout)
    }
}

fn check_size(key: &str, actual: u64, expected: u64) -> StorageResult<()> {
    if actual != expected {
        return Err(StorageError::UploadFailed(format!(
            "read {} bytes for {} but {} were announced",
            actual, key, expected
        )));
    }
    Ok(())
}

fn split_blocks(data: Bytes, block_size: usize) -> Vec<Bytes> {
    let mut blocks = Vec::with_capacity(data.len().div_ceil(block_size));
    let mut offset = 0;
    while offset < data.len() {
        let end = (offset + block_size).min(data.len());
        blocks.push(data.slice(offset..end));
        offset = end;
    }
    blocks
}

async fn read_to_end<S>(mut source: S, size_hint: u64) -> StorageResult<Bytes>
where
    S: Stream<Item = std::io::Result<Bytes>> + Unpin,
{
    let mut buffer = BytesMut::with_capacity(size_hint as usize);
    while let Some(chunk) = source.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    Ok(buffer.freeze())
}

type ChunkState<S> = (S, BytesMut, bool);

fn rechunk<S>(source: S, block_size: usize) -> impl Stream<Item = StorageResult<Bytes>> + Send
where
    S: Stream<Item = std::io::Result<Bytes>> + Send + Unpin,
{
    stream::try_unfold((source, BytesMut::new(), false), move |state| {
        next_block(state, block_size)
    })
}

async fn next_block<S>(
    (mut source, mut pending, mut exhausted): ChunkState<S>,
    block_size: usize,
) -> StorageResult<Option<(Bytes, ChunkState<S>)>>
where
    S: Stream<Item = std::io::Result<Bytes>> + Unpin,
{
    while !exhausted && pending.len() < block_size {
        match source.next().await {
            Some(chunk) => pending.extend_from_slice(&chunk?),
            None => exhausted = true,
        }
    }

    if pending.is_empty() {
        return Ok(None);
    }

    let take = pending.len().min(block_size);
    let block = pending.split_to(take).freeze();
    Ok(Some((block, (source, pending, exhausted))))
}
