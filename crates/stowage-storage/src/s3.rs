use crate::traits::{BlobStore, BlockToken, BlockUpload, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, MultipartUpload, ObjectStore, ObjectStoreExt, PutMultipartOptions,
    PutOptions, PutPayload, Result as ObjectResult, UploadPart,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use uuid::Uuid;

/// Smallest multipart part S3 accepts, except for the last one.
const S3_MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// S3 storage implementation
///
/// Staged uploads map onto S3 multipart uploads. S3 numbers parts in the order they are
/// issued, so each open upload keeps a [`PartSequencer`] that issues parts strictly by block
/// index; the transfers themselves still run concurrently. Blocks smaller than S3's minimum
/// part size are coalesced with their successors into one part.
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    base_url: String,
    uploads: Arc<Mutex<HashMap<String, Arc<Mutex<PartSequencer>>>>>,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store,
            base_url: Self::public_base_url(&bucket, &region, endpoint_url.as_deref()),
            bucket,
            uploads: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Public URL prefix of the bucket.
    ///
    /// S3-compatible providers get path-style `{endpoint}/{bucket}`; AWS gets the
    /// virtual-hosted form `https://{bucket}.s3.{region}.amazonaws.com`.
    fn public_base_url(bucket: &str, region: &str, endpoint_url: Option<&str>) -> String {
        match endpoint_url {
            Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
            None => format!("https://{}.s3.{}.amazonaws.com", bucket, region),
        }
    }

    fn content_type_attributes(content_type: &str) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        attributes
    }

    fn registry(
        &self,
    ) -> StorageResult<std::sync::MutexGuard<'_, HashMap<String, Arc<Mutex<PartSequencer>>>>> {
        self.uploads
            .lock()
            .map_err(|_| StorageError::BackendError("multipart registry lock poisoned".to_string()))
    }

    fn sequencer(&self, upload: &BlockUpload) -> StorageResult<Arc<Mutex<PartSequencer>>> {
        self.registry()?
            .get(&upload.upload_id)
            .cloned()
            .ok_or_else(|| {
                StorageError::UploadFailed(format!(
                    "no open multipart upload {} for {}",
                    upload.upload_id, upload.key
                ))
            })
    }
}

#[async_trait]
impl BlobStore for S3Storage {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        let size = data.len() as u64;
        let location = Path::from(key.to_string());
        let opts = PutOptions::from(Self::content_type_attributes(content_type));

        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self
            .store
            .put_opts(&location, PutPayload::from(data), opts)
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(())
    }

    async fn begin_block_upload(
        &self,
        key: &str,
        content_type: &str,
    ) -> StorageResult<BlockUpload> {
        let location = Path::from(key.to_string());
        let opts = PutMultipartOptions::from(Self::content_type_attributes(content_type));

        let multipart = self
            .store
            .put_multipart_opts(&location, opts)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    "S3 multipart upload could not be started"
                );
                StorageError::UploadFailed(e.to_string())
            })?;

        let upload = BlockUpload {
            key: key.to_string(),
            upload_id: Uuid::new_v4().to_string(),
        };
        self.registry()?.insert(
            upload.upload_id.clone(),
            Arc::new(Mutex::new(PartSequencer::new(multipart, S3_MIN_PART_SIZE))),
        );

        Ok(upload)
    }

    /// A block that does not complete a part is acknowledged once buffered; its bytes travel
    /// with the part issued by a later block, or by the commit.
    async fn stage_block(
        &self,
        upload: &BlockUpload,
        index: usize,
        data: Bytes,
    ) -> StorageResult<BlockToken> {
        let size = data.len();
        let sequencer = self.sequencer(upload)?;

        let pending = sequencer
            .lock()
            .map_err(|_| StorageError::BackendError("part sequencer lock poisoned".to_string()))?
            .submit(index, data)?;

        let part = match pending {
            PendingPart::Ready(part) => part,
            PendingPart::Parked(receiver) => receiver.await.map_err(|_| {
                StorageError::UploadFailed(format!(
                    "multipart upload for {} closed before block {} was sequenced",
                    upload.key, index
                ))
            })?,
        };

        let Some(part) = part else {
            return Ok(BlockToken {
                index,
                id: format!("block-{}", index),
                size,
            });
        };

        part.await.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %upload.key,
                part = index,
                size_bytes = size,
                "S3 part upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        Ok(BlockToken {
            index,
            id: format!("block-{}", index),
            size,
        })
    }

    async fn commit_blocks(
        &self,
        upload: &BlockUpload,
        blocks: Vec<BlockToken>,
        _content_type: &str,
    ) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let sequencer = self
            .registry()?
            .remove(&upload.upload_id)
            .ok_or_else(|| {
                StorageError::UploadFailed(format!(
                    "no open multipart upload {} for {}",
                    upload.upload_id, upload.key
                ))
            })?;

        let (mut multipart, last_part) = sequencer
            .lock()
            .map_err(|_| StorageError::BackendError("part sequencer lock poisoned".to_string()))?
            .finish(&blocks)?;

        if let Some(part) = last_part {
            part.await.map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %upload.key,
                    "S3 final part upload failed"
                );
                StorageError::UploadFailed(e.to_string())
            })?;
        }

        multipart.complete().await.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %upload.key,
                blocks = blocks.len(),
                "S3 multipart completion failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %upload.key,
            blocks = blocks.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 multipart upload successful"
        );

        Ok(())
    }

    fn release_block_upload(&self, upload: &BlockUpload) {
        // Parts already sent stay with S3 until the bucket's multipart lifecycle rule expires them.
        if let Ok(mut registry) = self.uploads.lock() {
            if registry.remove(&upload.upload_id).is_some() {
                tracing::debug!(
                    bucket = %self.bucket,
                    key = %upload.key,
                    upload_id = %upload.upload_id,
                    "S3 multipart upload abandoned"
                );
            }
        }
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let location = Path::from(key.to_string());

        // S3 deletes are idempotent, so absence has to be checked up front.
        match self.store.head(&location).await {
            Ok(_) => {}
            Err(ObjectStoreError::NotFound { .. }) => {
                return Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => return Err(StorageError::BackendError(e.to_string())),
        }

        let result: ObjectResult<_> = self.store.delete(&location).await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 delete failed"
            );
            StorageError::DeleteFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let location = Path::from(key.to_string());
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

enum PendingPart {
    /// Sequenced now; carries the part this block completed, if any.
    Ready(Option<UploadPart>),
    Parked(oneshot::Receiver<Option<UploadPart>>),
}

type ParkedBlock = (Bytes, oneshot::Sender<Option<UploadPart>>);

/// Turns staged blocks into multipart parts, in block-index order.
///
/// Blocks are appended to a buffer in index order and a part is issued whenever the buffer
/// reaches `min_part_size`; the remainder becomes the last part at [`finish`](Self::finish).
/// A block that arrives ahead of its turn is parked with its payload. When the missing block
/// arrives, it appends itself and every parked successor that is now contiguous, handing each
/// parked caller the part it completed (if any) through a oneshot channel.
struct PartSequencer {
    upload: Option<Box<dyn MultipartUpload>>,
    min_part_size: usize,
    next_index: usize,
    buffered: Vec<Bytes>,
    buffered_len: usize,
    parked: BTreeMap<usize, ParkedBlock>,
}

impl PartSequencer {
    fn new(upload: Box<dyn MultipartUpload>, min_part_size: usize) -> Self {
        Self {
            upload: Some(upload),
            min_part_size: min_part_size.max(1),
            next_index: 0,
            buffered: Vec::new(),
            buffered_len: 0,
            parked: BTreeMap::new(),
        }
    }

    fn submit(&mut self, index: usize, data: Bytes) -> StorageResult<PendingPart> {
        if self.upload.is_none() {
            return Err(StorageError::UploadFailed(
                "multipart upload already finished".to_string(),
            ));
        }

        if index < self.next_index || self.parked.contains_key(&index) {
            return Err(StorageError::UploadFailed(format!(
                "block {} was submitted twice",
                index
            )));
        }

        if index > self.next_index {
            let (sender, receiver) = oneshot::channel();
            self.parked.insert(index, (data, sender));
            return Ok(PendingPart::Parked(receiver));
        }

        let own = self.append(data)?;

        while let Some((data, sender)) = self.parked.remove(&self.next_index) {
            // The parked caller may have been cancelled; its bytes are still part of the upload.
            let _ = sender.send(self.append(data)?);
        }

        Ok(PendingPart::Ready(own))
    }

    fn append(&mut self, data: Bytes) -> StorageResult<Option<UploadPart>> {
        self.next_index += 1;
        self.buffered_len += data.len();
        self.buffered.push(data);

        if self.buffered_len < self.min_part_size {
            return Ok(None);
        }
        self.flush()
    }

    fn flush(&mut self) -> StorageResult<Option<UploadPart>> {
        if self.buffered.is_empty() {
            return Ok(None);
        }
        let upload = self.upload.as_mut().ok_or_else(|| {
            StorageError::UploadFailed("multipart upload already finished".to_string())
        })?;

        let payload: PutPayload = std::mem::take(&mut self.buffered).into_iter().collect();
        self.buffered_len = 0;
        Ok(Some(upload.put_part(payload)))
    }

    /// Check the manifest and hand back the upload along with the trailing part, if any.
    fn finish(
        &mut self,
        blocks: &[BlockToken],
    ) -> StorageResult<(Box<dyn MultipartUpload>, Option<UploadPart>)> {
        let in_order = blocks
            .iter()
            .enumerate()
            .all(|(position, token)| token.index == position);

        if !in_order || blocks.len() != self.next_index || !self.parked.is_empty() {
            return Err(StorageError::UploadFailed(format!(
                "manifest of {} blocks does not match {} sequenced blocks",
                blocks.len(),
                self.next_index
            )));
        }

        let last = self.flush()?;
        let upload = self.upload.take().ok_or_else(|| {
            StorageError::UploadFailed("multipart upload already finished".to_string())
        })?;
        Ok((upload, last))
    }
}
