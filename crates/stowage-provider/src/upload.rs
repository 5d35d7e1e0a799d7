//! Upload orchestration
//!
//! Derive the thumbnail first, then store thumbnail and original concurrently. The first
//! failure cancels the other transfer and fails the call; URLs are written only once every
//! required object is stored.

use crate::log_failure;
use futures::future::try_join;
use serde::Serialize;
use stowage_core::{FileRecord, ProviderError, ProviderResult};
use stowage_processing::ImageDerivation;
use stowage_storage::{storage_key, ChunkedUploader, UrlResolver};

/// What an upload produced besides the original's URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    /// The stored thumbnail, URL set, when the file was eligible for one.
    pub thumbnail: Option<FileRecord>,
}

pub struct UploadOrchestrator<'a> {
    uploader: &'a ChunkedUploader,
    urls: &'a UrlResolver,
    derivation: &'a ImageDerivation,
}

impl<'a> UploadOrchestrator<'a> {
    pub fn new(
        uploader: &'a ChunkedUploader,
        urls: &'a UrlResolver,
        derivation: &'a ImageDerivation,
    ) -> Self {
        Self {
            uploader,
            urls,
            derivation,
        }
    }

    /// Store `file` and, when eligible, its thumbnail. Sets `file.url` on success only.
    pub async fn handle_upload(&self, file: &mut FileRecord) -> ProviderResult<UploadOutcome> {
        let start = std::time::Instant::now();
        let key = storage_key(file);

        let thumbnail = self.derivation.derive(file).await.map_err(|e| {
            let err = ProviderError::from(e);
            log_failure(&err, &file.hash, &key, "Thumbnail derivation failed");
            err
        })?;

        let (url, thumbnail) = match thumbnail {
            Some(mut thumb) => {
                let (thumb_url, url) =
                    try_join(self.store(&thumb), self.store(file)).await?;
                thumb.url = Some(thumb_url);
                (url, Some(thumb))
            }
            None => (self.store(file).await?, None),
        };

        tracing::info!(
            hash = %file.hash,
            key = %key,
            mime = %file.mime,
            size_bytes = file.len(),
            thumbnail = thumbnail.is_some(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Upload complete"
        );

        file.url = Some(url);
        Ok(UploadOutcome { thumbnail })
    }

    /// Transfer one record and return its public URL.
    async fn store(&self, record: &FileRecord) -> ProviderResult<String> {
        let key = storage_key(record);

        self.uploader
            .upload(&key, record.buffer.clone(), &record.mime)
            .await
            .map_err(|e| {
                let err = ProviderError::from(e);
                log_failure(&err, &record.hash, &key, "Upload failed");
                err
            })?;

        Ok(self.urls.url_for_key(&key))
    }
}
