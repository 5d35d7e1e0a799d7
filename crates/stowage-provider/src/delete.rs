//! Delete orchestration
//!
//! Thumbnail keys are recomputed from the original record with the same eligibility test used
//! at upload time. A missing thumbnail is fine; a missing original is an error.

use crate::log_failure;
use futures::future::join;
use stowage_core::{FileRecord, ProviderError, ProviderResult};
use stowage_processing::ImageDerivation;
use stowage_storage::{storage_key, thumbnail_key, BlobStore, StorageError};

pub struct DeletionOrchestrator<'a> {
    store: &'a dyn BlobStore,
    derivation: &'a ImageDerivation,
}

impl<'a> DeletionOrchestrator<'a> {
    pub fn new(store: &'a dyn BlobStore, derivation: &'a ImageDerivation) -> Self {
        Self { store, derivation }
    }

    /// Delete `file` and, for eligible types, its thumbnail. Both deletes run concurrently and
    /// both are awaited before the result is reported.
    pub async fn handle_delete(&self, file: &FileRecord) -> ProviderResult<()> {
        let start = std::time::Instant::now();
        let key = storage_key(file);
        let original = self.store.delete_object(&key);

        let (original_result, thumbnail) = if self.derivation.is_eligible(&file.mime) {
            let thumb_key = thumbnail_key(file);
            let (original_result, thumb_result) =
                join(original, self.store.delete_object(&thumb_key)).await;
            (original_result, Some((thumb_key, thumb_result)))
        } else {
            (original.await, None)
        };

        if let Err(e) = original_result {
            let err = ProviderError::from(e);
            log_failure(&err, &file.hash, &key, "Delete failed");
            return Err(err);
        }

        if let Some((thumb_key, result)) = thumbnail {
            match result {
                Ok(()) => {}
                Err(StorageError::NotFound(_)) => {
                    tracing::debug!(
                        hash = %file.hash,
                        key = %thumb_key,
                        "No thumbnail to delete"
                    );
                }
                Err(e) => {
                    let err = ProviderError::from(e);
                    log_failure(&err, &file.hash, &thumb_key, "Thumbnail delete failed");
                    return Err(err);
                }
            }
        }

        tracing::info!(
            hash = %file.hash,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Delete complete"
        );

        Ok(())
    }
}
