use crate::delete::DeletionOrchestrator;
use crate::upload::{UploadOrchestrator, UploadOutcome};
use std::sync::Arc;
use stowage_core::{Config, FileRecord, ProviderError, ProviderResult};
use stowage_processing::ImageDerivation;
use stowage_storage::{create_storage, BlobStore, ChunkedUploader, UploadOptions, UrlResolver};

/// A configured storage adapter.
///
/// Holds the store client, URL naming, uploader and thumbnail policy. Cloning is cheap and
/// clones share the same store, so one provider can serve many concurrent calls; independently
/// configured providers can coexist in one process.
#[derive(Clone)]
pub struct StorageProvider {
    inner: Arc<ProviderInner>,
}

struct ProviderInner {
    store: Arc<dyn BlobStore>,
    urls: UrlResolver,
    uploader: ChunkedUploader,
    derivation: ImageDerivation,
}

impl StorageProvider {
    pub fn new(
        store: Arc<dyn BlobStore>,
        urls: UrlResolver,
        upload_options: UploadOptions,
        derivation: ImageDerivation,
    ) -> Self {
        let uploader = ChunkedUploader::new(store.clone(), upload_options);
        Self {
            inner: Arc::new(ProviderInner {
                store,
                urls,
                uploader,
                derivation,
            }),
        }
    }

    /// Validate `config` and build the backend it names.
    pub async fn from_config(config: &Config) -> ProviderResult<Self> {
        config.validate()?;
        let store = create_storage(config).await?;
        Self::with_store(config, store)
    }

    /// Build a provider around an existing store, taking every other setting from `config`.
    pub fn with_store(config: &Config, store: Arc<dyn BlobStore>) -> ProviderResult<Self> {
        let urls = UrlResolver::new(store.base_url(), config.cdn_host.as_deref())
            .map_err(|e| ProviderError::Config(e.to_string()))?;

        tracing::debug!(
            backend = %store.backend_type(),
            base_url = %urls.base_url(),
            cdn = config.cdn_host.is_some(),
            block_size_bytes = config.block_size_bytes,
            max_concurrency = config.max_concurrency,
            "Storage provider initialized"
        );

        Ok(Self::new(
            store,
            urls,
            UploadOptions::from_config(config),
            ImageDerivation::from_config(config),
        ))
    }

    /// Store `file` (and its thumbnail when eligible) and set `file.url`.
    ///
    /// On failure `file.url` is left untouched and nothing should be assumed stored.
    pub async fn upload(&self, file: &mut FileRecord) -> ProviderResult<UploadOutcome> {
        UploadOrchestrator::new(&self.inner.uploader, &self.inner.urls, &self.inner.derivation)
            .handle_upload(file)
            .await
    }

    /// Delete `file` and, when its type is eligible, its thumbnail.
    pub async fn delete(&self, file: &FileRecord) -> ProviderResult<()> {
        DeletionOrchestrator::new(self.inner.store.as_ref(), &self.inner.derivation)
            .handle_delete(file)
            .await
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.inner.store
    }

    pub fn urls(&self) -> &UrlResolver {
        &self.inner.urls
    }

    pub fn derivation(&self) -> &ImageDerivation {
        &self.inner.derivation
    }

    pub fn upload_options(&self) -> &UploadOptions {
        self.inner.uploader.options()
    }
}
