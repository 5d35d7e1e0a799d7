//! Test helpers: a recording fake store, a counting codec and image fixtures.
//!
//! Run from workspace root: `cargo test -p stowage-provider`.
#![allow(dead_code)]

pub mod codec;
pub mod fixtures;
pub mod store;

use std::sync::Arc;
use stowage_core::{Config, StorageBackend};
use stowage_processing::{ImageCodec, ImageDerivation};
use stowage_provider::StorageProvider;
use stowage_storage::{BlobStore, UploadOptions, UrlResolver};

pub use codec::CountingCodec;
pub use fixtures::*;
pub use store::{Calls, RecordingStore};

pub const BASE_URL: &str = "https://media.example.com/files";

/// Memory-backed configuration with default thumbnail and transfer settings.
pub fn test_config() -> Config {
    Config {
        storage_backend: StorageBackend::Memory,
        memory_base_url: BASE_URL.to_string(),
        ..Config::default()
    }
}

/// Provider over `store`, with `config` settings and `codec` for thumbnails.
pub fn provider_with(
    store: Arc<dyn BlobStore>,
    config: &Config,
    codec: Arc<dyn ImageCodec>,
) -> StorageProvider {
    let urls = UrlResolver::new(store.base_url(), config.cdn_host.as_deref()).unwrap();
    StorageProvider::new(
        store,
        urls,
        UploadOptions::from_config(config),
        ImageDerivation::from_config(config).with_codec(codec),
    )
}

/// Provider with explicit upload options (sub-second timeouts, tiny blocks).
pub fn provider_with_options(
    store: Arc<dyn BlobStore>,
    config: &Config,
    codec: Arc<dyn ImageCodec>,
    options: UploadOptions,
) -> StorageProvider {
    let urls = UrlResolver::new(store.base_url(), config.cdn_host.as_deref()).unwrap();
    StorageProvider::new(
        store,
        urls,
        options,
        ImageDerivation::from_config(config).with_codec(codec),
    )
}
