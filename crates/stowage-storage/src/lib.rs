//! Stowage Storage Library
//!
//! Blob store abstraction and backends (S3, local filesystem, in-memory), the chunked
//! uploader that drives staged uploads against any of them, and the key/URL naming rules.
//!
//! # Storage key format
//!
//! Every backend uses the same flat layout:
//!
//! - **Original**: `{hash}{ext}`
//! - **Thumbnail**: `thumb-{hash}{ext}`
//!
//! Key generation is centralized in the `keys` module so all backends stay consistent.

pub mod chunked;
pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-memory")]
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use chunked::{ChunkedUploader, UploadOptions};
pub use factory::create_storage;
pub use keys::{storage_key, thumbnail_key, KeyError, UrlResolver};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-memory")]
pub use memory::{MemoryStorage, StoredObject};
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use stowage_core::StorageBackend;
pub use traits::{BlobStore, BlockToken, BlockUpload, StorageError, StorageResult};
