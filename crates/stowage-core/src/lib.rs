//! Stowage Core Library
//!
//! This crate provides the file record model, error taxonomy, configuration and constants
//! shared by every Stowage component.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, ThumbnailEligibility, TransferMode};
pub use error::{ErrorMetadata, LogLevel, ProviderError, ProviderResult};
pub use models::FileRecord;
pub use storage_types::StorageBackend;
// Note: BlobStore, StorageError, StorageResult live in the stowage-storage crate
