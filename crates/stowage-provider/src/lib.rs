//! Stowage Provider
//!
//! The public surface of the storage adapter: [`StorageProvider::upload`] stores a file (and its
//! thumbnail when the file is an eligible image) and writes the public URL back onto the
//! record; [`StorageProvider::delete`] removes the file and any thumbnail it may have.

pub mod delete;
pub mod provider;
pub mod upload;

pub use delete::DeletionOrchestrator;
pub use provider::StorageProvider;
pub use upload::{UploadOrchestrator, UploadOutcome};

pub use stowage_core::{Config, FileRecord, ProviderError, ProviderResult};

use stowage_core::{ErrorMetadata, LogLevel};

/// Log a failed provider call at the level its error asks for.
pub(crate) fn log_failure(err: &ProviderError, hash: &str, key: &str, message: &str) {
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(
            error = %err,
            error_code = err.error_code(),
            hash = %hash,
            key = %key,
            "{}",
            message
        ),
        LogLevel::Warn => tracing::warn!(
            error = %err,
            error_code = err.error_code(),
            recoverable = err.is_recoverable(),
            hash = %hash,
            key = %key,
            "{}",
            message
        ),
        LogLevel::Error => tracing::error!(
            error = %err,
            error_code = err.error_code(),
            recoverable = err.is_recoverable(),
            hash = %hash,
            key = %key,
            "{}",
            message
        ),
    }
}
