//! Error types module
//!
//! `ProviderError` is the error surfaced by the provider's public operations. Lower layers
//! (storage backends, image derivation) keep their own error enums and convert into it, so a
//! caller only ever has to match on one taxonomy:
//!
//! - `Derivation`: the image codec failed to decode or encode; terminal, never retried.
//! - `Transport`: the remote store rejected a put, stage, commit or delete call.
//! - `Timeout`: the upload budget elapsed; every in-flight block operation was cancelled.
//! - `NotFound`: a delete targeted an original that does not exist.
//! - `Config`: the provider could not be built from its configuration.

use std::time::Duration;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like a missing object
    Debug,
    /// Warning level - for failures the caller may retry
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be reported
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "TRANSPORT_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the whole call may succeed
    fn is_recoverable(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Image derivation failed: {0}")]
    Derivation(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Upload timed out after {0:?}")]
    Timeout(Duration),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

impl From<anyhow::Error> for ProviderError {
    fn from(err: anyhow::Error) -> Self {
        ProviderError::Config(format!("{:#}", err))
    }
}

impl ErrorMetadata for ProviderError {
    fn error_code(&self) -> &'static str {
        match self {
            ProviderError::Derivation(_) => "DERIVATION_ERROR",
            ProviderError::Transport(_) => "TRANSPORT_ERROR",
            ProviderError::Timeout(_) => "UPLOAD_TIMEOUT",
            ProviderError::NotFound(_) => "NOT_FOUND",
            ProviderError::Config(_) => "CONFIG_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, ProviderError::Transport(_) | ProviderError::Timeout(_))
    }

    fn log_level(&self) -> LogLevel {
        match self {
            ProviderError::NotFound(_) => LogLevel::Debug,
            ProviderError::Timeout(_) | ProviderError::Transport(_) => LogLevel::Warn,
            ProviderError::Derivation(_) | ProviderError::Config(_) => LogLevel::Error,
        }
    }
}
