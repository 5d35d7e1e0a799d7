use stowage_core::ProviderError;
use thiserror::Error;

/// Thumbnail derivation errors. All of them are terminal for the upload.
#[derive(Debug, Error)]
pub enum DerivationError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode thumbnail: {0}")]
    Encode(String),

    #[error("No thumbnail encoder for MIME type {0}")]
    UnsupportedFormat(String),

    #[error("Derivation worker failed: {0}")]
    Worker(String),
}

impl From<DerivationError> for ProviderError {
    fn from(err: DerivationError) -> Self {
        ProviderError::Derivation(err.to_string())
    }
}
