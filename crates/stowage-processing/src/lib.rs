//! Stowage Processing Library
//!
//! Thumbnail derivation: which files get one, how they are resized, and how the result is
//! re-encoded. Decoding and encoding go through the [`ImageCodec`] trait so the pipeline can run
//! against a counting or failing codec in tests.

pub mod compression;
pub mod derivation;
pub mod error;
pub mod image;

pub use compression::ThumbnailFormat;
pub use derivation::{is_eligible, ImageDerivation};
pub use error::DerivationError;
pub use crate::image::{ContainFit, ImageCodec, ImageCrateCodec};
