//! File record handed to the provider for upload or delete.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::constants::THUMBNAIL_PREFIX;

/// A file travelling through the upload or delete pipeline.
///
/// The record owns its payload while in flight. Derivation never mutates a record's buffer; it
/// builds a new record instead (see [`FileRecord::derived`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Content fingerprint, used as the storage key stem.
    pub hash: String,
    /// Extension including the leading dot, e.g. `.png`.
    pub ext: String,
    pub mime: String,
    #[serde(skip)]
    pub buffer: Bytes,
    /// Size in kilobytes as decimal text. Informational only.
    pub size: String,
    /// Public URL, set once the object is durably stored.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub url: Option<String>,
}

impl FileRecord {
    pub fn new(
        hash: impl Into<String>,
        ext: impl Into<String>,
        mime: impl Into<String>,
        buffer: impl Into<Bytes>,
    ) -> Self {
        let buffer = buffer.into();
        Self {
            hash: hash.into(),
            ext: ext.into(),
            mime: mime.into(),
            size: display_size(buffer.len()),
            buffer,
            url: None,
        }
    }

    /// Build the thumbnail record for this file from an already encoded payload.
    ///
    /// The derived record has no URL and no link back to its parent; the relationship only
    /// survives through the `thumb-` naming convention.
    pub fn derived(&self, buffer: Bytes, ext: &str, mime: &str) -> Self {
        Self {
            hash: thumbnail_hash(&self.hash),
            ext: ext.to_string(),
            mime: mime.to_string(),
            size: display_size(buffer.len()),
            buffer,
            url: None,
        }
    }

    /// Hash of the thumbnail that would be derived from this record.
    pub fn thumbnail_hash(&self) -> String {
        thumbnail_hash(&self.hash)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

fn thumbnail_hash(hash: &str) -> String {
    format!("{}{}", THUMBNAIL_PREFIX, hash)
}

/// Render a byte length as kilobytes (base 1000) in shortest decimal form: `1500` -> `"1.5"`.
pub fn display_size(len: usize) -> String {
    (len as f64 / 1000.0).to_string()
}
