//! Key and URL naming shared by every backend.
//!
//! Key format: `{hash}{ext}`. A thumbnail lives at `thumb-{hash}{ext}`, so the thumbnail key of
//! any record can be recomputed from the original record alone.

use stowage_core::FileRecord;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("Base URL must not be empty")]
    EmptyBaseUrl,

    #[error("CDN host must not be empty")]
    EmptyCdnHost,

    #[error("URL {url} is not under base URL {base}")]
    ForeignUrl { url: String, base: String },
}

/// Storage key for a record.
pub fn storage_key(file: &FileRecord) -> String {
    key_for(&file.hash, &file.ext)
}

/// Storage key of the thumbnail derived from `file`.
pub fn thumbnail_key(file: &FileRecord) -> String {
    key_for(&file.thumbnail_hash(), &file.ext)
}

pub fn key_for(hash: &str, ext: &str) -> String {
    format!("{}{}", hash, ext)
}

/// Maps storage keys to public URLs, optionally rewritten onto a CDN host.
///
/// Both prefixes are normalised once at construction, so the CDN rewrite is a checked prefix
/// swap rather than a search-and-replace over the whole URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlResolver {
    base_url: String,
    cdn_base: Option<String>,
}

impl UrlResolver {
    /// # Arguments
    /// * `base_url` - URL prefix of the store (e.g., "https://media.s3.eu-west-1.amazonaws.com")
    /// * `cdn_host` - Optional CDN front-end; a bare host gets an `https://` scheme
    pub fn new(base_url: &str, cdn_host: Option<&str>) -> Result<Self, KeyError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(KeyError::EmptyBaseUrl);
        }

        let cdn_base = match cdn_host {
            Some(host) => {
                let host = host.trim().trim_end_matches('/');
                if host.is_empty() {
                    return Err(KeyError::EmptyCdnHost);
                }
                if host.contains("://") {
                    Some(host.to_string())
                } else {
                    Some(format!("https://{}", host))
                }
            }
            None => None,
        };

        Ok(Self {
            base_url: base_url.to_string(),
            cdn_base,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the object stored at `key` as served by the store itself.
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(key))
    }

    /// Public URL for `key`: the CDN URL when a CDN host is configured, the store URL otherwise.
    pub fn url_for_key(&self, key: &str) -> String {
        let url = self.object_url(key);
        match self.rewrite_to_cdn(&url) {
            Ok(rewritten) => rewritten,
            // object_url always starts with base_url
            Err(_) => url,
        }
    }

    pub fn url_for(&self, file: &FileRecord) -> String {
        self.url_for_key(&storage_key(file))
    }

    /// Swap the store prefix of `url` for the CDN host, keeping the path suffix unchanged.
    ///
    /// Returns the URL untouched when no CDN is configured, and an error when `url` does not
    /// start with the store's base URL.
    pub fn rewrite_to_cdn(&self, url: &str) -> Result<String, KeyError> {
        let suffix = url
            .strip_prefix(self.base_url.as_str())
            .filter(|rest| rest.starts_with('/'))
            .ok_or_else(|| KeyError::ForeignUrl {
                url: url.to_string(),
                base: self.base_url.clone(),
            })?;

        Ok(match &self.cdn_base {
            Some(cdn) => format!("{}{}", cdn, suffix),
            None => url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hash: &str, ext: &str, mime: &str) -> FileRecord {
        FileRecord::new(hash, ext, mime, Vec::new())
    }

    #[test]
    fn test_keys() {
        let file = record("9f86d081", ".png", "image/png");
        assert_eq!(storage_key(&file), "9f86d081.png");
        assert_eq!(thumbnail_key(&file), "thumb-9f86d081.png");
    }

    #[test]
    fn test_url_without_cdn() {
        let urls = UrlResolver::new("https://acct.blob.example.net/media/", None).unwrap();
        let file = record("abc", ".jpg", "image/jpeg");
        assert_eq!(urls.url_for(&file), "https://acct.blob.example.net/media/abc.jpg");
    }

    #[test]
    fn test_url_with_bare_cdn_host() {
        let urls =
            UrlResolver::new("https://acct.blob.example.net/media", Some("cdn.example.com/"))
                .unwrap();
        assert_eq!(urls.url_for_key("abc.jpg"), "https://cdn.example.com/abc.jpg");
    }

    #[test]
    fn test_url_with_cdn_path_prefix() {
        let urls = UrlResolver::new(
            "http://localhost:9000/bucket",
            Some("https://cdn.example.com/assets"),
        )
        .unwrap();
        assert_eq!(
            urls.url_for_key("thumb-abc.png"),
            "https://cdn.example.com/assets/thumb-abc.png"
        );
    }

    #[test]
    fn test_key_is_percent_encoded_in_url() {
        let urls = UrlResolver::new("https://store.example.com", None).unwrap();
        assert_eq!(
            urls.url_for_key("my file.png"),
            "https://store.example.com/my%20file.png"
        );
    }

    #[test]
    fn test_rewrite_rejects_foreign_url() {
        let urls =
            UrlResolver::new("https://store.example.com/a", Some("cdn.example.com")).unwrap();
        assert!(matches!(
            urls.rewrite_to_cdn("https://other.example.com/a/x.png"),
            Err(KeyError::ForeignUrl { .. })
        ));
        // Prefix must end on a path boundary.
        assert!(urls
            .rewrite_to_cdn("https://store.example.com/ab/x.png")
            .is_err());
    }

    #[test]
    fn test_empty_prefixes_rejected() {
        assert_eq!(UrlResolver::new("  ", None), Err(KeyError::EmptyBaseUrl));
        assert_eq!(
            UrlResolver::new("https://store.example.com", Some("/")),
            Err(KeyError::EmptyCdnHost)
        );
    }
}
