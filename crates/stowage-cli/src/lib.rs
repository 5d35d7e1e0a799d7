//! Helpers for the `stowage` binary.

use sha2::{Digest, Sha256};
use std::path::Path;

/// Lowercase SHA-256 of `data`, used as the default content hash.
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Extension of `path` with its leading dot, lowercased. Empty when there is none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Best-effort MIME type for an extension as returned by [`extension_of`].
pub fn guess_mime(ext: &str) -> &'static str {
    match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "bmp" => "image/bmp",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "mp4" => "video/mp4",
        "mp3" => "audio/mpeg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_hex_sha256() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(content_hash(b"").len(), 64);
    }

    #[test]
    fn extension_keeps_dot_and_lowercases() {
        assert_eq!(extension_of(Path::new("photos/IMG_01.JPG")), ".jpg");
        assert_eq!(extension_of(Path::new("archive.tar.gz")), ".gz");
        assert_eq!(extension_of(Path::new("README")), "");
    }

    #[test]
    fn guess_mime_known_and_unknown() {
        assert_eq!(guess_mime(".png"), "image/png");
        assert_eq!(guess_mime("JPEG"), "image/jpeg");
        assert_eq!(guess_mime(".txt"), "text/plain");
        assert_eq!(guess_mime(".xyz"), "application/octet-stream");
        assert_eq!(guess_mime(""), "application/octet-stream");
    }
}
