//! Application-wide constants.

/// Marker prepended to the original hash to name its thumbnail (`thumb-<hash>`).
pub const THUMBNAIL_PREFIX: &str = "thumb-";

/// Default maximum thumbnail width in pixels.
pub const DEFAULT_THUMBNAIL_MAX_WIDTH: u32 = 48;

/// Default JPEG quality used when re-encoding thumbnails.
pub const DEFAULT_THUMBNAIL_QUALITY: u8 = 80;

/// Default block size for staged uploads (4 MiB).
pub const DEFAULT_BLOCK_SIZE_BYTES: usize = 4 * 1024 * 1024;

/// Default number of block-stage operations in flight per upload.
pub const DEFAULT_MAX_CONCURRENCY: usize = 20;

/// Default wall-clock budget for one upload, in seconds.
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 60 * 60;

/// Base URL reported by the in-memory backend when none is configured.
pub const DEFAULT_MEMORY_BASE_URL: &str = "memory://stowage";

/// MIME types eligible for thumbnailing under the strict raster policy.
pub const RASTER_MIME_TYPES: &[&str] = &["image/png", "image/jpeg", "image/bmp"];
