//! Configuration module
//!
//! Provider configuration is read once from the environment (after loading `.env`) and then
//! shared read-only by every upload and delete call.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_BLOCK_SIZE_BYTES, DEFAULT_MAX_CONCURRENCY, DEFAULT_MEMORY_BASE_URL,
    DEFAULT_THUMBNAIL_MAX_WIDTH, DEFAULT_THUMBNAIL_QUALITY, DEFAULT_UPLOAD_TIMEOUT_SECS,
};
use crate::storage_types::StorageBackend;

/// Which MIME types get a thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThumbnailEligibility {
    /// PNG, JPEG and BMP only.
    #[default]
    Raster,
    /// Anything under `image/`.
    AnyImage,
}

impl FromStr for ThumbnailEligibility {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "raster" => Ok(ThumbnailEligibility::Raster),
            "any-image" | "any_image" | "image" => Ok(ThumbnailEligibility::AnyImage),
            _ => Err(anyhow::anyhow!("Invalid thumbnail eligibility: {}", s)),
        }
    }
}

/// How payloads are transferred to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferMode {
    /// Single put when the payload fits in one block, staged blocks otherwise.
    #[default]
    Auto,
    /// Always a single put.
    Direct,
    /// Always staged blocks, even for tiny payloads.
    Chunked,
}

impl FromStr for TransferMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(TransferMode::Auto),
            "direct" => Ok(TransferMode::Direct),
            "chunked" => Ok(TransferMode::Chunked),
            _ => Err(anyhow::anyhow!("Invalid upload mode: {}", s)),
        }
    }
}

impl Display for TransferMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TransferMode::Auto => write!(f, "auto"),
            TransferMode::Direct => write!(f, "direct"),
            TransferMode::Chunked => write!(f, "chunked"),
        }
    }
}

/// Provider configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    /// `LOG_FORMAT`: `json` or `text`. Unset means JSON in production, text elsewhere.
    pub log_format: Option<String>,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO, R2, etc.)
    pub s3_endpoint: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub memory_base_url: String,
    pub cdn_host: Option<String>,
    // Thumbnail derivation
    pub thumbnail_max_width: u32,
    pub thumbnail_max_height: Option<u32>,
    pub thumbnail_quality: u8,
    pub thumbnail_eligibility: ThumbnailEligibility,
    // Transfer
    pub block_size_bytes: usize,
    pub max_concurrency: usize,
    pub upload_timeout_secs: u64,
    pub transfer_mode: TransferMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_format: None,
            storage_backend: StorageBackend::S3,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            local_storage_path: None,
            local_storage_base_url: None,
            memory_base_url: DEFAULT_MEMORY_BASE_URL.to_string(),
            cdn_host: None,
            thumbnail_max_width: DEFAULT_THUMBNAIL_MAX_WIDTH,
            thumbnail_max_height: None,
            thumbnail_quality: DEFAULT_THUMBNAIL_QUALITY,
            thumbnail_eligibility: ThumbnailEligibility::Raster,
            block_size_bytes: DEFAULT_BLOCK_SIZE_BYTES,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            upload_timeout_secs: DEFAULT_UPLOAD_TIMEOUT_SECS,
            transfer_mode: TransferMode::Auto,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Config::default();

        let storage_backend = match get("STORAGE_BACKEND") {
            Some(value) => value.parse()?,
            None => defaults.storage_backend,
        };
        let thumbnail_eligibility = match get("THUMBNAIL_ELIGIBILITY") {
            Some(value) => value.parse()?,
            None => defaults.thumbnail_eligibility,
        };
        let transfer_mode = match get("UPLOAD_MODE") {
            Some(value) => value.parse()?,
            None => defaults.transfer_mode,
        };

        Ok(Config {
            environment: get("ENVIRONMENT")
                .or_else(|| get("APP_ENV"))
                .unwrap_or(defaults.environment),
            log_format: get("LOG_FORMAT").map(|v| v.to_lowercase()),
            storage_backend,
            s3_bucket: get("S3_BUCKET"),
            s3_region: get("S3_REGION").or_else(|| get("AWS_REGION")),
            s3_endpoint: get("S3_ENDPOINT"),
            local_storage_path: get("LOCAL_STORAGE_PATH"),
            local_storage_base_url: get("LOCAL_STORAGE_BASE_URL"),
            memory_base_url: get("MEMORY_STORAGE_BASE_URL").unwrap_or(defaults.memory_base_url),
            cdn_host: get("CDN_HOST"),
            thumbnail_max_width: parse_or(
                "THUMBNAIL_MAX_WIDTH",
                get("THUMBNAIL_MAX_WIDTH"),
                defaults.thumbnail_max_width,
            )?,
            thumbnail_max_height: get("THUMBNAIL_MAX_HEIGHT")
                .map(|v| parse_value("THUMBNAIL_MAX_HEIGHT", &v))
                .transpose()?,
            thumbnail_quality: parse_or(
                "THUMBNAIL_QUALITY",
                get("THUMBNAIL_QUALITY"),
                defaults.thumbnail_quality,
            )?,
            thumbnail_eligibility,
            block_size_bytes: parse_or(
                "UPLOAD_BLOCK_SIZE_BYTES",
                get("UPLOAD_BLOCK_SIZE_BYTES"),
                defaults.block_size_bytes,
            )?,
            max_concurrency: parse_or(
                "UPLOAD_MAX_CONCURRENCY",
                get("UPLOAD_MAX_CONCURRENCY"),
                defaults.max_concurrency,
            )?,
            upload_timeout_secs: parse_or(
                "UPLOAD_TIMEOUT_SECS",
                get("UPLOAD_TIMEOUT_SECS"),
                defaults.upload_timeout_secs,
            )?,
            transfer_mode,
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    /// Whether log output should be JSON lines.
    pub fn json_logs(&self) -> bool {
        match self.log_format.as_deref() {
            Some(format) => format == "json",
            None => self.is_production(),
        }
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.block_size_bytes == 0 {
            return Err(anyhow::anyhow!("UPLOAD_BLOCK_SIZE_BYTES must be greater than 0"));
        }
        if self.max_concurrency == 0 {
            return Err(anyhow::anyhow!("UPLOAD_MAX_CONCURRENCY must be greater than 0"));
        }
        if self.upload_timeout_secs == 0 {
            return Err(anyhow::anyhow!("UPLOAD_TIMEOUT_SECS must be greater than 0"));
        }
        if self.thumbnail_max_width == 0 || self.thumbnail_max_height == Some(0) {
            return Err(anyhow::anyhow!(
                "THUMBNAIL_MAX_WIDTH and THUMBNAIL_MAX_HEIGHT must be greater than 0"
            ));
        }
        if !(1..=100).contains(&self.thumbnail_quality) {
            return Err(anyhow::anyhow!("THUMBNAIL_QUALITY must be between 1 and 100"));
        }

        // Validate storage backend configuration
        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
            StorageBackend::Memory => {}
        }

        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, anyhow::Error> {
    value
        .parse::<T>()
        .map_err(|_| anyhow::anyhow!("{} must be a valid number, got {:?}", key, value))
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T, anyhow::Error> {
    match value {
        Some(v) => parse_value(key, &v),
        None => Ok(default),
    }
}
