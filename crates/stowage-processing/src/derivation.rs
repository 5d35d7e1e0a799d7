//! Thumbnail derivation
//!
//! Decides from the MIME type alone whether a file gets a thumbnail, and builds it. The same
//! eligibility test drives deletion, so a thumbnail can be located without any stored flag.

use crate::compression::{normalize_mime, ThumbnailFormat};
use crate::error::DerivationError;
use crate::image::{ContainFit, ImageCodec, ImageCrateCodec};
use bytes::Bytes;
use image::GenericImageView;
use std::sync::Arc;
use stowage_core::constants::RASTER_MIME_TYPES;
use stowage_core::{Config, FileRecord, ThumbnailEligibility};

/// Whether files of type `mime` get a thumbnail under `policy`.
pub fn is_eligible(policy: ThumbnailEligibility, mime: &str) -> bool {
    let mime = normalize_mime(mime);
    match policy {
        ThumbnailEligibility::Raster => RASTER_MIME_TYPES.contains(&mime.as_str()),
        ThumbnailEligibility::AnyImage => mime.starts_with("image/"),
    }
}

/// Thumbnail policy plus the codec that carries it out.
#[derive(Clone)]
pub struct ImageDerivation {
    eligibility: ThumbnailEligibility,
    fit: ContainFit,
    quality: u8,
    codec: Arc<dyn ImageCodec>,
}

impl ImageDerivation {
    pub fn new(
        eligibility: ThumbnailEligibility,
        fit: ContainFit,
        quality: u8,
        codec: Arc<dyn ImageCodec>,
    ) -> Self {
        Self {
            eligibility,
            fit,
            quality,
            codec,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.thumbnail_eligibility,
            ContainFit::new(config.thumbnail_max_width, config.thumbnail_max_height),
            config.thumbnail_quality,
            Arc::new(ImageCrateCodec),
        )
    }

    /// Same derivation policy, different codec.
    pub fn with_codec(mut self, codec: Arc<dyn ImageCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn eligibility(&self) -> ThumbnailEligibility {
        self.eligibility
    }

    pub fn fit(&self) -> ContainFit {
        self.fit
    }

    pub fn is_eligible(&self, mime: &str) -> bool {
        is_eligible(self.eligibility, mime)
    }

    /// Build the thumbnail record for `file`, or `None` when its type is not eligible.
    ///
    /// The thumbnail keeps the original's format and extension; only the pixels, the hash
    /// (`thumb-` prefix) and the size change. Its MIME type is the canonical name of the format
    /// (`image/jpg` becomes `image/jpeg`). Decode and encode run on the blocking pool.
    pub async fn derive(&self, file: &FileRecord) -> Result<Option<FileRecord>, DerivationError> {
        if !self.is_eligible(&file.mime) {
            return Ok(None);
        }

        let format = ThumbnailFormat::from_mime(&file.mime)
            .ok_or_else(|| DerivationError::UnsupportedFormat(file.mime.clone()))?;

        let data = file.buffer.clone();
        let codec = self.codec.clone();
        let fit = self.fit;
        let quality = self.quality;
        let start = std::time::Instant::now();

        let (encoded, (width, height)) = tokio::task::spawn_blocking(move || {
            let img = codec.decode(&data, format)?;
            let resized = codec.resize(&img, fit);
            let encoded = codec.encode(&resized, format, quality)?;
            Ok::<_, DerivationError>((encoded, resized.dimensions()))
        })
        .await
        .map_err(|e| DerivationError::Worker(e.to_string()))??;

        let thumbnail = file.derived(Bytes::from(encoded), &file.ext, format.to_mime_type());

        tracing::debug!(
            hash = %file.hash,
            mime = %file.mime,
            width,
            height,
            original_bytes = file.len(),
            size_bytes = thumbnail.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Thumbnail derived"
        );

        Ok(Some(thumbnail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 3) as u8, (y * 5) as u8, 90])
        }));
        ImageCrateCodec
            .encode(&img, ThumbnailFormat::Png, 80)
            .unwrap()
    }

    fn derivation(policy: ThumbnailEligibility) -> ImageDerivation {
        ImageDerivation::new(
            policy,
            ContainFit::new(48, None),
            80,
            Arc::new(ImageCrateCodec),
        )
    }

    #[test]
    fn test_raster_allow_list() {
        let policy = ThumbnailEligibility::Raster;
        assert!(is_eligible(policy, "image/png"));
        assert!(is_eligible(policy, "image/jpeg"));
        assert!(is_eligible(policy, "IMAGE/BMP"));
        assert!(!is_eligible(policy, "image/gif"));
        assert!(!is_eligible(policy, "text/plain"));
    }

    #[test]
    fn test_any_image_prefix() {
        let policy = ThumbnailEligibility::AnyImage;
        assert!(is_eligible(policy, "image/gif"));
        assert!(is_eligible(policy, "image/svg+xml"));
        assert!(!is_eligible(policy, "application/pdf"));
    }

    #[tokio::test]
    async fn test_ineligible_file_is_skipped() {
        let file = FileRecord::new("abc", ".txt", "text/plain", b"hello".to_vec());
        let result = derivation(ThumbnailEligibility::Raster)
            .derive(&file)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_png_thumbnail() {
        let file = FileRecord::new("f00d", ".png", "image/png", png_bytes(200, 100));

        let thumb = derivation(ThumbnailEligibility::Raster)
            .derive(&file)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(thumb.hash, "thumb-f00d");
        assert_eq!(thumb.ext, ".png");
        assert_eq!(thumb.mime, "image/png");
        assert!(thumb.url.is_none());

        let decoded = image::load_from_memory(&thumb.buffer).unwrap();
        assert_eq!(decoded.dimensions(), (48, 24));
        assert_eq!(thumb.size, stowage_core::models::display_size(thumb.buffer.len()));
    }

    #[tokio::test]
    async fn test_thumbnail_mime_is_canonical() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(96, 64, image::Rgb([10, 20, 30])));
        let jpeg = ImageCrateCodec
            .encode(&img, ThumbnailFormat::Jpeg, 90)
            .unwrap();
        let file = FileRecord::new("cafe", ".jpg", "image/jpg", jpeg);

        let thumb = derivation(ThumbnailEligibility::AnyImage)
            .derive(&file)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(thumb.ext, ".jpg");
        assert_eq!(thumb.mime, "image/jpeg");
        assert_eq!(
            image::guess_format(&thumb.buffer).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[tokio::test]
    async fn test_small_image_is_not_upscaled() {
        let file = FileRecord::new("tiny", ".png", "image/png", png_bytes(16, 12));

        let thumb = derivation(ThumbnailEligibility::Raster)
            .derive(&file)
            .await
            .unwrap()
            .unwrap();

        let decoded = image::load_from_memory(&thumb.buffer).unwrap();
        assert_eq!(decoded.dimensions(), (16, 12));
    }

    #[tokio::test]
    async fn test_corrupt_image_is_an_error() {
        let file = FileRecord::new("bad", ".jpg", "image/jpeg", b"not a jpeg".to_vec());
        let result = derivation(ThumbnailEligibility::Raster).derive(&file).await;
        assert!(matches!(result, Err(DerivationError::Decode(_))));
    }

    #[tokio::test]
    async fn test_eligible_but_unencodable_type_is_an_error() {
        let file = FileRecord::new("vec", ".svg", "image/svg+xml", b"<svg/>".to_vec());
        let result = derivation(ThumbnailEligibility::AnyImage).derive(&file).await;
        assert!(matches!(
            result,
            Err(DerivationError::UnsupportedFormat(ref m)) if m == "image/svg+xml"
        ));
    }
}
