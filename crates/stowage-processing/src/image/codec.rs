use crate::compression::ThumbnailFormat;
use crate::error::DerivationError;
use crate::image::resize::ContainFit;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::io::Cursor;

/// Image decode/resize/encode backend used by thumbnail derivation.
///
/// Implementations are CPU-bound and synchronous; callers run them on a blocking thread.
pub trait ImageCodec: Send + Sync {
    fn decode(&self, data: &[u8], format: ThumbnailFormat)
        -> Result<DynamicImage, DerivationError>;

    fn resize(&self, img: &DynamicImage, fit: ContainFit) -> DynamicImage;

    /// Encode `img`. `quality` (1-100) only affects lossy formats.
    fn encode(
        &self,
        img: &DynamicImage,
        format: ThumbnailFormat,
        quality: u8,
    ) -> Result<Vec<u8>, DerivationError>;
}

/// Codec backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateCodec;

impl ImageCodec for ImageCrateCodec {
    fn decode(
        &self,
        data: &[u8],
        format: ThumbnailFormat,
    ) -> Result<DynamicImage, DerivationError> {
        image::load_from_memory_with_format(data, format.to_image_format())
            .map_err(|e| DerivationError::Decode(e.to_string()))
    }

    fn resize(&self, img: &DynamicImage, fit: ContainFit) -> DynamicImage {
        fit.apply(img)
    }

    fn encode(
        &self,
        img: &DynamicImage,
        format: ThumbnailFormat,
        quality: u8,
    ) -> Result<Vec<u8>, DerivationError> {
        let mut cursor = Cursor::new(Vec::new());

        if format.is_lossy() {
            // JPEG is the only lossy format, and it has no alpha channel
            let rgb = img.to_rgb8();
            JpegEncoder::new_with_quality(&mut cursor, quality.clamp(1, 100))
                .encode_image(&rgb)
                .map_err(|e| DerivationError::Encode(e.to_string()))?;
        } else {
            img.write_to(&mut cursor, format.to_image_format())
                .map_err(|e| DerivationError::Encode(e.to_string()))?;
        }

        Ok(cursor.into_inner())
    }
}
