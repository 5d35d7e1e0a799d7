use image::ImageFormat;

/// Encoding of a derived thumbnail.
///
/// A thumbnail is always written in its original's format, so the thumbnail key
/// (`thumb-{hash}{ext}`) can be recomputed from the original record alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailFormat {
    Jpeg,
    Png,
    Bmp,
    Gif,
    WebP,
}

impl ThumbnailFormat {
    /// Format for a MIME type, ignoring case and parameters (`image/PNG; q=1` is PNG).
    pub fn from_mime(mime: &str) -> Option<Self> {
        match normalize_mime(mime).as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ThumbnailFormat::Jpeg),
            "image/png" => Some(ThumbnailFormat::Png),
            "image/bmp" | "image/x-ms-bmp" => Some(ThumbnailFormat::Bmp),
            "image/gif" => Some(ThumbnailFormat::Gif),
            "image/webp" => Some(ThumbnailFormat::WebP),
            _ => None,
        }
    }

    pub fn to_mime_type(self) -> &'static str {
        match self {
            ThumbnailFormat::Jpeg => "image/jpeg",
            ThumbnailFormat::Png => "image/png",
            ThumbnailFormat::Bmp => "image/bmp",
            ThumbnailFormat::Gif => "image/gif",
            ThumbnailFormat::WebP => "image/webp",
        }
    }

    pub fn to_image_format(self) -> ImageFormat {
        match self {
            ThumbnailFormat::Jpeg => ImageFormat::Jpeg,
            ThumbnailFormat::Png => ImageFormat::Png,
            ThumbnailFormat::Bmp => ImageFormat::Bmp,
            ThumbnailFormat::Gif => ImageFormat::Gif,
            ThumbnailFormat::WebP => ImageFormat::WebP,
        }
    }

    /// Whether the quality setting applies. Everything but JPEG is written lossless.
    pub fn is_lossy(self) -> bool {
        matches!(self, ThumbnailFormat::Jpeg)
    }
}

/// Lowercase MIME essence without parameters.
pub(crate) fn normalize_mime(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_mime() {
        assert_eq!(ThumbnailFormat::from_mime("image/png"), Some(ThumbnailFormat::Png));
        assert_eq!(
            ThumbnailFormat::from_mime("Image/JPEG; charset=binary"),
            Some(ThumbnailFormat::Jpeg)
        );
        assert_eq!(ThumbnailFormat::from_mime("image/bmp"), Some(ThumbnailFormat::Bmp));
        assert_eq!(ThumbnailFormat::from_mime("image/svg+xml"), None);
        assert_eq!(ThumbnailFormat::from_mime("text/plain"), None);
    }

    #[test]
    fn test_mime_round_trip_is_canonical() {
        let format = ThumbnailFormat::from_mime("image/jpg").unwrap();
        assert_eq!(format.to_mime_type(), "image/jpeg");
        assert_eq!(format.to_image_format(), ImageFormat::Jpeg);
        assert!(format.is_lossy());
        assert!(!ThumbnailFormat::Png.is_lossy());
    }
}
