use image::DynamicImage;
use std::sync::atomic::{AtomicUsize, Ordering};
use stowage_processing::{ContainFit, DerivationError, ImageCodec, ImageCrateCodec, ThumbnailFormat};

/// Real codec that counts every call.
#[derive(Debug, Default)]
pub struct CountingCodec {
    inner: ImageCrateCodec,
    decodes: AtomicUsize,
    resizes: AtomicUsize,
    encodes: AtomicUsize,
}

impl CountingCodec {
    pub fn decodes(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }

    pub fn resizes(&self) -> usize {
        self.resizes.load(Ordering::SeqCst)
    }

    pub fn encodes(&self) -> usize {
        self.encodes.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.decodes() + self.resizes() + self.encodes()
    }
}

impl ImageCodec for CountingCodec {
    fn decode(
        &self,
        data: &[u8],
        format: ThumbnailFormat,
    ) -> Result<DynamicImage, DerivationError> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        self.inner.decode(data, format)
    }

    fn resize(&self, img: &DynamicImage, fit: ContainFit) -> DynamicImage {
        self.resizes.fetch_add(1, Ordering::SeqCst);
        self.inner.resize(img, fit)
    }

    fn encode(
        &self,
        img: &DynamicImage,
        format: ThumbnailFormat,
        quality: u8,
    ) -> Result<Vec<u8>, DerivationError> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        self.inner.encode(img, format, quality)
    }
}
