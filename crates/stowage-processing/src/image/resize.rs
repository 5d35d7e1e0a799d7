use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// "Contain" resize bounds: shrink to fit inside the box, keep the aspect ratio, never enlarge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainFit {
    pub max_width: u32,
    /// `None` leaves the height unbounded, so only the width constrains the result.
    pub max_height: Option<u32>,
}

impl ContainFit {
    pub fn new(max_width: u32, max_height: Option<u32>) -> Self {
        Self {
            max_width,
            max_height,
        }
    }

    /// Output dimensions for an image of `orig_width` x `orig_height`.
    ///
    /// Each side is at least 1px and at most both the bound and the original size.
    pub fn target_dimensions(&self, orig_width: u32, orig_height: u32) -> (u32, u32) {
        if orig_width == 0 || orig_height == 0 {
            return (orig_width, orig_height);
        }

        let width_scale = self.max_width as f64 / orig_width as f64;
        let height_scale = self
            .max_height
            .map(|h| h as f64 / orig_height as f64)
            .unwrap_or(f64::INFINITY);
        let scale = width_scale.min(height_scale).min(1.0);

        if scale >= 1.0 {
            return (orig_width, orig_height);
        }

        let clamp = |scaled: f64, bound: u32| (scaled.round() as u32).clamp(1, bound);
        let width = clamp(orig_width as f64 * scale, self.max_width.min(orig_width));
        let height = clamp(
            orig_height as f64 * scale,
            self.max_height.unwrap_or(orig_height).min(orig_height),
        );
        (width, height)
    }

    /// Resize `img` to fit; returns an unchanged copy when it already fits.
    pub fn apply(&self, img: &DynamicImage) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let (width, height) = self.target_dimensions(orig_width, orig_height);
        if (width, height) == (orig_width, orig_height) {
            return img.clone();
        }

        let filter = select_filter(orig_width, orig_height, width, height);
        img.resize_exact(width, height, filter)
    }
}

/// Pick a resampling filter from the downscale ratio: cheap filters for big reductions, where
/// their blur is invisible, Lanczos for gentle ones.
pub fn select_filter(
    orig_width: u32,
    orig_height: u32,
    new_width: u32,
    new_height: u32,
) -> FilterType {
    let width_ratio = orig_width as f32 / new_width.max(1) as f32;
    let height_ratio = orig_height as f32 / new_height.max(1) as f32;
    let max_ratio = width_ratio.max(height_ratio);

    if max_ratio > 2.0 {
        FilterType::Triangle
    } else if max_ratio > 1.5 {
        FilterType::CatmullRom
    } else {
        FilterType::Lanczos3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_width_bound_keeps_aspect() {
        let fit = ContainFit::new(48, None);
        assert_eq!(fit.target_dimensions(4000, 3000), (48, 36));
        assert_eq!(fit.target_dimensions(100, 1000), (48, 480));
    }

    #[test]
    fn test_never_upscales() {
        let fit = ContainFit::new(48, Some(48));
        assert_eq!(fit.target_dimensions(20, 10), (20, 10));
        assert_eq!(fit.target_dimensions(48, 48), (48, 48));
    }

    #[test]
    fn test_height_bound_wins_when_tighter() {
        let fit = ContainFit::new(512, Some(100));
        assert_eq!(fit.target_dimensions(1000, 1000), (100, 100));
        assert_eq!(fit.target_dimensions(2000, 500), (400, 100));
    }

    #[test]
    fn test_extreme_aspect_ratio_keeps_one_pixel() {
        let fit = ContainFit::new(48, None);
        let (width, height) = fit.target_dimensions(10_000, 10);
        assert_eq!(width, 48);
        assert_eq!(height, 1);
    }

    #[test]
    fn test_bounds_hold_across_shapes() {
        let fit = ContainFit::new(48, Some(64));
        for (w, h) in [(1, 1), (47, 65), (49, 63), (1920, 1080), (1080, 1920), (333, 777)] {
            let (tw, th) = fit.target_dimensions(w, h);
            assert!(tw >= 1 && th >= 1);
            assert!(tw <= 48 && tw <= w, "{w}x{h} -> {tw}x{th}");
            assert!(th <= 64 && th <= h, "{w}x{h} -> {tw}x{th}");
        }
    }

    #[test]
    fn test_apply_resizes_pixels() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(200, 100));
        let out = ContainFit::new(48, None).apply(&img);
        assert_eq!(out.dimensions(), (48, 24));

        let small = DynamicImage::ImageRgb8(RgbImage::new(30, 30));
        assert_eq!(ContainFit::new(48, None).apply(&small).dimensions(), (30, 30));
    }

    #[test]
    fn test_select_filter() {
        assert_eq!(select_filter(1000, 1000, 100, 100), FilterType::Triangle);
        assert_eq!(select_filter(180, 180, 100, 100), FilterType::CatmullRom);
        assert_eq!(select_filter(120, 120, 100, 100), FilterType::Lanczos3);
    }
}
