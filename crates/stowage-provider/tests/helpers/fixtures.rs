//! Image and text fixtures built in memory.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

pub fn png_fixture(width: u32, height: u32) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    gradient(width, height)
        .write_to(&mut cursor, ImageFormat::Png)
        .unwrap();
    cursor.into_inner()
}

pub fn gif_fixture(width: u32, height: u32) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(gradient(width, height).to_rgba8())
        .write_to(&mut cursor, ImageFormat::Gif)
        .unwrap();
    cursor.into_inner()
}

pub fn jpeg_fixture(width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 90)
        .encode_image(&gradient(width, height).to_rgb8())
        .unwrap();
    out
}

/// A valid JPEG padded with comment segments to at least `min_len` bytes.
///
/// Decoders skip COM segments, so the image decodes as a plain `width` x `height` picture.
pub fn padded_jpeg(width: u32, height: u32, min_len: usize) -> Vec<u8> {
    const COM_PAYLOAD: usize = 65_533;

    let jpeg = jpeg_fixture(width, height);
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "missing SOI marker");

    let mut out = Vec::with_capacity(min_len + COM_PAYLOAD);
    out.extend_from_slice(&jpeg[..2]);
    let mut filler = 0u8;
    while out.len() + jpeg.len() - 2 < min_len {
        out.extend_from_slice(&[0xFF, 0xFE]);
        out.extend_from_slice(&((COM_PAYLOAD + 2) as u16).to_be_bytes());
        out.extend(std::iter::repeat(b'a' + filler % 26).take(COM_PAYLOAD));
        filler = filler.wrapping_add(1);
    }
    out.extend_from_slice(&jpeg[2..]);
    out
}

pub fn text_fixture(len: usize) -> Vec<u8> {
    b"lorem ipsum dolor sit amet\n"
        .iter()
        .copied()
        .cycle()
        .take(len)
        .collect()
}

pub fn bmp_fixture(width: u32, height: u32) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    gradient(width, height)
        .write_to(&mut cursor, ImageFormat::Bmp)
        .unwrap();
    cursor.into_inner()
}

/// PNG of pseudo-random pixels; barely compresses, so size scales with area.
pub fn noise_png(width: u32, height: u32) -> Vec<u8> {
    let mut state = 0x2545_F491u32;
    let img = RgbImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, _] = state.to_le_bytes();
        Rgb([r, g, b])
    });
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, ImageFormat::Png)
        .unwrap();
    cursor.into_inner()
}
