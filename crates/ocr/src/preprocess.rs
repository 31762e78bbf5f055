use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use std::io::Cursor;
use thiserror::Error;

/// Phone screenshots narrower than this are upscaled before recognition.
const MIN_WIDTH: u32 = 1000;

/// Upscaling never produces an image taller than this; long scrolling
/// captures are recognized at their native size.
const MAX_UPSCALED_HEIGHT: u32 = 8000;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to decode screenshot: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// Decode a payment screenshot (PNG / JPEG / WEBP / …) and return PNG bytes
/// tuned for text recognition.
pub fn prepare_screenshot(data: &[u8]) -> Result<Vec<u8>, PreprocessError> {
    let img = image::load_from_memory(data)?;
    encode_as_png(normalize(img))
}

/// Upscale narrow captures, grayscale, flip dark mode to dark-on-light,
/// then contrast stretch.
fn normalize(img: DynamicImage) -> DynamicImage {
    let img = if img.width() < MIN_WIDTH
        && img.height().saturating_mul(2) <= MAX_UPSCALED_HEIGHT
    {
        img.resize(
            img.width() * 2,
            img.height() * 2,
            image::imageops::FilterType::CatmullRom,
        )
    } else {
        img
    };

    let mut gray: GrayImage = img.to_luma8();

    if is_dark_mode(&gray) {
        image::imageops::invert(&mut gray);
    }

    let (min_px, max_px) = gray
        .pixels()
        .fold((255u8, 0u8), |(mn, mx), p| (mn.min(p[0]), mx.max(p[0])));

    if max_px == min_px {
        return DynamicImage::ImageLuma8(gray);
    }

    let range = (max_px - min_px) as u32;
    let stretched: GrayImage = ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let p = gray.get_pixel(x, y)[0];
        Luma([((p - min_px) as u32 * 255 / range) as u8])
    });

    DynamicImage::ImageLuma8(stretched)
}

fn is_dark_mode(gray: &GrayImage) -> bool {
    let count = gray.width() as u64 * gray.height() as u64;
    if count == 0 {
        return false;
    }
    let sum: u64 = gray.pixels().map(|p| p[0] as u64).sum();
    sum / count < 128
}

fn encode_as_png(img: DynamicImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}
