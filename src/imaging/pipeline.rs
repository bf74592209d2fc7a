use std::io::Cursor;

use anyhow::{Context, Result};
use image::{codecs::jpeg::JpegEncoder, DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

use super::filters::{adjust_contrast_brightness, auto_adjust_levels, median_denoise, sharpen};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub const OUTPUT_MIME: &str = "image/jpeg";

const WIDE_RATIO: f64 = 2.5;
const TALL_RATIO: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizeOptions {
    pub max_dimension: u32,
    /// JPEG quality, 1-100.
    pub quality: u8,
    pub enhance: bool,
    pub auto_rotate: bool,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            max_dimension: 1600,
            quality: 88,
            enhance: true,
            auto_rotate: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnhanceOptions {
    pub contrast: f32,
    pub brightness: f32,
    pub auto_adjust: bool,
    pub denoise: bool,
    pub sharpen: bool,
}

impl Default for EnhanceOptions {
    fn default() -> Self {
        Self {
            contrast: 1.25,
            brightness: 12.0,
            auto_adjust: true,
            denoise: true,
            sharpen: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OptimizedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    /// Output dimensions; `None` when the original bytes are passed through.
    pub dimensions: Option<(u32, u32)>,
    pub optimized: bool,
}

impl OptimizedImage {
    fn passthrough(bytes: &[u8], mime_type: &str) -> Self {
        Self {
            bytes: bytes.to_vec(),
            mime_type: mime_type.to_string(),
            dimensions: None,
            optimized: false,
        }
    }
}

/// Resizes, rotates, enhances and re-encodes an image as JPEG.
///
/// Never fails: on any decode or encode error the input comes back unchanged
/// with `optimized == false`. CPU bound; call from `spawn_blocking`.
pub fn optimize_for_ocr(bytes: &[u8], mime_type: &str, options: &OptimizeOptions) -> OptimizedImage {
    match try_optimize(bytes, options) {
        Ok((encoded, dimensions)) => {
            log_info!(
                "Optimized image for OCR: {} -> {} bytes, {}x{}",
                bytes.len(),
                encoded.len(),
                dimensions.0,
                dimensions.1
            );
            OptimizedImage {
                bytes: encoded,
                mime_type: OUTPUT_MIME.to_string(),
                dimensions: Some(dimensions),
                optimized: true,
            }
        }
        Err(err) => {
            log_warn!("Image optimization failed, using original: {err:#}");
            OptimizedImage::passthrough(bytes, mime_type)
        }
    }
}

fn try_optimize(bytes: &[u8], options: &OptimizeOptions) -> Result<(Vec<u8>, (u32, u32))> {
    let mut image = image::load_from_memory(bytes).context("Failed to decode image")?;

    let (width, height) = image.dimensions();
    let (target_width, target_height) = scaled_dimensions(width, height, options.max_dimension);
    if (target_width, target_height) != (width, height) {
        image = image.resize_exact(
            target_width,
            target_height,
            image::imageops::FilterType::Triangle,
        );
    }

    if options.auto_rotate {
        image = auto_rotate(image);
    }

    if options.enhance {
        image = enhance(image, &EnhanceOptions::default());
    }

    let dimensions = image.dimensions();
    let encoded = encode_jpeg(&image, options.quality)?;
    Ok((encoded, dimensions))
}

/// Longer side becomes `max_dimension`; the shorter side is scaled and truncated.
pub fn scaled_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if max_dimension == 0 || (width <= max_dimension && height <= max_dimension) {
        return (width, height);
    }

    let scale = |side: u32, longest: u32| {
        ((u64::from(side) * u64::from(max_dimension)) / u64::from(longest)).max(1) as u32
    };

    if width > height {
        (max_dimension, scale(height, width))
    } else {
        (scale(width, height), max_dimension)
    }
}

/// Aspect-ratio heuristic only; EXIF orientation is not read.
fn auto_rotate(image: DynamicImage) -> DynamicImage {
    let (width, height) = image.dimensions();
    if height == 0 {
        return image;
    }

    let ratio = f64::from(width) / f64::from(height);
    if ratio > WIDE_RATIO {
        image.rotate90()
    } else if ratio < TALL_RATIO {
        image.rotate270()
    } else {
        image
    }
}

pub fn enhance(image: DynamicImage, options: &EnhanceOptions) -> DynamicImage {
    let mut buffer = image.into_rgba8();

    if options.auto_adjust {
        auto_adjust_levels(&mut buffer);
    }
    if options.denoise {
        median_denoise(&mut buffer);
    }
    adjust_contrast_brightness(&mut buffer, options.contrast, options.brightness);
    if options.sharpen {
        sharpen(&mut buffer);
    }

    DynamicImage::ImageRgba8(buffer)
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    // JPEG has no alpha channel.
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_with_encoder(encoder)
        .context("Failed to encode JPEG")?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(image)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn scales_the_longer_side_down() {
        assert_eq!(scaled_dimensions(3200, 2400, 1600), (1600, 1200));
        assert_eq!(scaled_dimensions(1000, 3000, 1600), (533, 1600));
        assert_eq!(scaled_dimensions(800, 600, 1600), (800, 600));
        assert_eq!(scaled_dimensions(5000, 2, 1600), (1600, 1));
    }

    #[test]
    fn wide_images_are_rotated_upright() {
        let bytes = png_bytes(300, 100);
        let result = optimize_for_ocr(
            &bytes,
            "image/png",
            &OptimizeOptions {
                enhance: false,
                ..Default::default()
            },
        );
        assert!(result.optimized);
        assert_eq!(result.dimensions, Some((100, 300)));
        assert_eq!(result.mime_type, OUTPUT_MIME);
        assert_eq!(
            image::guess_format(&result.bytes).unwrap(),
            ImageFormat::Jpeg
        );
    }

    #[test]
    fn tall_images_are_rotated_the_other_way() {
        let rotated = auto_rotate(DynamicImage::new_rgba8(10, 30));
        assert_eq!(rotated.dimensions(), (30, 10));
        let kept = auto_rotate(DynamicImage::new_rgba8(20, 30));
        assert_eq!(kept.dimensions(), (20, 30));
    }

    #[test]
    fn large_images_are_resized_and_enhanced() {
        let bytes = png_bytes(400, 300);
        let result = optimize_for_ocr(
            &bytes,
            "image/png",
            &OptimizeOptions {
                max_dimension: 200,
                ..Default::default()
            },
        );
        assert!(result.optimized);
        assert_eq!(result.dimensions, Some((200, 150)));

        let decoded = image::load_from_memory(&result.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (200, 150));
    }

    #[test]
    fn undecodable_input_passes_through() {
        let bytes = b"definitely not an image".to_vec();
        let result = optimize_for_ocr(&bytes, "image/webp", &OptimizeOptions::default());
        assert!(!result.optimized);
        assert_eq!(result.bytes, bytes);
        assert_eq!(result.mime_type, "image/webp");
        assert_eq!(result.dimensions, None);
    }
}
