//! In-place RGBA filters used before OCR. Alpha is never touched.

use image::RgbaImage;

const SHARPEN_KERNEL: [[i32; 3]; 3] = [[0, -1, 0], [-1, 5, -1], [0, -1, 0]];

fn clamp_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Stretches each RGB channel so its darkest value maps to 0 and its
/// brightest to 255. A flat channel is shifted to 0 and not scaled.
pub fn auto_adjust_levels(image: &mut RgbaImage) {
    let mut min = [u8::MAX; 3];
    let mut max = [u8::MIN; 3];

    for pixel in image.pixels() {
        for c in 0..3 {
            min[c] = min[c].min(pixel[c]);
            max[c] = max[c].max(pixel[c]);
        }
    }

    let scale: [f32; 3] = std::array::from_fn(|c| {
        if max[c] > min[c] {
            255.0 / f32::from(max[c] - min[c])
        } else {
            1.0
        }
    });

    for pixel in image.pixels_mut() {
        for c in 0..3 {
            pixel[c] = clamp_channel(f32::from(pixel[c] - min[c]) * scale[c]);
        }
    }
}

/// 3x3 median per RGB channel over interior pixels.
pub fn median_denoise(image: &mut RgbaImage) {
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return;
    }

    let source = image.clone();
    let mut window = [0u8; 9];

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            for c in 0..3 {
                let mut i = 0;
                for dy in 0..3 {
                    for dx in 0..3 {
                        window[i] = source.get_pixel(x + dx - 1, y + dy - 1)[c];
                        i += 1;
                    }
                }
                window.sort_unstable();
                image.get_pixel_mut(x, y)[c] = window[4];
            }
        }
    }
}

/// `clamp(contrast * v + brightness)` on every RGB channel.
pub fn adjust_contrast_brightness(image: &mut RgbaImage, contrast: f32, brightness: f32) {
    for pixel in image.pixels_mut() {
        for c in 0..3 {
            pixel[c] = clamp_channel(contrast * f32::from(pixel[c]) + brightness);
        }
    }
}

/// 3x3 sharpen convolution over interior pixels.
pub fn sharpen(image: &mut RgbaImage) {
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return;
    }

    let source = image.clone();

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            for c in 0..3 {
                let mut sum = 0i32;
                for (ky, row) in SHARPEN_KERNEL.iter().enumerate() {
                    for (kx, weight) in row.iter().enumerate() {
                        let sample = source.get_pixel(x + kx as u32 - 1, y + ky as u32 - 1)[c];
                        sum += i32::from(sample) * weight;
                    }
                }
                image.get_pixel_mut(x, y)[c] = sum.clamp(0, 255) as u8;
            }
        }
    }
}
