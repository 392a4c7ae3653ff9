//! Raster enhancement for watermarked registry scans.
//!
//! Three stages run in order: watermark suppression, a global contrast
//! stretch, and sharpening restricted to dark (text) pixels. Watermarks are
//! removed first so the stretch spends its range on text, not on stamps.

use image::{Rgb, RgbImage};
use tracing::debug;

/// Channel level above which a pixel counts as near white.
const NEAR_WHITE: u8 = 225;
/// Blue excess over red and green for the light-blue stamp rule.
const BLUE_EXCESS: i32 = 15;
const LIGHT_BLUE_MIN: u8 = 180;
/// Maximum pairwise channel difference for a neutral gray.
const GRAY_SPREAD: i32 = 10;
const LIGHT_GRAY_MIN: u8 = 180;

/// Contrast push applied to non-watermark pixels.
const CONTRAST_PUSH: i32 = 20;
/// Luma below which a pixel is treated as a text stroke.
const TEXT_LUMA: i32 = 100;

const SHARPEN_CENTER: i32 = 17;
const SHARPEN_NEIGHBOR: i32 = -1;
const SHARPEN_DIVISOR: i32 = 9;

/// Watermark-aware enhancer run before recognition.
#[derive(Debug, Clone, Copy)]
pub struct PixelEnhancer;

impl PixelEnhancer {
    pub fn new() -> Self {
        Self
    }

    /// Run all three stages. The output has the input's dimensions.
    pub fn enhance(&self, raster: &RgbImage) -> RgbImage {
        let (width, height) = raster.dimensions();
        debug!("Enhancing {}x{} raster", width, height);

        let cleaned = self.suppress_watermarks(raster);
        let stretched = stretch_contrast(&cleaned);
        drop(cleaned);
        self.sharpen_text(&stretched)
    }

    /// Stage 1: force watermark pixels to white, push the rest away from mid-gray.
    pub fn suppress_watermarks(&self, raster: &RgbImage) -> RgbImage {
        let mut removed = 0usize;
        let result = RgbImage::from_fn(raster.width(), raster.height(), |x, y| {
            let pixel = raster.get_pixel(x, y);
            if is_watermark(pixel) {
                removed += 1;
                Rgb([255, 255, 255])
            } else {
                push_contrast(pixel, CONTRAST_PUSH)
            }
        });

        debug!("Watermark suppression whitened {} pixels", removed);
        result
    }

    /// Stage 3: 3x3 sharpen on pixels darker than the text threshold.
    ///
    /// Border pixels and light pixels keep their input value.
    pub fn sharpen_text(&self, raster: &RgbImage) -> RgbImage {
        let (width, height) = raster.dimensions();
        let mut result = raster.clone();

        if width < 3 || height < 3 {
            return result;
        }

        for y in 1..height - 1 {
            for x in 1..width - 1 {
                if luma(raster.get_pixel(x, y)) >= TEXT_LUMA {
                    continue;
                }

                let mut sums = [0i32; 3];
                for ky in 0..3u32 {
                    for kx in 0..3u32 {
                        let weight = if kx == 1 && ky == 1 {
                            SHARPEN_CENTER
                        } else {
                            SHARPEN_NEIGHBOR
                        };
                        let p = raster.get_pixel(x + kx - 1, y + ky - 1);
                        for c in 0..3 {
                            sums[c] += p[c] as i32 * weight;
                        }
                    }
                }

                result.put_pixel(
                    x,
                    y,
                    Rgb([
                        clamp_channel(sums[0] / SHARPEN_DIVISOR),
                        clamp_channel(sums[1] / SHARPEN_DIVISOR),
                        clamp_channel(sums[2] / SHARPEN_DIVISOR),
                    ]),
                );
            }
        }

        result
    }
}

impl Default for PixelEnhancer {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a pixel looks like background decoration rather than content.
pub fn is_watermark(pixel: &Rgb<u8>) -> bool {
    let [r, g, b] = pixel.0;

    let near_white = r > NEAR_WHITE && g > NEAR_WHITE && b > NEAR_WHITE;

    let (ri, gi, bi) = (r as i32, g as i32, b as i32);
    let light_blue = bi >= ri + BLUE_EXCESS && bi >= gi + BLUE_EXCESS && b > LIGHT_BLUE_MIN;

    let light_gray = (ri - gi).abs() < GRAY_SPREAD
        && (ri - bi).abs() < GRAY_SPREAD
        && (gi - bi).abs() < GRAY_SPREAD
        && r > LIGHT_GRAY_MIN;

    near_white || light_blue || light_gray
}

/// Integer luma with weights 0.30, 0.59, 0.11.
pub fn luma(pixel: &Rgb<u8>) -> i32 {
    let [r, g, b] = pixel.0;
    (r as i32 * 30 + g as i32 * 59 + b as i32 * 11) / 100
}

/// Stage 2: linear stretch of the observed luma range onto [0, 255].
pub fn stretch_contrast(raster: &RgbImage) -> RgbImage {
    let mut min = 255;
    let mut max = 0;
    for pixel in raster.pixels() {
        let l = luma(pixel);
        min = min.min(l);
        max = max.max(l);
    }

    if raster.width() == 0 || raster.height() == 0 {
        return raster.clone();
    }
    if min >= max {
        max = min + 1;
    }

    debug!("Contrast stretch: luma range [{}, {}]", min, max);

    let span = max - min;
    let mut result = raster.clone();
    for pixel in result.pixels_mut() {
        for c in 0..3 {
            pixel[c] = clamp_channel((pixel[c] as i32 - min) * 255 / span);
        }
    }
    result
}

/// Brightness-neutral contrast adjustment, `amount` in [-100, 100].
pub fn adjust_contrast(raster: &RgbImage, amount: f32) -> RgbImage {
    let amount = amount.clamp(-100.0, 100.0);
    let factor = (259.0 * (amount + 255.0)) / (255.0 * (259.0 - amount));

    let mut result = raster.clone();
    for pixel in result.pixels_mut() {
        for c in 0..3 {
            let value = factor * (pixel[c] as f32 - 127.5) + 127.5;
            pixel[c] = value.round().clamp(0.0, 255.0) as u8;
        }
    }
    result
}

fn push_contrast(pixel: &Rgb<u8>, amount: i32) -> Rgb<u8> {
    let push = |v: u8| {
        let v = v as i32;
        clamp_channel(if v > 128 { v + amount } else { v - amount })
    };
    Rgb([push(pixel[0]), push(pixel[1]), push(pixel[2])])
}

fn clamp_channel(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}
