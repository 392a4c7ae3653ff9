//! Raster rotation into an enlarged bounding box.

use image::{imageops, Rgb, RgbImage};

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Normalize an angle in degrees to (-180, 180].
fn normalize_angle(angle: f32) -> f32 {
    let mut angle = angle % 360.0;
    if angle > 180.0 {
        angle -= 360.0;
    } else if angle <= -180.0 {
        angle += 360.0;
    }
    angle
}

/// Size of the box that holds a `width` x `height` raster rotated by `angle` degrees.
pub fn rotated_dimensions(width: u32, height: u32, angle: f32) -> (u32, u32) {
    let radians = normalize_angle(angle).to_radians();
    let (sin, cos) = (radians.sin().abs() as f64, radians.cos().abs() as f64);
    let (w, h) = (width as f64, height as f64);

    let new_width = (w * cos + h * sin).round() as u32;
    let new_height = (w * sin + h * cos).round() as u32;
    (new_width.max(1), new_height.max(1))
}

/// Rotate clockwise by `angle` degrees about the center, without clipping.
///
/// Quarter turns are exact; other angles are resampled bilinearly onto a
/// white background.
pub fn rotate(raster: &RgbImage, angle: f32) -> RgbImage {
    let angle = normalize_angle(angle);

    if angle == 0.0 {
        return raster.clone();
    }
    if angle == 90.0 {
        return imageops::rotate90(raster);
    }
    if angle == 180.0 {
        return imageops::rotate180(raster);
    }
    if angle == -90.0 {
        return imageops::rotate270(raster);
    }

    let (width, height) = raster.dimensions();
    let (new_width, new_height) = rotated_dimensions(width, height, angle);
    let radians = angle.to_radians();
    let (sin, cos) = (radians.sin(), radians.cos());

    let (src_cx, src_cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let (dst_cx, dst_cy) = (new_width as f32 / 2.0, new_height as f32 / 2.0);

    RgbImage::from_fn(new_width, new_height, |x, y| {
        let dx = x as f32 + 0.5 - dst_cx;
        let dy = y as f32 + 0.5 - dst_cy;

        // Inverse of a clockwise rotation in y-down coordinates
        let sx = dx * cos + dy * sin + src_cx - 0.5;
        let sy = -dx * sin + dy * cos + src_cy - 0.5;

        sample_bilinear(raster, sx, sy)
    })
}

fn sample_bilinear(raster: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let (width, height) = raster.dimensions();
    if x < -0.5 || y < -0.5 || x > width as f32 - 0.5 || y > height as f32 - 0.5 {
        return BACKGROUND;
    }

    let x = x.clamp(0.0, (width - 1) as f32);
    let y = y.clamp(0.0, (height - 1) as f32);
    let (x0, y0) = (x.floor() as u32, y.floor() as u32);
    let (x1, y1) = ((x0 + 1).min(width - 1), (y0 + 1).min(height - 1));
    let (fx, fy) = (x - x0 as f32, y - y0 as f32);

    let p00 = raster.get_pixel(x0, y0);
    let p10 = raster.get_pixel(x1, y0);
    let p01 = raster.get_pixel(x0, y1);
    let p11 = raster.get_pixel(x1, y1);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = p00[c] as f32 * (1.0 - fx) + p10[c] as f32 * fx;
        let bottom = p01[c] as f32 * (1.0 - fx) + p11[c] as f32 * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotated_dimensions() {
        assert_eq!(rotated_dimensions(100, 50, 90.0), (50, 100));
        assert_eq!(rotated_dimensions(100, 50, 180.0), (100, 50));
        assert_eq!(rotated_dimensions(100, 50, 5.0), (104, 59));
        assert_eq!(rotated_dimensions(100, 50, 355.0), (104, 59));
    }

    #[test]
    fn test_quarter_turn_moves_pixels() {
        let mut raster = RgbImage::from_pixel(4, 2, Rgb([255, 255, 255]));
        raster.put_pixel(0, 0, Rgb([0, 0, 0]));

        let rotated = rotate(&raster, 90.0);
        assert_eq!(rotated.dimensions(), (2, 4));
        // Top-left goes to top-right on a clockwise turn
        assert_eq!(rotated.get_pixel(1, 0), &Rgb([0, 0, 0]));

        let back = rotate(&rotate(&rotated, 180.0), 90.0);
        assert_eq!(back, raster);
    }

    #[test]
    fn test_small_angle_enlarges_and_keeps_center() {
        let mut raster = RgbImage::from_pixel(40, 20, Rgb([255, 255, 255]));
        for y in 8..12 {
            for x in 18..22 {
                raster.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }

        let rotated = rotate(&raster, 5.0);
        assert_eq!(rotated.dimensions(), rotated_dimensions(40, 20, 5.0));
        let (w, h) = rotated.dimensions();
        assert!(w > 40 && h > 20);
        assert_eq!(rotated.get_pixel(w / 2, h / 2), &Rgb([0, 0, 0]));
        assert_eq!(rotated.get_pixel(0, 0), &Rgb([255, 255, 255]));
    }
}
