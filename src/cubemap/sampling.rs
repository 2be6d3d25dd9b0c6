//! Panorama sampling filters.

use std::fmt;

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use super::projection::equirect_to_pixel;

/// How a face pixel is reconstructed from the panorama.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SampleFilter {
    /// Single nearest source pixel. Aliases at face edges and poles.
    #[default]
    Nearest,
    /// Weighted blend of the four surrounding source pixels, clamped to the
    /// panorama edges like the nearest filter.
    Bilinear,
}

impl SampleFilter {
    pub fn name(&self) -> &'static str {
        match self {
            SampleFilter::Nearest => "nearest",
            SampleFilter::Bilinear => "bilinear",
        }
    }

    /// Sample `source` at texture coordinates `(u, v)`. Alpha is always 255.
    pub fn sample(&self, source: &RgbaImage, u: f64, v: f64) -> Rgba<u8> {
        match self {
            SampleFilter::Nearest => sample_nearest(source, u, v),
            SampleFilter::Bilinear => sample_bilinear(source, u, v),
        }
    }
}

impl fmt::Display for SampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn sample_nearest(source: &RgbaImage, u: f64, v: f64) -> Rgba<u8> {
    let (x, y) = equirect_to_pixel(u, v, source.width(), source.height());
    let [r, g, b, _] = source.get_pixel(x, y).0;
    Rgba([r, g, b, 255])
}

fn sample_bilinear(source: &RgbaImage, u: f64, v: f64) -> Rgba<u8> {
    let (width, height) = source.dimensions();
    let max_x = width.saturating_sub(1) as f64;
    let max_y = height.saturating_sub(1) as f64;

    let fx = (u * max_x).clamp(0.0, max_x);
    let fy = (v * max_y).clamp(0.0, max_y);
    // NaN coordinates fall back to the origin like the nearest filter.
    let (fx, fy) = (if fx.is_nan() { 0.0 } else { fx }, if fy.is_nan() { 0.0 } else { fy });

    let x0 = fx.floor() as u32;
    let y0 = fy.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let tx = fx - x0 as f64;
    let ty = fy - y0 as f64;

    let p00 = source.get_pixel(x0, y0).0;
    let p10 = source.get_pixel(x1, y0).0;
    let p01 = source.get_pixel(x0, y1).0;
    let p11 = source.get_pixel(x1, y1).0;

    let mut out = [0u8, 0, 0, 255];
    for c in 0..3 {
        let top = p00[c] as f64 * (1.0 - tx) + p10[c] as f64 * tx;
        let bottom = p01[c] as f64 * (1.0 - tx) + p11[c] as f64 * tx;
        let value = top * (1.0 - ty) + bottom * ty;
        out[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| Rgba([(x * 10) as u8, (y * 10) as u8, 7, 40]))
    }

    #[test]
    fn test_nearest_forces_opaque() {
        let img = gradient(16, 8);
        let px = SampleFilter::Nearest.sample(&img, 0.5, 0.5);
        assert_eq!(px, Rgba([70, 30, 7, 255]));
    }

    #[test]
    fn test_bilinear_matches_nearest_on_grid_points() {
        let img = gradient(17, 9);
        // u * 16 = 4 and v * 8 = 4 exactly.
        let (u, v) = (0.25, 0.5);
        let nearest = SampleFilter::Nearest.sample(&img, u, v);
        let bilinear = SampleFilter::Bilinear.sample(&img, u, v);
        assert_eq!(nearest, bilinear);
    }

    #[test]
    fn test_bilinear_blends_neighbours() {
        let img = RgbaImage::from_fn(3, 2, |x, _| {
            if x == 0 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([200, 200, 200, 255])
            }
        });
        // Halfway between column 0 and column 1.
        let px = SampleFilter::Bilinear.sample(&img, 0.25, 0.0);
        assert_eq!(px.0, [100, 100, 100, 255]);
    }

    #[test]
    fn test_bilinear_single_pixel_image() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([9, 8, 7, 0]));
        assert_eq!(SampleFilter::Bilinear.sample(&img, 0.9, 0.1).0, [9, 8, 7, 255]);
    }

    #[test]
    fn test_bilinear_clamps_at_seam() {
        let img = RgbaImage::from_fn(4, 2, |x, _| {
            if x == 0 {
                Rgba([250, 0, 0, 255])
            } else {
                Rgba([0, 0, 50, 255])
            }
        });
        // Right edge and just past it: the last column, never blended with column 0.
        assert_eq!(SampleFilter::Bilinear.sample(&img, 1.0, 0.0).0, [0, 0, 50, 255]);
        assert_eq!(SampleFilter::Bilinear.sample(&img, 1.2, 0.5).0, [0, 0, 50, 255]);
        assert_eq!(
            SampleFilter::Bilinear.sample(&img, 1.0, 0.0),
            SampleFilter::Nearest.sample(&img, 1.0, 0.0)
        );
    }
}
