//! Panorama loading.

use std::io::Cursor;
use std::path::Path;

use image::{ImageReader, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SkyboxError};

/// Tolerance on the 2:1 aspect ratio before a panorama is reported as non-equirectangular.
const EQUIRECT_ASPECT_TOLERANCE: f64 = 0.01;

/// Dimensions of a panorama.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
}

impl SourceInfo {
    pub fn of(image: &RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height }
    }

    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }

    /// Whether the image is 2:1 within 1%.
    pub fn is_equirectangular(&self) -> bool {
        (self.aspect_ratio() / 2.0 - 1.0).abs() <= EQUIRECT_ASPECT_TOLERANCE
    }

    pub fn resolution_string(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Decode a panorama file into RGBA pixels.
pub fn load_equirect(path: &Path) -> Result<RgbaImage> {
    let bytes = std::fs::read(path).map_err(|e| SkyboxError::io(path, e))?;
    let image = load_equirect_from_bytes(&bytes)?;
    log::info!("Loaded panorama {} ({}x{})", path.display(), image.width(), image.height());
    Ok(image)
}

/// Decode an in-memory panorama into RGBA pixels. The container format is
/// detected from the content, not from a file name.
pub fn load_equirect_from_bytes(bytes: &[u8]) -> Result<RgbaImage> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| SkyboxError::ImageDecode(e.to_string()))?;

    if reader.format().is_none() {
        return Err(SkyboxError::UnsupportedFormat(
            "unrecognised image container".to_string(),
        ));
    }

    let image = reader.decode().map_err(SkyboxError::from_image)?;
    Ok(image.to_rgba8())
}

/// Read panorama dimensions from the file header without decoding pixels.
pub fn probe(path: &Path) -> Result<SourceInfo> {
    let reader = ImageReader::open(path)
        .map_err(|e| SkyboxError::io(path, e))?
        .with_guessed_format()
        .map_err(|e| SkyboxError::io(path, e))?;

    if reader.format().is_none() {
        return Err(SkyboxError::UnsupportedFormat(format!(
            "unrecognised image container: {}",
            path.display()
        )));
    }

    let (width, height) = reader.into_dimensions().map_err(SkyboxError::from_image)?;
    Ok(SourceInfo { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([1, 2, 3, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_png_bytes() {
        let image = load_equirect_from_bytes(&png_bytes(8, 4)).unwrap();
        assert_eq!(image.dimensions(), (8, 4));
        assert_eq!(image.get_pixel(3, 2).0, [1, 2, 3, 255]);
    }

    #[test]
    fn test_garbage_is_unsupported() {
        let result = load_equirect_from_bytes(b"definitely not an image");
        assert!(matches!(result, Err(SkyboxError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_truncated_png_is_decode_error() {
        let bytes = png_bytes(32, 16);
        let result = load_equirect_from_bytes(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(SkyboxError::ImageDecode(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_equirect(Path::new("/nonexistent/panorama.jpg"));
        assert!(matches!(result, Err(SkyboxError::Io { .. })));
    }

    #[test]
    fn test_source_info_aspect() {
        assert!(SourceInfo { width: 4096, height: 2048 }.is_equirectangular());
        assert!(SourceInfo { width: 4100, height: 2048 }.is_equirectangular());
        assert!(!SourceInfo { width: 1920, height: 1080 }.is_equirectangular());
        assert_eq!(SourceInfo { width: 0, height: 0 }.aspect_ratio(), 0.0);
        assert_eq!(SourceInfo { width: 16, height: 8 }.resolution_string(), "16x8");
    }
}
