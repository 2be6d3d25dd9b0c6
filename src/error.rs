//! Error types for panorama loading, reprojection and export.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while converting a panorama to cube faces.
#[derive(Error, Debug)]
pub enum SkyboxError {
    #[error("Failed to decode panorama image: {0}")]
    ImageDecode(String),
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Panorama pixel data cannot be read: {0}")]
    PixelAccess(String),
    #[error("Face size must be at least 1 pixel (got {0})")]
    InvalidFaceSize(u32),
    #[error("Panorama has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
    #[error("Failed to encode {face} face: {message}")]
    Encode { face: String, message: String },
    #[error("Converter worker unavailable: {0}")]
    Worker(String),
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SkyboxError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SkyboxError::Io {
            path: path.into(),
            source,
        }
    }

    /// Map an `image` crate error onto the load-time taxonomy.
    pub(crate) fn from_image(error: image::ImageError) -> Self {
        use image::ImageError;

        match error {
            ImageError::Unsupported(e) => SkyboxError::UnsupportedFormat(e.to_string()),
            ImageError::Limits(e) => SkyboxError::PixelAccess(e.to_string()),
            ImageError::Decoding(e) => SkyboxError::ImageDecode(e.to_string()),
            ImageError::Parameter(e) => SkyboxError::ImageDecode(e.to_string()),
            ImageError::Encoding(e) => SkyboxError::ImageDecode(e.to_string()),
            ImageError::IoError(e) => SkyboxError::ImageDecode(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SkyboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_map_to_pixel_access() {
        let err = image::ImageError::Limits(image::error::LimitError::from_kind(
            image::error::LimitErrorKind::DimensionError,
        ));
        assert!(matches!(SkyboxError::from_image(err), SkyboxError::PixelAccess(_)));
    }
}
