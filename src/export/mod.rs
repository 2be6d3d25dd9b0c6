//! Export module for cube face sets.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::cubemap::{CubeFace, CubeFaces, ReprojectOptions, SampleFilter};
use crate::error::{Result, SkyboxError};
use crate::source::SourceInfo;

/// Default JPEG quality for exported faces.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// File name of the face set manifest.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Image container used for exported faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FaceFormat {
    /// Lossless, the default.
    Png,
    /// Lossy, alpha channel dropped.
    Jpeg { quality: u8 },
}

impl Default for FaceFormat {
    fn default() -> Self {
        FaceFormat::Png
    }
}

impl FaceFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FaceFormat::Png => "png",
            FaceFormat::Jpeg { .. } => "jpg",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            FaceFormat::Png => "PNG",
            FaceFormat::Jpeg { .. } => "JPEG",
        }
    }
}

/// What gets written alongside the six faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    pub format: FaceFormat,
    /// Also write a `strip.<ext>` atlas with all faces side by side.
    pub write_strip: bool,
    /// Also write `manifest.json` describing the face set.
    pub write_manifest: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: FaceFormat::Png,
            write_strip: false,
            write_manifest: true,
        }
    }
}

/// Description of an exported face set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceSetManifest {
    /// Panorama the faces were generated from, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub source_width: u32,
    pub source_height: u32,
    pub face_size: u32,
    pub filter: SampleFilter,
    pub format: FaceFormat,
    /// Face name to file name, relative to the manifest.
    pub faces: BTreeMap<CubeFace, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strip: Option<String>,
}

impl FaceSetManifest {
    /// Load a manifest written by [`export_face_set`].
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| SkyboxError::io(path, e))?;
        serde_json::from_str(&contents)
            .map_err(|e| SkyboxError::io(path, std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }
}

/// Result of writing a face set to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub output_dir: PathBuf,
    /// Face image paths in cube-mesh order.
    pub face_paths: Vec<PathBuf>,
    pub strip_path: Option<PathBuf>,
    pub manifest_path: Option<PathBuf>,
    pub bytes_written: u64,
}

/// Encode a single face image.
pub fn encode_face(image: &RgbaImage, format: FaceFormat) -> std::result::Result<Vec<u8>, image::ImageError> {
    let mut out = Cursor::new(Vec::new());
    match format {
        FaceFormat::Png => image.write_to(&mut out, ImageFormat::Png)?,
        FaceFormat::Jpeg { quality } => {
            let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
            rgb.write_with_encoder(encoder)?;
        }
    }
    Ok(out.into_inner())
}

fn encode_named(name: &str, image: &RgbaImage, format: FaceFormat) -> Result<Vec<u8>> {
    encode_face(image, format).map_err(|e| SkyboxError::Encode {
        face: name.to_string(),
        message: e.to_string(),
    })
}

/// Write a face set to `output_dir` as `<face>.<ext>`.
///
/// All images are encoded before anything is written, so an encoding
/// failure leaves the directory untouched.
pub fn export_face_set(
    faces: &CubeFaces,
    output_dir: &Path,
    options: &ExportOptions,
    reproject: &ReprojectOptions,
    source: SourceInfo,
    source_path: Option<&Path>,
) -> Result<ExportSummary> {
    let ext = options.format.extension();

    let mut encoded: Vec<(PathBuf, Vec<u8>)> = Vec::with_capacity(8);
    let mut face_paths = Vec::with_capacity(CubeFace::ALL.len());
    let mut manifest_faces = BTreeMap::new();
    for (face, image) in faces.iter() {
        let file_name = format!("{}.{}", face.name(), ext);
        let path = output_dir.join(&file_name);
        encoded.push((path.clone(), encode_named(face.name(), image, options.format)?));
        face_paths.push(path);
        manifest_faces.insert(face, file_name);
    }

    let strip_name = format!("strip.{}", ext);
    let strip_path = if options.write_strip {
        let path = output_dir.join(&strip_name);
        encoded.push((path.clone(), encode_named("strip", &faces.to_strip(), options.format)?));
        Some(path)
    } else {
        None
    };

    let manifest_path = if options.write_manifest {
        let manifest = FaceSetManifest {
            source: source_path.map(|p| p.to_string_lossy().to_string()),
            source_width: source.width,
            source_height: source.height,
            face_size: faces.face_size(),
            filter: reproject.filter,
            format: options.format,
            faces: manifest_faces,
            strip: options.write_strip.then(|| strip_name.clone()),
        };
        let json = serde_json::to_string_pretty(&manifest).map_err(|e| SkyboxError::Encode {
            face: "manifest".to_string(),
            message: e.to_string(),
        })?;
        let path = output_dir.join(MANIFEST_FILE);
        encoded.push((path.clone(), json.into_bytes()));
        Some(path)
    } else {
        None
    };

    std::fs::create_dir_all(output_dir).map_err(|e| SkyboxError::io(output_dir, e))?;

    let mut bytes_written = 0u64;
    for (path, data) in &encoded {
        std::fs::write(path, data).map_err(|e| SkyboxError::io(path, e))?;
        bytes_written += data.len() as u64;
        log::debug!("Wrote {} ({} bytes)", path.display(), data.len());
    }

    log::info!(
        "Exported {} face set to {} ({} bytes)",
        options.format.display_name(),
        output_dir.display(),
        bytes_written
    );

    Ok(ExportSummary {
        output_dir: output_dir.to_path_buf(),
        face_paths,
        strip_path,
        manifest_path,
        bytes_written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cubemap::reproject_to_cube_faces;
    use image::Rgba;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn temp_dir(name: &str) -> PathBuf {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let dir = std::env::temp_dir().join(format!(
            "panorama-skybox-export-{}-{}-{}",
            name,
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::SeqCst)
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn sample_faces(face_size: u32) -> (CubeFaces, SourceInfo) {
        let source = RgbaImage::from_fn(32, 16, |x, y| Rgba([(x * 8) as u8, (y * 16) as u8, 99, 255]));
        let options = ReprojectOptions::default().with_face_size(face_size);
        (reproject_to_cube_faces(&source, &options).unwrap(), SourceInfo::of(&source))
    }

    #[test]
    fn test_png_round_trip_is_lossless() {
        let (faces, _) = sample_faces(8);
        let front = faces.get(CubeFace::Front);
        let bytes = encode_face(front, FaceFormat::Png).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.as_raw(), front.as_raw());
    }

    #[test]
    fn test_jpeg_encodes() {
        let (faces, _) = sample_faces(16);
        let bytes = encode_face(faces.get(CubeFace::Top), FaceFormat::Jpeg { quality: 80 }).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_export_writes_faces_and_manifest() {
        let (faces, info) = sample_faces(8);
        let dir = temp_dir("faces");
        let options = ExportOptions {
            format: FaceFormat::Png,
            write_strip: true,
            write_manifest: true,
        };

        let summary = export_face_set(
            &faces,
            &dir,
            &options,
            &ReprojectOptions::default(),
            info,
            Some(Path::new("pano.png")),
        )
        .unwrap();

        assert_eq!(summary.face_paths.len(), 6);
        for face in CubeFace::ALL {
            assert!(dir.join(format!("{}.png", face.name())).is_file());
        }
        assert!(dir.join("strip.png").is_file());
        assert!(summary.bytes_written > 0);

        let manifest = FaceSetManifest::load(&dir.join(MANIFEST_FILE)).unwrap();
        assert_eq!(manifest.face_size, 8);
        assert_eq!(manifest.source_width, 32);
        assert_eq!(manifest.faces[&CubeFace::Bottom], "bottom.png");
        assert_eq!(manifest.strip.as_deref(), Some("strip.png"));
        assert_eq!(manifest.source.as_deref(), Some("pano.png"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_export_without_extras() {
        let (faces, info) = sample_faces(4);
        let dir = temp_dir("plain");
        let options = ExportOptions {
            format: FaceFormat::Jpeg { quality: 70 },
            write_strip: false,
            write_manifest: false,
        };

        let summary =
            export_face_set(&faces, &dir, &options, &ReprojectOptions::default(), info, None).unwrap();

        assert!(summary.strip_path.is_none());
        assert!(summary.manifest_path.is_none());
        assert!(dir.join("left.jpg").is_file());
        assert!(!dir.join(MANIFEST_FILE).exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_manifest_serialization_uses_face_names() {
        let mut faces = BTreeMap::new();
        faces.insert(CubeFace::Front, "front.png".to_string());
        let manifest = FaceSetManifest {
            source: None,
            source_width: 2,
            source_height: 1,
            face_size: 1,
            filter: SampleFilter::Nearest,
            format: FaceFormat::Jpeg { quality: 90 },
            faces,
            strip: None,
        };
        let json = serde_json::to_string(&manifest).unwrap();
        assert!(json.contains("\"front\":\"front.png\""));
        assert!(json.contains("\"filter\":\"nearest\""));
        assert!(json.contains("\"type\":\"jpeg\""));
        assert!(!json.contains("strip"));
    }
}
