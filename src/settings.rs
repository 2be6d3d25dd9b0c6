//! Settings management for Panorama Skybox
//!
//! Handles loading/saving of user preferences in the config directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::converter::ConvertOptions;
use crate::cubemap::{ReprojectOptions, SampleFilter, DEFAULT_FACE_SIZE};
use crate::export::{ExportOptions, FaceFormat, DEFAULT_JPEG_QUALITY};

/// Smallest face size accepted from stored preferences.
pub const MIN_FACE_SIZE: u32 = 16;
/// Largest face size accepted from stored preferences.
pub const MAX_FACE_SIZE: u32 = 8192;

/// Output container stored in preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
}

impl OutputFormat {
    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            OutputFormat::Png => "PNG",
            OutputFormat::Jpeg => "JPEG",
        }
    }
}

fn default_face_size() -> u32 {
    DEFAULT_FACE_SIZE
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

fn default_true() -> bool {
    true
}

/// Application preferences (stored in config directory)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// Per-face resolution in pixels
    #[serde(default = "default_face_size")]
    pub face_size: u32,

    /// Sampling filter
    #[serde(default)]
    pub filter: SampleFilter,

    /// Face image container
    #[serde(default)]
    pub format: OutputFormat,

    /// JPEG quality (1-100), only used for JPEG output
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Write the six-face strip atlas
    #[serde(default)]
    pub write_strip: bool,

    /// Write manifest.json next to the faces
    #[serde(default = "default_true")]
    pub write_manifest: bool,

    /// Last output folder used by the converter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_output_dir: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            face_size: DEFAULT_FACE_SIZE,
            filter: SampleFilter::Nearest,
            format: OutputFormat::Png,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            write_strip: false,
            write_manifest: true,
            last_output_dir: None,
        }
    }
}

impl Preferences {
    /// Get the preferences file path
    pub fn prefs_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("PanoramaSkybox");
            p.push("preferences.json");
            p
        })
    }

    /// Clamp values to supported ranges
    pub fn sanitize(&mut self) {
        self.face_size = self.face_size.clamp(MIN_FACE_SIZE, MAX_FACE_SIZE);
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
    }

    /// Load preferences from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(SettingsError::Io)?;
        let mut prefs: Self = serde_json::from_str(&contents).map_err(SettingsError::Json)?;
        prefs.sanitize();
        Ok(prefs)
    }

    /// Save preferences to a specific file
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(SettingsError::Io)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(SettingsError::Json)?;
        fs::write(path, json).map_err(SettingsError::Io)?;
        Ok(())
    }

    /// Load preferences from config directory
    pub fn load() -> Self {
        let Some(path) = Self::prefs_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from_file(&path) {
            Ok(prefs) => prefs,
            Err(e) => {
                log::warn!("Ignoring unreadable preferences {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save preferences to config directory
    pub fn save(&self) -> Result<(), SettingsError> {
        let Some(path) = Self::prefs_path() else {
            return Err(SettingsError::NoConfigDir);
        };
        self.save_to_file(&path)
    }

    /// Face container for export
    pub fn face_format(&self) -> FaceFormat {
        match self.format {
            OutputFormat::Png => FaceFormat::Png,
            OutputFormat::Jpeg => FaceFormat::Jpeg {
                quality: self.jpeg_quality,
            },
        }
    }

    /// Conversion options described by these preferences
    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            reproject: ReprojectOptions::default()
                .with_face_size(self.face_size)
                .with_filter(self.filter),
            export: ExportOptions {
                format: self.face_format(),
                write_strip: self.write_strip,
                write_manifest: self.write_manifest,
            },
        }
    }

    /// Set the last output directory (not saved)
    pub fn set_last_output_dir(&mut self, path: &Path) {
        self.last_output_dir = Some(path.to_string_lossy().to_string());
    }

    /// Store `output_dir` as the last output directory in the preferences file
    /// at `prefs_file`. Every other stored option keeps its saved value.
    pub fn record_last_output_dir_in(prefs_file: &Path, output_dir: &Path) -> Result<(), SettingsError> {
        let mut stored = if prefs_file.exists() {
            Self::load_from_file(prefs_file)?
        } else {
            Self::default()
        };
        stored.set_last_output_dir(output_dir);
        stored.save_to_file(prefs_file)
    }

    /// Store `output_dir` as the last output directory in the config directory.
    pub fn record_last_output_dir(output_dir: &Path) -> Result<(), SettingsError> {
        let Some(path) = Self::prefs_path() else {
            return Err(SettingsError::NoConfigDir);
        };
        Self::record_last_output_dir_in(&path, output_dir)
    }

    /// Get the last output directory if it still exists
    pub fn get_last_output_dir(&self) -> Option<PathBuf> {
        self.last_output_dir.as_ref().map(PathBuf::from).filter(|p| p.exists())
    }
}

/// Settings-related errors
#[derive(Debug)]
pub enum SettingsError {
    Io(std::io::Error),
    Json(serde_json::Error),
    NoConfigDir,
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "IO error: {}", e),
            SettingsError::Json(e) => write!(f, "JSON error: {}", e),
            SettingsError::NoConfigDir => write!(f, "Could not find config directory"),
        }
    }
}

impl std::error::Error for SettingsError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("panorama-skybox-settings-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_default_preferences() {
        let prefs = Preferences::default();
        assert_eq!(prefs.face_size, 512);
        assert_eq!(prefs.filter, SampleFilter::Nearest);
        assert_eq!(prefs.format, OutputFormat::Png);
        assert!(prefs.write_manifest);
        assert!(prefs.last_output_dir.is_none());
    }

    #[test]
    fn test_sanitize_clamps() {
        let mut prefs = Preferences {
            face_size: 1,
            jpeg_quality: 0,
            ..Preferences::default()
        };
        prefs.sanitize();
        assert_eq!(prefs.face_size, MIN_FACE_SIZE);
        assert_eq!(prefs.jpeg_quality, 1);

        prefs.face_size = 100_000;
        prefs.sanitize();
        assert_eq!(prefs.face_size, MAX_FACE_SIZE);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let prefs: Preferences = serde_json::from_str(r#"{ "faceSize": 1024, "filter": "bilinear" }"#).unwrap();
        assert_eq!(prefs.face_size, 1024);
        assert_eq!(prefs.filter, SampleFilter::Bilinear);
        assert_eq!(prefs.jpeg_quality, DEFAULT_JPEG_QUALITY);
        assert!(prefs.write_manifest);
    }

    #[test]
    fn test_file_round_trip() {
        let path = temp_file("round_trip.json");
        let prefs = Preferences {
            face_size: 2048,
            format: OutputFormat::Jpeg,
            jpeg_quality: 75,
            write_strip: true,
            last_output_dir: Some("/tmp/faces".to_string()),
            ..Preferences::default()
        };
        prefs.save_to_file(&path).unwrap();
        let loaded = Preferences::load_from_file(&path).unwrap();
        assert_eq!(loaded, prefs);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_convert_options_from_preferences() {
        let prefs = Preferences {
            face_size: 256,
            filter: SampleFilter::Bilinear,
            format: OutputFormat::Jpeg,
            jpeg_quality: 60,
            ..Preferences::default()
        };
        let options = prefs.convert_options();
        assert_eq!(options.reproject.face_size, 256);
        assert_eq!(options.reproject.filter, SampleFilter::Bilinear);
        assert_eq!(options.export.format, FaceFormat::Jpeg { quality: 60 });
        assert!(options.export.write_manifest);
    }

    #[test]
    fn test_recording_output_dir_keeps_stored_options() {
        let path = temp_file("last_dir.json");
        let stored = Preferences {
            face_size: 1024,
            ..Preferences::default()
        };
        stored.save_to_file(&path).unwrap();

        Preferences::record_last_output_dir_in(&path, Path::new("/tmp/run-output")).unwrap();

        let loaded = Preferences::load_from_file(&path).unwrap();
        assert_eq!(loaded.face_size, 1024);
        assert_eq!(loaded.filter, SampleFilter::Nearest);
        assert_eq!(loaded.format, OutputFormat::Png);
        assert_eq!(loaded.last_output_dir.as_deref(), Some("/tmp/run-output"));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_recording_output_dir_without_file() {
        let path = temp_file("fresh/last_dir.json");
        let _ = fs::remove_file(&path);

        Preferences::record_last_output_dir_in(&path, Path::new("/tmp/first")).unwrap();

        let loaded = Preferences::load_from_file(&path).unwrap();
        assert_eq!(loaded.face_size, DEFAULT_FACE_SIZE);
        assert_eq!(loaded.last_output_dir.as_deref(), Some("/tmp/first"));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_invalid_json_is_error() {
        let path = temp_file("broken.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Preferences::load_from_file(&path), Err(SettingsError::Json(_))));
        let _ = fs::remove_file(&path);
    }
}
