//! Panorama Skybox
//!
//! Converts equirectangular 360° panoramas into the six faces of a skybox
//! cube:
//! - Direction-vector reprojection with a fixed per-face axis table
//! - Nearest-neighbour (reference) or bilinear sampling
//! - PNG/JPEG face export with an optional strip atlas and JSON manifest
//! - Background batch conversion queue

pub mod converter;
pub mod cubemap;
pub mod error;
pub mod export;
pub mod settings;
pub mod source;

pub use converter::{convert_file, ConversionJob, ConvertOptions, JobId, JobQueue, JobStatus, WorkerEvent};
pub use cubemap::{reproject_to_cube_faces, CubeFace, CubeFaces, ReprojectOptions, SampleFilter, DEFAULT_FACE_SIZE};
pub use error::SkyboxError;
pub use export::{export_face_set, ExportOptions, ExportSummary, FaceFormat, FaceSetManifest};
pub use settings::Preferences;
pub use source::{load_equirect, load_equirect_from_bytes, SourceInfo};
