//! Panorama Converter Module
//!
//! Converts equirectangular panoramas into skybox face sets, one file at a
//! time or as a queued batch on a background worker.

mod job;
mod queue;

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::cubemap::{reproject_to_cube_faces, ReprojectOptions};
use crate::error::Result;
use crate::export::{export_face_set, ExportOptions, ExportSummary};
use crate::source::{load_equirect, SourceInfo};

pub use job::{ConversionJob, JobId, JobStatus};
pub use queue::{JobQueue, WorkerEvent};

/// Everything needed to turn one panorama into a face set on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConvertOptions {
    pub reproject: ReprojectOptions,
    pub export: ExportOptions,
}

/// Directory a panorama's faces are written to: `<output_dir>/<file stem>`.
pub fn face_set_dir(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "panorama".to_string());
    output_dir.join(stem)
}

/// Load, reproject and export a single panorama into `<output_dir>/<file stem>`.
pub fn convert_file(input: &Path, output_dir: &Path, options: &ConvertOptions) -> Result<ExportSummary> {
    convert_to_dir(input, &face_set_dir(input, output_dir), options)
}

/// Load, reproject and export a single panorama into `face_dir`.
pub fn convert_to_dir(input: &Path, face_dir: &Path, options: &ConvertOptions) -> Result<ExportSummary> {
    let started = Instant::now();

    let source = load_equirect(input)?;
    let info = SourceInfo::of(&source);
    let faces = reproject_to_cube_faces(&source, &options.reproject)?;
    drop(source);

    let summary = export_face_set(
        &faces,
        face_dir,
        &options.export,
        &options.reproject,
        info,
        Some(input),
    )?;

    log::info!(
        "Converted {} in {:.2}s",
        input.display(),
        started.elapsed().as_secs_f64()
    );
    Ok(summary)
}
