//! Conversion job definition.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use super::{face_set_dir, ConvertOptions};
use crate::source::SourceInfo;

/// Unique identifier for a conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl JobId {
    /// Allocate the next job ID.
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        JobId(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

/// Status of a conversion job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    /// Job is waiting in queue
    Pending,
    /// Job is currently being converted
    Converting { started_at: Instant },
    /// Job completed successfully
    Complete { duration: Duration, bytes_written: u64 },
    /// Job failed with an error
    Failed { error: String },
    /// Job was cancelled before it started
    Cancelled,
}

impl JobStatus {
    /// Check if the job is finished (complete, failed, or cancelled).
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Complete { .. } | JobStatus::Failed { .. } | JobStatus::Cancelled)
    }

    /// Check if the job is currently active.
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Converting { .. })
    }

    /// Get a display string for the status.
    pub fn display(&self) -> String {
        match self {
            JobStatus::Pending => "Pending".to_string(),
            JobStatus::Converting { started_at } => {
                format!("Converting ({:.1}s)", started_at.elapsed().as_secs_f64())
            }
            JobStatus::Complete { duration, bytes_written } => {
                format!("Done ({:.1}s, {} KB)", duration.as_secs_f64(), bytes_written / 1024)
            }
            JobStatus::Failed { error } => format!("Failed: {}", error),
            JobStatus::Cancelled => "Cancelled".to_string(),
        }
    }
}

/// A panorama to be converted.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    /// Unique job identifier
    pub id: JobId,
    /// Panorama file
    pub input_path: PathBuf,
    /// Directory the face set is written to
    pub output_dir: PathBuf,
    /// Reprojection and export settings
    pub options: ConvertOptions,
    /// Current status
    pub status: JobStatus,
    /// Panorama dimensions (if probed)
    pub source_info: Option<SourceInfo>,
}

impl ConversionJob {
    /// Create a new conversion job writing into `<output_root>/<file stem>`.
    pub fn new(input_path: PathBuf, output_root: &std::path::Path, options: ConvertOptions) -> Self {
        let output_dir = face_set_dir(&input_path, output_root);
        Self {
            id: JobId::new(),
            input_path,
            output_dir,
            options,
            status: JobStatus::Pending,
            source_info: None,
        }
    }

    /// Get the input file name.
    pub fn input_filename(&self) -> String {
        self.input_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// Get the resolution string (e.g., "4096x2048").
    pub fn resolution_string(&self) -> String {
        self.source_info
            .as_ref()
            .map(SourceInfo::resolution_string)
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// Mark the job as converting.
    pub fn start(&mut self) {
        self.status = JobStatus::Converting { started_at: Instant::now() };
    }

    /// Mark the job as complete.
    pub fn complete(&mut self, bytes_written: u64) {
        if let JobStatus::Converting { started_at } = &self.status {
            self.status = JobStatus::Complete {
                duration: started_at.elapsed(),
                bytes_written,
            };
        }
    }

    /// Mark the job as failed.
    pub fn fail(&mut self, error: String) {
        self.status = JobStatus::Failed { error };
    }

    /// Cancel the job if it has not started yet.
    pub fn cancel(&mut self) -> bool {
        if matches!(self.status, JobStatus::Pending) {
            self.status = JobStatus::Cancelled;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn job() -> ConversionJob {
        ConversionJob::new(PathBuf::from("/pano/hall.jpg"), Path::new("/out"), ConvertOptions::default())
    }

    #[test]
    fn test_job_ids_are_unique() {
        assert_ne!(JobId::new(), JobId::new());
    }

    #[test]
    fn test_job_lifecycle() {
        let mut job = job();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.output_dir, PathBuf::from("/out/hall"));
        assert_eq!(job.input_filename(), "hall.jpg");
        assert_eq!(job.resolution_string(), "Unknown");

        job.start();
        assert!(job.status.is_active());
        assert!(!job.cancel());

        job.complete(4096);
        assert!(job.status.is_finished());
        assert!(matches!(job.status, JobStatus::Complete { bytes_written: 4096, .. }));
    }

    #[test]
    fn test_complete_requires_start() {
        let mut job = job();
        job.complete(10);
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[test]
    fn test_cancel_pending() {
        let mut job = job();
        assert!(job.cancel());
        assert_eq!(job.status.display(), "Cancelled");
        assert!(job.status.is_finished());
    }

    #[test]
    fn test_failed_display() {
        let mut job = job();
        job.fail("boom".to_string());
        assert_eq!(job.status.display(), "Failed: boom");
    }
}
