//! Job queue management with background worker.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

use super::job::{ConversionJob, JobId, JobStatus};
use super::{convert_to_dir, face_set_dir, ConvertOptions};
use crate::error::{Result, SkyboxError};
use crate::source::probe;

/// How often a blocked caller checks that the worker is still alive.
const WORKER_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Commands sent to the worker thread.
#[derive(Debug)]
enum WorkerCommand {
    /// Process pending jobs until none remain
    ProcessNext,
    /// Stop the worker thread
    Stop,
}

/// Events from the worker thread.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// Job started processing
    JobStarted(JobId),
    /// Job completed successfully
    JobCompleted(JobId, u64), // bytes written
    /// Job failed with error
    JobFailed(JobId, String),
    /// Pending job was cancelled
    JobCancelled(JobId),
    /// Worker is idle (no more jobs)
    Idle,
}

type SharedJobs = Arc<Mutex<VecDeque<ConversionJob>>>;

fn lock(jobs: &Mutex<VecDeque<ConversionJob>>) -> MutexGuard<'_, VecDeque<ConversionJob>> {
    jobs.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Thread-safe job queue.
pub struct JobQueue {
    /// All jobs (pending, active, and finished)
    jobs: SharedJobs,
    /// Command channel to worker
    command_tx: Sender<WorkerCommand>,
    /// Event channel from worker
    event_rx: Receiver<WorkerEvent>,
    /// Event sender for events raised on the caller's thread
    event_tx: Sender<WorkerEvent>,
    /// Worker thread handle
    worker_handle: Option<JoinHandle<()>>,
    /// Root directory for face sets
    output_dir: PathBuf,
    /// Options applied to new jobs
    pub options: ConvertOptions,
    /// Whether the worker is processing
    pub is_running: bool,
}

impl JobQueue {
    /// Create a new job queue with a background worker.
    pub fn new(output_dir: PathBuf, options: ConvertOptions) -> Result<Self> {
        let (command_tx, command_rx) = unbounded::<WorkerCommand>();
        let (event_tx, event_rx) = unbounded::<WorkerEvent>();
        let jobs: SharedJobs = Arc::new(Mutex::new(VecDeque::new()));
        let jobs_clone = Arc::clone(&jobs);
        let worker_events = event_tx.clone();

        let worker_handle = thread::Builder::new()
            .name("skybox-converter".to_string())
            .spawn(move || Self::worker_loop(jobs_clone, command_rx, worker_events))
            .map_err(|e| SkyboxError::Worker(format!("failed to spawn thread: {}", e)))?;

        Ok(Self {
            jobs,
            command_tx,
            event_rx,
            event_tx,
            worker_handle: Some(worker_handle),
            output_dir,
            options,
            is_running: false,
        })
    }

    /// Worker thread main loop.
    fn worker_loop(jobs: SharedJobs, command_rx: Receiver<WorkerCommand>, event_tx: Sender<WorkerEvent>) {
        while let Ok(command) = command_rx.recv() {
            match command {
                WorkerCommand::Stop => return,
                WorkerCommand::ProcessNext => loop {
                    match command_rx.try_recv() {
                        Ok(WorkerCommand::Stop) | Err(TryRecvError::Disconnected) => return,
                        Ok(WorkerCommand::ProcessNext) | Err(TryRecvError::Empty) => {}
                    }

                    let next = {
                        let mut jobs_lock = lock(&jobs);
                        jobs_lock
                            .iter_mut()
                            .find(|j| matches!(j.status, JobStatus::Pending))
                            .map(|j| {
                                j.start();
                                (j.id, j.input_path.clone(), j.output_dir.clone(), j.options)
                            })
                    };

                    let Some((id, input, output_dir, options)) = next else {
                        let _ = event_tx.send(WorkerEvent::Idle);
                        break;
                    };

                    log::info!("Converting {}", input.display());
                    let _ = event_tx.send(WorkerEvent::JobStarted(id));

                    let event = match convert_to_dir(&input, &output_dir, &options) {
                        Ok(summary) => {
                            if let Some(job) = lock(&jobs).iter_mut().find(|j| j.id == id) {
                                job.complete(summary.bytes_written);
                            }
                            WorkerEvent::JobCompleted(id, summary.bytes_written)
                        }
                        Err(e) => {
                            log::error!("Conversion of {} failed: {}", input.display(), e);
                            let error_msg = e.to_string();
                            if let Some(job) = lock(&jobs).iter_mut().find(|j| j.id == id) {
                                job.fail(error_msg.clone());
                            }
                            WorkerEvent::JobFailed(id, error_msg)
                        }
                    };
                    let _ = event_tx.send(event);
                },
            }
        }
    }

    /// Add a panorama to the conversion queue.
    pub fn add_file(&mut self, input_path: PathBuf) -> JobId {
        let mut job = ConversionJob::new(input_path, &self.output_dir, self.options);

        match probe(&job.input_path) {
            Ok(info) => {
                if !info.is_equirectangular() {
                    log::warn!(
                        "{} is {} (aspect {:.3}), not 2:1",
                        job.input_filename(),
                        info.resolution_string(),
                        info.aspect_ratio()
                    );
                }
                job.source_info = Some(info);
            }
            Err(e) => log::debug!("Could not probe {}: {}", job.input_path.display(), e),
        }

        let id = job.id;
        lock(&self.jobs).push_back(job);
        id
    }

    /// Add multiple files to the queue.
    pub fn add_files(&mut self, paths: Vec<PathBuf>) -> Vec<JobId> {
        paths.into_iter().map(|path| self.add_file(path)).collect()
    }

    /// Start processing the queue.
    pub fn start(&mut self) {
        self.is_running = true;
        let _ = self.command_tx.send(WorkerCommand::ProcessNext);
    }

    /// Cancel every job that has not started yet. The running job finishes.
    pub fn cancel_pending(&mut self) -> usize {
        let cancelled: Vec<JobId> = lock(&self.jobs)
            .iter_mut()
            .filter_map(|j| j.cancel().then_some(j.id))
            .collect();
        for id in &cancelled {
            let _ = self.event_tx.send(WorkerEvent::JobCancelled(*id));
        }
        cancelled.len()
    }

    /// Clear all finished jobs.
    pub fn clear_finished(&mut self) {
        lock(&self.jobs).retain(|j| !j.status.is_finished());
    }

    /// Remove a specific job unless it is running.
    pub fn remove_job(&mut self, id: JobId) -> bool {
        let mut jobs = lock(&self.jobs);
        let before = jobs.len();
        jobs.retain(|j| j.id != id || j.status.is_active());
        jobs.len() != before
    }

    /// Snapshot of all jobs.
    pub fn jobs(&self) -> Vec<ConversionJob> {
        lock(&self.jobs).iter().cloned().collect()
    }

    /// Look up a single job.
    pub fn job(&self, id: JobId) -> Option<ConversionJob> {
        lock(&self.jobs).iter().find(|j| j.id == id).cloned()
    }

    /// Set the output root. Pending jobs are redirected.
    pub fn set_output_dir(&mut self, dir: PathBuf) {
        self.output_dir = dir;

        let mut jobs = lock(&self.jobs);
        for job in jobs.iter_mut() {
            if matches!(job.status, JobStatus::Pending) {
                job.output_dir = face_set_dir(&job.input_path, &self.output_dir);
            }
        }
    }

    /// Get current output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn observe(&mut self, event: &WorkerEvent) {
        if matches!(event, WorkerEvent::Idle) {
            self.is_running = false;
        }
    }

    /// Poll for worker events (non-blocking).
    pub fn poll_events(&mut self) -> Vec<WorkerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            self.observe(&event);
            events.push(event);
        }
        events
    }

    /// Wait up to `timeout` for the next worker event.
    pub fn wait_event(&mut self, timeout: Duration) -> Option<WorkerEvent> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => {
                self.observe(&event);
                Some(event)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    fn worker_alive(&self) -> bool {
        self.worker_handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Start the queue and block until the worker goes idle, passing every event to `on_event`.
    ///
    /// Fails if the worker thread exits before reporting idle.
    pub fn run_to_completion(&mut self, mut on_event: impl FnMut(&WorkerEvent)) -> Result<()> {
        self.start();
        loop {
            match self.event_rx.recv_timeout(WORKER_POLL_INTERVAL) {
                Ok(event) => {
                    self.observe(&event);
                    on_event(&event);
                    if event == WorkerEvent::Idle {
                        return Ok(());
                    }
                }
                Err(RecvTimeoutError::Timeout) if self.worker_alive() => {}
                Err(_) => {
                    self.is_running = false;
                    // Drain anything sent just before the worker exited.
                    for event in self.poll_events() {
                        on_event(&event);
                        if event == WorkerEvent::Idle {
                            return Ok(());
                        }
                    }
                    return Err(SkyboxError::Worker("worker thread exited".to_string()));
                }
            }
        }
    }

    /// Get count statistics: (pending, complete, failed, total).
    pub fn stats(&self) -> (usize, usize, usize, usize) {
        let jobs = lock(&self.jobs);
        let pending = jobs.iter().filter(|j| matches!(j.status, JobStatus::Pending)).count();
        let complete = jobs.iter().filter(|j| matches!(j.status, JobStatus::Complete { .. })).count();
        let failed = jobs.iter().filter(|j| matches!(j.status, JobStatus::Failed { .. })).count();
        (pending, complete, failed, jobs.len())
    }
}

impl Drop for JobQueue {
    fn drop(&mut self) {
        let _ = self.command_tx.send(WorkerCommand::Stop);
        if let Some(handle) = self.worker_handle.take() {
            let _ = handle.join();
        }
    }
}
