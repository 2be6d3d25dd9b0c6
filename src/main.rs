//! Panorama Skybox
//!
//! Entry point for the panorama-skybox command line tool.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use panorama_skybox::settings::{OutputFormat, MAX_FACE_SIZE, MIN_FACE_SIZE};
use panorama_skybox::source::probe;
use panorama_skybox::{JobQueue, JobStatus, Preferences, SampleFilter, WorkerEvent};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliFilter {
    Nearest,
    Bilinear,
}

impl From<CliFilter> for SampleFilter {
    fn from(value: CliFilter) -> Self {
        match value {
            CliFilter::Nearest => SampleFilter::Nearest,
            CliFilter::Bilinear => SampleFilter::Bilinear,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliFormat {
    Png,
    Jpeg,
}

impl From<CliFormat> for OutputFormat {
    fn from(value: CliFormat) -> Self {
        match value {
            CliFormat::Png => OutputFormat::Png,
            CliFormat::Jpeg => OutputFormat::Jpeg,
        }
    }
}

/// Panorama Skybox - equirectangular panorama to cube-face converter
#[derive(Parser, Debug)]
#[command(name = "panorama-skybox", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert one or more panoramas into skybox face sets
    Convert(ConvertArgs),
    /// Show panorama dimensions
    Info {
        /// Panorama file
        input: PathBuf,
    },
    /// Show or reset stored preferences
    Prefs {
        /// Restore default preferences
        #[arg(long)]
        reset: bool,
    },
}

#[derive(clap::Args, Debug)]
struct ConvertArgs {
    /// Equirectangular panorama files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output root; each panorama gets a subdirectory named after its file
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Per-face resolution in pixels
    #[arg(long, value_parser = clap::value_parser!(u32).range(MIN_FACE_SIZE as i64..=MAX_FACE_SIZE as i64))]
    face_size: Option<u32>,

    /// Sampling filter
    #[arg(long, value_enum)]
    filter: Option<CliFilter>,

    /// Face image format
    #[arg(long, value_enum)]
    format: Option<CliFormat>,

    /// JPEG quality (1-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// Also write a strip atlas with all six faces
    #[arg(long)]
    strip: bool,

    /// Skip manifest.json
    #[arg(long)]
    no_manifest: bool,

    /// Fill faces one after another instead of in parallel
    #[arg(long)]
    sequential: bool,

    /// Store these options as the new defaults
    #[arg(long)]
    save_defaults: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Convert(args) => run_convert(args),
        Command::Info { input } => run_info(input),
        Command::Prefs { reset } => run_prefs(reset),
    }
}

/// Preferences for this run: the stored ones with command line flags on top.
fn apply_overrides(prefs: &mut Preferences, args: &ConvertArgs) {
    if let Some(face_size) = args.face_size {
        prefs.face_size = face_size;
    }
    if let Some(filter) = args.filter {
        prefs.filter = filter.into();
    }
    if let Some(format) = args.format {
        prefs.format = format.into();
    }
    if let Some(quality) = args.quality {
        prefs.jpeg_quality = quality;
    }
    if args.strip {
        prefs.write_strip = true;
    }
    if args.no_manifest {
        prefs.write_manifest = false;
    }
}

fn run_convert(args: ConvertArgs) -> Result<()> {
    let mut prefs = Preferences::load();
    apply_overrides(&mut prefs, &args);

    let output_dir = match args.output.clone().or_else(|| prefs.get_last_output_dir()) {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to resolve current directory")?,
    };

    if args.output.is_some() {
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;
        prefs.set_last_output_dir(&output_dir);
    }

    if args.save_defaults {
        prefs.save().context("Failed to save preferences")?;
        log::info!("Saved defaults to {:?}", Preferences::prefs_path());
    } else if args.output.is_some() {
        // Only the output folder is remembered; per-run flags stay out of the stored defaults.
        if let Err(e) = Preferences::record_last_output_dir(&output_dir) {
            log::warn!("Failed to remember output directory: {}", e);
        }
    }

    let mut options = prefs.convert_options();
    options.reproject.parallel = !args.sequential;

    log::info!(
        "Converting {} panorama(s) to {}px {} faces ({}) in {}",
        args.inputs.len(),
        options.reproject.face_size,
        prefs.format.display_name(),
        options.reproject.filter,
        output_dir.display()
    );

    let mut queue = JobQueue::new(output_dir, options)?;
    queue.add_files(args.inputs);

    queue.run_to_completion(|event| match event {
        WorkerEvent::JobStarted(id) => log::debug!("Job {} started", id.0),
        WorkerEvent::JobCompleted(id, bytes) => log::debug!("Job {} wrote {} bytes", id.0, bytes),
        WorkerEvent::JobFailed(id, error) => log::debug!("Job {} failed: {}", id.0, error),
        WorkerEvent::JobCancelled(id) => log::debug!("Job {} cancelled", id.0),
        WorkerEvent::Idle => {}
    })?;

    for job in queue.jobs() {
        let line = format!(
            "{:<32} {:>11}  {}",
            job.input_filename(),
            job.resolution_string(),
            job.status.display()
        );
        if matches!(job.status, JobStatus::Complete { .. }) {
            println!("{}  -> {}", line, job.output_dir.display());
        } else {
            println!("{}", line);
        }
    }

    let (_, complete, failed, total) = queue.stats();
    if failed > 0 {
        bail!("{} of {} conversions failed", failed, total);
    }
    log::info!("Converted {} panorama(s)", complete);
    Ok(())
}

fn run_info(input: PathBuf) -> Result<()> {
    let info = probe(&input).with_context(|| format!("Failed to read {}", input.display()))?;
    println!("{}", input.display());
    println!("  resolution:      {}", info.resolution_string());
    println!("  aspect ratio:    {:.3}", info.aspect_ratio());
    println!(
        "  equirectangular: {}",
        if info.is_equirectangular() { "yes" } else { "no (expected 2:1)" }
    );
    Ok(())
}

fn run_prefs(reset: bool) -> Result<()> {
    let prefs = if reset {
        let prefs = Preferences::default();
        prefs.save().context("Failed to reset preferences")?;
        prefs
    } else {
        Preferences::load()
    };

    match Preferences::prefs_path() {
        Some(path) => println!("# {}", path.display()),
        None => println!("# no config directory"),
    }
    println!("{}", serde_json::to_string_pretty(&prefs)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert_args(argv: &[&str]) -> ConvertArgs {
        let cli = Cli::try_parse_from(argv.iter().copied()).unwrap();
        match cli.command {
            Command::Convert(args) => args,
            other => panic!("expected convert, got {:?}", other),
        }
    }

    #[test]
    fn test_face_size_below_minimum_rejected() {
        assert!(Cli::try_parse_from(["panorama-skybox", "convert", "a.png", "--face-size", "4"]).is_err());
        let args = convert_args(&["panorama-skybox", "convert", "a.png", "--face-size", "16"]);
        assert_eq!(args.face_size, Some(MIN_FACE_SIZE));
    }

    #[test]
    fn test_overrides_apply_to_run_only() {
        let stored = Preferences::default();
        let args = convert_args(&[
            "panorama-skybox",
            "convert",
            "a.png",
            "-o",
            "/tmp/out",
            "--face-size",
            "64",
            "--filter",
            "bilinear",
            "--format",
            "jpeg",
            "--no-manifest",
        ]);

        let mut effective = stored.clone();
        apply_overrides(&mut effective, &args);

        assert_eq!(effective.face_size, 64);
        assert_eq!(effective.filter, SampleFilter::Bilinear);
        assert_eq!(effective.format, OutputFormat::Jpeg);
        assert!(!effective.write_manifest);
        assert_eq!(stored, Preferences::default());
        assert!(!args.save_defaults);
    }
}
