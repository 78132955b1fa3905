//! framesieve CLI: extract the frames of a video, then drop the blurry ones
//! and the ones without faces.
//!
//! Usage:
//!   framesieve <VIDEO_FILE> <OUTPUT_DIR> [OPTIONS]
//!
//! Exit status:
//!   0    every frame was decided
//!   1    usage or configuration error, nothing was touched
//!   2    fatal pipeline error (missing input, tool not found, extraction failed)
//!   3    finished, but some frames were left undecided
//!   130  interrupted

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use framesieve_common::cancel::cancel_pair;
use framesieve_common::config::AppConfig;
use framesieve_common::error::FramesieveError;
use framesieve_frame_model::job::{JobConfig, JobOverrides};

mod pipeline;

const EXIT_USAGE: u8 = 1;
const EXIT_FATAL: u8 = 2;
const EXIT_CANCELLED: u8 = 130;

#[derive(Parser)]
#[command(
    name = "framesieve",
    about = "Extract video frames and keep only the sharp ones with faces",
    version,
    author
)]
struct Cli {
    /// Video to split into frames
    video_file: PathBuf,

    /// Directory receiving the frames (created if missing)
    output_dir: PathBuf,

    /// Frames per second to sample (default: every frame)
    #[arg(short = 's', long)]
    frame_rate: Option<f64>,

    /// Face detection tool [default: ./contains-faces/contains-faces]
    #[arg(short = 'p', long)]
    contains_faces_path: Option<PathBuf>,

    /// Sharpness scores below this are blurry [default: 100]
    #[arg(short = 'b', long)]
    blurry_threshold: Option<f64>,

    /// Blur detection tool [default: ./detect-blurry/detect-blurry]
    #[arg(short = 'd', long)]
    detect_blurry_path: Option<PathBuf>,

    /// Frames classified concurrently [default: 1]
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Keep frames with strictly more faces than this [default: 0]
    #[arg(long)]
    min_faces: Option<u32>,

    /// Seconds before a classifier invocation is killed [default: 30]
    #[arg(long, value_name = "SECS")]
    tool_timeout: Option<u64>,

    /// Seconds before extraction is aborted (default: no limit)
    #[arg(long, value_name = "SECS")]
    extract_timeout: Option<u64>,

    /// JPEG quality passed to ffmpeg, 1 (best) to 31 [default: 2]
    #[arg(long)]
    quality: Option<u8>,

    /// Configuration file to use instead of the standard location
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the full run report as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> JobOverrides {
        JobOverrides {
            frame_rate: self.frame_rate,
            contains_faces_path: self.contains_faces_path.clone(),
            blurry_threshold: self.blurry_threshold,
            detect_blurry_path: self.detect_blurry_path.clone(),
            min_faces: self.min_faces,
            jobs: self.jobs,
            tool_timeout_secs: self.tool_timeout,
            extract_timeout_secs: self.extract_timeout,
            quality: self.quality,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout and are not errors.
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_USAGE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // Only an explicitly named config file is fatal; the standard one is not.
    let mut ignored_config = None;
    let config = match &cli.config {
        Some(path) => match AppConfig::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::from(EXIT_USAGE);
            }
        },
        None => AppConfig::load().unwrap_or_else(|e| {
            ignored_config = Some(e);
            AppConfig::default()
        }),
    };

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    framesieve_common::logging::init_logging(&logging);
    if let Some(e) = ignored_config {
        tracing::warn!(error = %e, "Ignoring config file, using defaults");
    }

    let job = match JobConfig::new(
        cli.video_file.clone(),
        cli.output_dir.clone(),
        cli.overrides(),
        &config,
    ) {
        Ok(job) => job,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let (handle, signal) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping");
            handle.cancel();
        }
    });

    match pipeline::run(&job, cli.json, signal).await {
        Ok(status) => ExitCode::from(status.exit_status()),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_status_for(&e))
        }
    }
}

fn exit_status_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<FramesieveError>() {
        Some(e) if e.is_usage() => EXIT_USAGE,
        Some(FramesieveError::Cancelled) => EXIT_CANCELLED,
        _ => EXIT_FATAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_short_flags_fill_overrides() {
        let cli = Cli::try_parse_from([
            "framesieve",
            "clip.mp4",
            "out",
            "-s",
            "2.5",
            "-b",
            "80",
            "-d",
            "/opt/blur",
            "-p",
            "/opt/faces",
            "-j",
            "4",
        ])
        .unwrap();
        let overrides = cli.overrides();

        assert_eq!(overrides.frame_rate, Some(2.5));
        assert_eq!(overrides.blurry_threshold, Some(80.0));
        assert_eq!(overrides.detect_blurry_path, Some(PathBuf::from("/opt/blur")));
        assert_eq!(overrides.contains_faces_path, Some(PathBuf::from("/opt/faces")));
        assert_eq!(overrides.jobs, Some(4));
        assert!(overrides.min_faces.is_none());
    }

    #[test]
    fn test_output_dir_is_required() {
        let err = match Cli::try_parse_from(["framesieve", "clip.mp4"]) {
            Ok(_) => panic!("parsed without an output directory"),
            Err(e) => e,
        };
        assert!(err.use_stderr());
    }

    #[test]
    fn test_error_exit_codes() {
        let usage = anyhow::Error::new(FramesieveError::config("bad rate"));
        assert_eq!(exit_status_for(&usage), EXIT_USAGE);

        let cancelled = anyhow::Error::new(FramesieveError::Cancelled).context("extraction");
        assert_eq!(exit_status_for(&cancelled), EXIT_CANCELLED);

        let fatal = anyhow::Error::new(FramesieveError::extraction("ffmpeg exited 1"));
        assert_eq!(exit_status_for(&fatal), EXIT_FATAL);
    }
}
