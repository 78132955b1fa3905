//! Extract, then filter.

use std::io::IsTerminal;

use anyhow::Context;
use framesieve_common::cancel::CancelSignal;
use framesieve_common::error::FramesieveError;
use framesieve_common::tools::resolve_tool;
use framesieve_extract::{extract_frames, ExtractProgress, ExtractStage, FfmpegExtractor};
use framesieve_filter::{FilterReport, FrameFilter};
use framesieve_frame_model::job::JobConfig;

/// How a run that reached the filter ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every frame was kept or deleted.
    Clean,

    /// Some frames were left undecided by tool or filesystem faults.
    Faulted,

    /// Interrupted during filtering.
    Cancelled,
}

impl RunStatus {
    fn from_report(report: &FilterReport) -> Self {
        if report.was_cancelled() {
            RunStatus::Cancelled
        } else if report.has_faults() {
            RunStatus::Faulted
        } else {
            RunStatus::Clean
        }
    }

    pub fn exit_status(self) -> u8 {
        match self {
            RunStatus::Clean => 0,
            RunStatus::Faulted => 3,
            RunStatus::Cancelled => 130,
        }
    }
}

/// Run the whole job. Fatal errors abort; per-frame faults end up in the report.
pub async fn run(job: &JobConfig, json: bool, cancel: CancelSignal) -> anyhow::Result<RunStatus> {
    let ffmpeg = preflight(job)?;

    let extractor = FfmpegExtractor::new(ffmpeg);
    let frames = extract_frames(&extractor, job, Some(progress_printer()), cancel.clone())
        .await
        .context("frame extraction failed")?;

    if cancel.is_cancelled() {
        return Err(FramesieveError::Cancelled.into());
    }

    let report = FrameFilter::from_job(job).run(frames, cancel).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.summary_line());
    }

    Ok(RunStatus::from_report(&report))
}

/// Resolve every external program before anything is written.
fn preflight(job: &JobConfig) -> anyhow::Result<std::path::PathBuf> {
    resolve_tool("detect-blurry", &job.detect_blurry_path)?;
    resolve_tool("contains-faces", &job.contains_faces_path)?;
    Ok(resolve_tool("ffmpeg", &job.ffmpeg_path)?)
}

fn progress_printer() -> Box<dyn Fn(ExtractProgress) + Send + Sync> {
    let interactive = std::io::stderr().is_terminal();
    Box::new(move |p| match p.stage {
        ExtractStage::Decoding if interactive => {
            eprint!(
                "\r  Extracting: {} frames ({:.1}s of video)  ",
                p.frames_written, p.out_time_secs
            );
        }
        ExtractStage::Complete if interactive => {
            eprintln!("\r  Extracted {} frames                      ", p.frames_written);
        }
        _ => {
            tracing::trace!(stage = ?p.stage, frames = p.frames_written, "Extraction progress");
        }
    })
}
