//! Framesieve Frame Extraction
//!
//! Splits a video into numbered still images by driving an external decoder.
//!
//! ```text
//! clip.mp4 ── ffmpeg [-vf fps=R] ──▶ out/000001.jpg
//!                                    out/000002.jpg
//!                                    ...
//! ```
//!
//! Extraction runs once, to completion, before any frame is filtered. A
//! decoder failure aborts the run; frames already written are left in place.

pub mod ffmpeg;

use async_trait::async_trait;
use framesieve_common::cancel::CancelSignal;
use framesieve_common::error::{FramesieveError, FramesieveResult};
use framesieve_frame_model::frame::FrameSet;
use framesieve_frame_model::job::JobConfig;

pub use ffmpeg::FfmpegExtractor;

/// Progress callback for extraction.
pub type ProgressCallback = Box<dyn Fn(ExtractProgress) + Send + Sync>;

/// Extraction progress report.
#[derive(Debug, Clone)]
pub struct ExtractProgress {
    /// Frames written so far.
    pub frames_written: u64,

    /// Position in the source video, in seconds.
    pub out_time_secs: f64,

    /// Current stage.
    pub stage: ExtractStage,
}

/// Stages of an extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractStage {
    Preparing,
    Decoding,
    Complete,
}

/// Trait for frame extraction backends.
#[async_trait]
pub trait ExtractBackend: Send + Sync {
    /// Write the frames for `job` into `job.output_dir`, which already exists.
    async fn extract(
        &self,
        job: &JobConfig,
        progress: Option<ProgressCallback>,
        cancel: CancelSignal,
    ) -> FramesieveResult<()>;

    /// Check if this backend can run on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Extract the job's video into its output directory and list the result.
///
/// This is the main entry point for extraction.
pub async fn extract_frames(
    backend: &dyn ExtractBackend,
    job: &JobConfig,
    progress: Option<ProgressCallback>,
    cancel: CancelSignal,
) -> FramesieveResult<FrameSet> {
    tracing::info!(
        video = %job.video_path.display(),
        output = %job.output_dir.display(),
        frame_rate = ?job.frame_rate,
        "Starting extraction"
    );

    if !job.video_path.is_file() {
        return Err(FramesieveError::FileNotFound {
            path: job.video_path.clone(),
        });
    }

    if !backend.is_available() {
        return Err(FramesieveError::tool_not_found(
            backend.name(),
            job.ffmpeg_path.clone(),
        ));
    }

    std::fs::create_dir_all(&job.output_dir).map_err(|e| {
        FramesieveError::extraction(format!(
            "cannot create output directory {}: {e}",
            job.output_dir.display()
        ))
    })?;

    if let Some(cb) = &progress {
        cb(ExtractProgress {
            frames_written: 0,
            out_time_secs: 0.0,
            stage: ExtractStage::Preparing,
        });
    }

    let started = std::time::Instant::now();
    tracing::info!(backend = backend.name(), "Using extraction backend");
    backend.extract(job, progress, cancel).await?;

    let frames = FrameSet::scan(&job.output_dir, &job.naming)?;
    if frames.is_empty() {
        tracing::warn!(
            output = %job.output_dir.display(),
            "Extraction finished without producing any frames"
        );
    }
    tracing::info!(
        frames = frames.len(),
        elapsed_secs = started.elapsed().as_secs_f64(),
        "Extraction finished"
    );
    Ok(frames)
}
