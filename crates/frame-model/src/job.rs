//! Job configuration: the immutable description of one run.

use std::path::PathBuf;
use std::time::Duration;

use framesieve_common::config::AppConfig;
use framesieve_common::error::{FramesieveError, FramesieveResult};

use crate::frame::FrameNaming;

/// Per-run values supplied on the command line. `None` falls back to the
/// [`AppConfig`] value.
#[derive(Debug, Clone, Default)]
pub struct JobOverrides {
    pub frame_rate: Option<f64>,
    pub contains_faces_path: Option<PathBuf>,
    pub blurry_threshold: Option<f64>,
    pub detect_blurry_path: Option<PathBuf>,
    pub min_faces: Option<u32>,
    pub jobs: Option<usize>,
    pub tool_timeout_secs: Option<u64>,
    pub extract_timeout_secs: Option<u64>,
    pub quality: Option<u8>,
}

/// Validated configuration for a single extract-and-filter run.
///
/// Built once with [`JobConfig::new`] and only ever shared by reference.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Source video.
    pub video_path: PathBuf,

    /// Directory receiving the frames.
    pub output_dir: PathBuf,

    /// Sampling rate in frames per second. `None` extracts every frame.
    pub frame_rate: Option<f64>,

    /// Blur classifier executable.
    pub detect_blurry_path: PathBuf,

    /// Scores below this are blurry.
    pub blurry_threshold: f64,

    /// Face classifier executable.
    pub contains_faces_path: PathBuf,

    /// Frames must contain strictly more faces than this.
    pub min_faces: u32,

    /// Flag preceding the threshold on the blur tool's command line.
    pub threshold_flag: String,

    /// Flag preceding the face count on the face tool's command line.
    pub faces_flag: String,

    /// Frames classified concurrently.
    pub jobs: usize,

    /// Timeout applied to every classifier invocation.
    pub tool_timeout: Duration,

    /// Timeout for the whole extraction, if any.
    pub extract_timeout: Option<Duration>,

    /// ffmpeg executable.
    pub ffmpeg_path: PathBuf,

    /// ffmpeg `-q:v` value.
    pub quality: u8,

    /// Frame file naming.
    pub naming: FrameNaming,
}

impl JobConfig {
    /// Merge command-line values over configured defaults and validate.
    pub fn new(
        video_path: PathBuf,
        output_dir: PathBuf,
        overrides: JobOverrides,
        defaults: &AppConfig,
    ) -> FramesieveResult<Self> {
        let classifiers = &defaults.classifiers;
        let job = Self {
            video_path,
            output_dir,
            frame_rate: overrides.frame_rate,
            detect_blurry_path: overrides
                .detect_blurry_path
                .unwrap_or_else(|| classifiers.detect_blurry_path.clone()),
            blurry_threshold: overrides
                .blurry_threshold
                .unwrap_or(classifiers.blurry_threshold),
            contains_faces_path: overrides
                .contains_faces_path
                .unwrap_or_else(|| classifiers.contains_faces_path.clone()),
            min_faces: overrides.min_faces.unwrap_or(classifiers.min_faces),
            threshold_flag: classifiers.threshold_flag.clone(),
            faces_flag: classifiers.faces_flag.clone(),
            jobs: overrides.jobs.unwrap_or(defaults.filter.jobs),
            tool_timeout: Duration::from_secs(
                overrides
                    .tool_timeout_secs
                    .unwrap_or(defaults.filter.tool_timeout_secs),
            ),
            extract_timeout: overrides
                .extract_timeout_secs
                .or(defaults.extraction.timeout_secs)
                .map(Duration::from_secs),
            ffmpeg_path: defaults.extraction.ffmpeg_path.clone(),
            quality: overrides.quality.unwrap_or(defaults.extraction.quality),
            naming: FrameNaming::new(defaults.extraction.image_extension.clone()),
        };
        job.validate()?;
        Ok(job)
    }

    fn validate(&self) -> FramesieveResult<()> {
        if self.video_path.as_os_str().is_empty() {
            return Err(FramesieveError::config("video path is empty"));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(FramesieveError::config("output directory is empty"));
        }
        if let Some(rate) = self.frame_rate {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(FramesieveError::config(format!(
                    "frame rate must be a positive number, got {rate}"
                )));
            }
        }
        if !self.blurry_threshold.is_finite() {
            return Err(FramesieveError::config("blurry threshold must be finite"));
        }
        if self.jobs == 0 {
            return Err(FramesieveError::config("jobs must be at least 1"));
        }
        if self.tool_timeout.is_zero() {
            return Err(FramesieveError::config("tool timeout must be at least 1s"));
        }
        if self.extract_timeout.is_some_and(|t| t.is_zero()) {
            return Err(FramesieveError::config(
                "extraction timeout must be at least 1s",
            ));
        }
        if !(1..=31).contains(&self.quality) {
            return Err(FramesieveError::config(format!(
                "quality must be within 1..=31, got {}",
                self.quality
            )));
        }
        let ext = self.naming.extension();
        if ext.is_empty() || !ext.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(FramesieveError::config(format!(
                "invalid image extension {ext:?}"
            )));
        }
        if self.threshold_flag.is_empty() || self.faces_flag.is_empty() {
            return Err(FramesieveError::config("classifier flags must not be empty"));
        }
        Ok(())
    }
}
