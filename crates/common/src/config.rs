//! Application configuration.
//!
//! Defaults for the external tools and the filter live here. The CLI layers
//! its flags on top of an [`AppConfig`] to build the per-run job.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{FramesieveError, FramesieveResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// External classifier settings.
    pub classifiers: ClassifierDefaults,

    /// Frame extraction settings.
    pub extraction: ExtractionDefaults,

    /// Filter loop settings.
    pub filter: FilterDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default classifier parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierDefaults {
    /// Path to the blur detection tool.
    pub detect_blurry_path: PathBuf,

    /// Path to the face detection tool.
    pub contains_faces_path: PathBuf,

    /// Variance-of-Laplacian threshold; scores below it are blurry.
    pub blurry_threshold: f64,

    /// Frames must contain strictly more faces than this.
    pub min_faces: u32,

    /// Flag passed to the blur tool ahead of the threshold.
    pub threshold_flag: String,

    /// Flag passed to the face tool ahead of the face count.
    pub faces_flag: String,
}

/// Default extraction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionDefaults {
    /// ffmpeg binary (bare name resolved through PATH).
    pub ffmpeg_path: PathBuf,

    /// ffmpeg `-q:v` value (2 = best, 31 = worst).
    pub quality: u8,

    /// Image extension for extracted frames.
    pub image_extension: String,

    /// Abort extraction after this many seconds. `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
}

/// Default filter loop parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterDefaults {
    /// Frames classified concurrently.
    pub jobs: usize,

    /// Per-invocation timeout for each classifier.
    pub tool_timeout_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "framesieve=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for ClassifierDefaults {
    fn default() -> Self {
        Self {
            detect_blurry_path: PathBuf::from("./detect-blurry/detect-blurry"),
            contains_faces_path: PathBuf::from("./contains-faces/contains-faces"),
            blurry_threshold: 100.0,
            min_faces: 0,
            threshold_flag: "--threshold".to_string(),
            faces_flag: "--gt".to_string(),
        }
    }
}

impl Default for ExtractionDefaults {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            quality: 2,
            image_extension: "jpg".to_string(),
            timeout_secs: None,
        }
    }
}

impl Default for FilterDefaults {
    fn default() -> Self {
        Self {
            jobs: 1,
            tool_timeout_secs: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location. A missing file yields the
    /// defaults; an unreadable or invalid one is an error.
    pub fn load() -> FramesieveResult<Self> {
        let config_path = config_file_path();
        if !config_path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&config_path)
    }

    /// Load config from an explicit path. Unlike [`AppConfig::load`], any
    /// failure is returned to the caller.
    pub fn load_from(path: &Path) -> FramesieveResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FramesieveError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| FramesieveError::config(format!("invalid {}: {e}", path.display())))
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("framesieve").join("config.json")
}
