//! Classifier capability and verdicts.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The question asked of a classifier about one image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Check {
    /// Passes when the sharpness score is at least `threshold`.
    Sharpness { threshold: f64 },

    /// Passes when the image holds strictly more than `more_than` faces.
    FaceCount { more_than: u32 },
}

impl Check {
    pub fn kind(&self) -> CheckKind {
        match self {
            Check::Sharpness { .. } => CheckKind::Blur,
            Check::FaceCount { .. } => CheckKind::Faces,
        }
    }

    /// The check's parameter as passed on a command line.
    pub fn value_arg(&self) -> String {
        match self {
            Check::Sharpness { threshold } => threshold.to_string(),
            Check::FaceCount { more_than } => more_than.to_string(),
        }
    }
}

/// Which of the two checks produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Blur,
    Faces,
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckKind::Blur => f.write_str("blur"),
            CheckKind::Faces => f.write_str("faces"),
        }
    }
}

/// Outcome of a single classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The image satisfies the check.
    Pass,

    /// The image explicitly fails the check.
    Fail,

    /// The classifier could not produce an answer.
    ToolError(String),
}

/// A capability that answers a [`Check`] about an image file.
///
/// Implementations must be deterministic for a given file and must not
/// modify it.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify `image` against `check`.
    async fn classify(&self, image: &Path, check: &Check) -> Verdict;

    /// Classifier name, used in logs.
    fn name(&self) -> &str;
}
