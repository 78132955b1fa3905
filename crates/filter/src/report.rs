//! Per-frame outcomes and the run report.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classifier::CheckKind;
use framesieve_frame_model::frame::FrameFile;

/// Why a frame was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    Blurry,
    NoFaces,
}

impl Rejection {
    pub fn as_str(self) -> &'static str {
        match self {
            Rejection::Blurry => "blurry",
            Rejection::NoFaces => "no_faces",
        }
    }
}

/// Terminal state of a frame after filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FrameOutcome {
    /// Passed both checks.
    Kept,

    /// Failed a check and was removed.
    Deleted { reason: Rejection },

    /// A classifier could not answer; the frame was left in place.
    ToolError { check: CheckKind, detail: String },

    /// Failed a check but could not be removed.
    DeleteFailed { reason: Rejection, error: String },

    /// The worker handling the frame died; left in place.
    TaskFailed { detail: String },

    /// Cancelled before a decision was reached; left in place.
    Skipped,
}

impl FrameOutcome {
    /// Whether the frame is still on disk.
    pub fn survives(&self) -> bool {
        !matches!(self, FrameOutcome::Deleted { .. })
    }
}

/// One frame and what happened to it.
#[derive(Debug, Clone, Serialize)]
pub struct FrameRecord {
    #[serde(flatten)]
    pub frame: FrameFile,

    #[serde(flatten)]
    pub outcome: FrameOutcome,
}

/// Outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterTotals {
    pub total: usize,
    pub kept: usize,
    pub blurry: usize,
    pub no_faces: usize,
    pub tool_errors: usize,
    pub delete_failures: usize,
    pub skipped: usize,
}

impl FilterTotals {
    fn record(&mut self, outcome: &FrameOutcome) {
        self.total += 1;
        match outcome {
            FrameOutcome::Kept => self.kept += 1,
            FrameOutcome::Deleted {
                reason: Rejection::Blurry,
            } => self.blurry += 1,
            FrameOutcome::Deleted {
                reason: Rejection::NoFaces,
            } => self.no_faces += 1,
            FrameOutcome::ToolError { .. } | FrameOutcome::TaskFailed { .. } => {
                self.tool_errors += 1
            }
            FrameOutcome::DeleteFailed { .. } => self.delete_failures += 1,
            FrameOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn deleted(&self) -> usize {
        self.blurry + self.no_faces
    }
}

/// Result of a filter run, ordered by frame index.
#[derive(Debug, Clone, Serialize)]
pub struct FilterReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub totals: FilterTotals,
    pub frames: Vec<FrameRecord>,
}

impl FilterReport {
    pub fn new(
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        mut frames: Vec<FrameRecord>,
    ) -> Self {
        frames.sort_by_key(|r| r.frame.index);
        let mut totals = FilterTotals::default();
        for record in &frames {
            totals.record(&record.outcome);
        }
        Self {
            started_at,
            finished_at,
            totals,
            frames,
        }
    }

    /// Some frames could not be decided because of tool or filesystem faults.
    pub fn has_faults(&self) -> bool {
        self.totals.tool_errors > 0 || self.totals.delete_failures > 0
    }

    pub fn was_cancelled(&self) -> bool {
        self.totals.skipped > 0
    }

    /// Frames still on disk.
    pub fn surviving(&self) -> impl Iterator<Item = &FrameFile> {
        self.frames
            .iter()
            .filter(|r| r.outcome.survives())
            .map(|r| &r.frame)
    }

    /// One-line human summary.
    pub fn summary_line(&self) -> String {
        let t = &self.totals;
        let mut line = format!(
            "Kept {} of {} frames (deleted {}: {} blurry, {} without faces)",
            t.kept,
            t.total,
            t.deleted(),
            t.blurry,
            t.no_faces
        );
        if t.tool_errors > 0 {
            line.push_str(&format!(", {} tool errors", t.tool_errors));
        }
        if t.delete_failures > 0 {
            line.push_str(&format!(", {} delete failures", t.delete_failures));
        }
        if t.skipped > 0 {
            line.push_str(&format!(", {} skipped", t.skipped));
        }
        line
    }
}
