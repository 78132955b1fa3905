//! The filter loop.
//!
//! Each frame moves through
//!
//! ```text
//! Extracted ─▶ blur check ─┬─ Fail ──────────────▶ Deleted(blurry)
//!                          └─ Pass ─▶ face check ─┬─ Fail ─▶ Deleted(no faces)
//!                                                 └─ Pass ─▶ Kept
//! ```
//!
//! A `ToolError` at either check ends the frame as undecided and leaves it on
//! disk. Frames are dispatched in index order to a bounded pool; every frame
//! is owned by exactly one task, so no file is ever touched twice.

use std::collections::BTreeMap;
use std::sync::Arc;

use framesieve_common::cancel::CancelSignal;
use framesieve_frame_model::frame::{FrameFile, FrameSet};
use framesieve_frame_model::job::JobConfig;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::classifier::{Check, CheckKind, Classifier, Verdict};
use crate::command::CommandClassifier;
use crate::report::{FilterReport, FrameOutcome, FrameRecord, Rejection};

/// Thresholds the two checks are asked about.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterCriteria {
    /// Sharpness scores below this are blurry.
    pub blurry_threshold: f64,

    /// Frames need strictly more faces than this.
    pub min_faces: u32,
}

impl FilterCriteria {
    pub fn sharpness(&self) -> Check {
        Check::Sharpness {
            threshold: self.blurry_threshold,
        }
    }

    pub fn faces(&self) -> Check {
        Check::FaceCount {
            more_than: self.min_faces,
        }
    }
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            blurry_threshold: 100.0,
            min_faces: 0,
        }
    }
}

/// What the classifiers concluded about a frame, before any deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Keep,
    Reject(Rejection),
    Undecided { check: CheckKind, detail: String },
}

/// Runs both checks over a frame set and deletes the failures.
#[derive(Clone)]
pub struct FrameFilter {
    blur: Arc<dyn Classifier>,
    faces: Arc<dyn Classifier>,
    criteria: FilterCriteria,
    jobs: usize,
}

impl FrameFilter {
    /// Create a sequential filter from two classifiers.
    pub fn new(
        blur: Arc<dyn Classifier>,
        faces: Arc<dyn Classifier>,
        criteria: FilterCriteria,
    ) -> Self {
        Self {
            blur,
            faces,
            criteria,
            jobs: 1,
        }
    }

    /// Classify up to `jobs` frames at once.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Build the filter a job describes, backed by external programs.
    pub fn from_job(job: &JobConfig) -> Self {
        let blur = CommandClassifier::new(
            "detect-blurry",
            job.detect_blurry_path.clone(),
            job.threshold_flag.clone(),
            job.tool_timeout,
        );
        let faces = CommandClassifier::new(
            "contains-faces",
            job.contains_faces_path.clone(),
            job.faces_flag.clone(),
            job.tool_timeout,
        );
        Self::new(
            Arc::new(blur),
            Arc::new(faces),
            FilterCriteria {
                blurry_threshold: job.blurry_threshold,
                min_faces: job.min_faces,
            },
        )
        .with_jobs(job.jobs)
    }

    /// Ask the classifiers about `frame`. Never touches the filesystem.
    ///
    /// The face check only runs once the blur check has passed.
    pub async fn decide(&self, frame: &FrameFile) -> Decision {
        match self
            .blur
            .classify(&frame.path, &self.criteria.sharpness())
            .await
        {
            Verdict::Pass => {}
            Verdict::Fail => return Decision::Reject(Rejection::Blurry),
            Verdict::ToolError(detail) => {
                return Decision::Undecided {
                    check: CheckKind::Blur,
                    detail,
                }
            }
        }

        match self
            .faces
            .classify(&frame.path, &self.criteria.faces())
            .await
        {
            Verdict::Pass => Decision::Keep,
            Verdict::Fail => Decision::Reject(Rejection::NoFaces),
            Verdict::ToolError(detail) => Decision::Undecided {
                check: CheckKind::Faces,
                detail,
            },
        }
    }

    /// Decide one frame and act on the decision.
    ///
    /// Cancellation before a decision leaves the frame untouched.
    pub async fn process_frame(&self, frame: &FrameFile, cancel: &CancelSignal) -> FrameOutcome {
        if cancel.is_cancelled() {
            return FrameOutcome::Skipped;
        }

        let decision = tokio::select! {
            biased;
            _ = cancel.cancelled() => return FrameOutcome::Skipped,
            decision = self.decide(frame) => decision,
        };

        match decision {
            Decision::Keep => {
                tracing::debug!(frame = %frame.path.display(), "Kept frame");
                FrameOutcome::Kept
            }
            Decision::Reject(reason) => delete_frame(frame, reason).await,
            Decision::Undecided { check, detail } => {
                tracing::warn!(
                    frame = %frame.path.display(),
                    %check,
                    %detail,
                    "Classifier failed, leaving frame in place"
                );
                FrameOutcome::ToolError { check, detail }
            }
        }
    }

    /// Filter every frame in `frames`.
    pub async fn run(&self, frames: FrameSet, cancel: CancelSignal) -> FilterReport {
        let started_at = chrono::Utc::now();
        let started = std::time::Instant::now();
        tracing::info!(
            frames = frames.len(),
            jobs = self.jobs,
            blurry_threshold = self.criteria.blurry_threshold,
            min_faces = self.criteria.min_faces,
            "Filtering frames"
        );

        let permits = Arc::new(Semaphore::new(self.jobs));
        let mut tasks = JoinSet::new();
        let mut records = Vec::with_capacity(frames.len());
        let mut in_flight = BTreeMap::new();
        let mut pending = frames.into_iter();

        for frame in pending.by_ref() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = Arc::clone(&permits).acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                records.push(FrameRecord {
                    frame,
                    outcome: FrameOutcome::Skipped,
                });
                break;
            };

            in_flight.insert(frame.index, frame.clone());
            let filter = self.clone();
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let outcome = filter.process_frame(&frame, &cancel).await;
                drop(permit);
                FrameRecord { frame, outcome }
            });
        }

        // Anything not dispatched was cut off by cancellation.
        records.extend(pending.map(|frame| FrameRecord {
            frame,
            outcome: FrameOutcome::Skipped,
        }));

        let mut task_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(record) => {
                    in_flight.remove(&record.frame.index);
                    records.push(record);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Filter task failed");
                    task_error = Some(e.to_string());
                }
            }
        }

        // Frames whose task died never reported back; they stay on disk.
        let detail = task_error.unwrap_or_else(|| "filter task failed".to_string());
        records.extend(in_flight.into_values().map(|frame| {
            tracing::warn!(frame = %frame.path.display(), %detail, "Frame left undecided");
            FrameRecord {
                frame,
                outcome: FrameOutcome::TaskFailed {
                    detail: detail.clone(),
                },
            }
        }));

        let report = FilterReport::new(started_at, chrono::Utc::now(), records);
        tracing::info!(
            kept = report.totals.kept,
            deleted = report.totals.deleted(),
            tool_errors = report.totals.tool_errors,
            delete_failures = report.totals.delete_failures,
            skipped = report.totals.skipped,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "Filtering finished"
        );
        report
    }
}

async fn delete_frame(frame: &FrameFile, reason: Rejection) -> FrameOutcome {
    match tokio::fs::remove_file(&frame.path).await {
        Ok(()) => {
            tracing::info!(frame = %frame.path.display(), reason = reason.as_str(), "Deleted frame");
            FrameOutcome::Deleted { reason }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(frame = %frame.path.display(), "Frame already gone");
            FrameOutcome::Deleted { reason }
        }
        Err(e) => {
            tracing::error!(
                frame = %frame.path.display(),
                reason = reason.as_str(),
                error = %e,
                "Failed to delete frame"
            );
            FrameOutcome::DeleteFailed {
                reason,
                error: e.to_string(),
            }
        }
    }
}
