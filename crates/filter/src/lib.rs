//! Framesieve Frame Filter
//!
//! Keeps only the frames that pass both checks:
//! - **Sharpness:** the blur classifier must not call the frame blurry
//! - **Faces:** the face classifier must find more than the required count
//!
//! Classifiers are opaque capabilities behind the [`Classifier`] trait. The
//! shipped implementation runs an external program per frame; tests plug in
//! in-memory fakes. Only an explicit negative verdict deletes a frame. Tool
//! faults are reported and the frame is left alone.

pub mod classifier;
pub mod command;
pub mod filter;
pub mod report;

pub use classifier::{Check, CheckKind, Classifier, Verdict};
pub use command::CommandClassifier;
pub use filter::{Decision, FilterCriteria, FrameFilter};
pub use report::{FilterReport, FilterTotals, FrameOutcome, FrameRecord, Rejection};
