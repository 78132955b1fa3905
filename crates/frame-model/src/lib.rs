//! Framesieve Frame Model
//!
//! Defines the data contracts shared by extraction and filtering:
//! - **Frames:** Sequentially numbered image files and their naming convention
//! - **Jobs:** The immutable, validated configuration of one run
//!
//! The output directory listing is the authoritative set of frames; nothing
//! here holds image data in memory.

pub mod frame;
pub mod job;

pub use frame::*;
pub use job::*;
