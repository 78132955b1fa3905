//! Frame files and their on-disk naming convention.
//!
//! Frames are named with a zero-padded, fixed-width index followed by the
//! image extension (`000001.jpg`). The index increases with the frame's
//! position in the source video.

use std::path::{Path, PathBuf};

use framesieve_common::error::FramesieveResult;
use serde::{Deserialize, Serialize};

/// Minimum number of digits in a frame file name.
pub const INDEX_WIDTH: usize = 6;

/// Naming convention for extracted frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameNaming {
    extension: String,
}

impl FrameNaming {
    /// Create a naming convention for the given image extension (no dot).
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// File name for a frame index.
    pub fn file_name(&self, index: u64) -> String {
        format!("{index:0width$}.{}", self.extension, width = INDEX_WIDTH)
    }

    /// printf-style output pattern understood by ffmpeg's image2 muxer.
    pub fn ffmpeg_pattern(&self) -> String {
        format!("%0{INDEX_WIDTH}d.{}", self.extension)
    }

    /// Parse the frame index out of a file name, if it follows the convention.
    ///
    /// Indices wider than [`INDEX_WIDTH`] are accepted since ffmpeg simply
    /// grows the field once the padding is exhausted.
    pub fn parse_index(&self, file_name: &str) -> Option<u64> {
        let (stem, ext) = file_name.rsplit_once('.')?;
        if !ext.eq_ignore_ascii_case(&self.extension) {
            return None;
        }
        if stem.len() < INDEX_WIDTH || !stem.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        stem.parse().ok()
    }
}

impl Default for FrameNaming {
    fn default() -> Self {
        Self::new("jpg")
    }
}

/// A single extracted frame on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameFile {
    /// Sequential frame index parsed from the file name.
    pub index: u64,

    /// Full path to the image.
    pub path: PathBuf,
}

impl FrameFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Snapshot of the frames present in a directory, ordered by index.
///
/// The snapshot is decoupled from the live directory: deleting files while
/// iterating never changes what is yielded. Call [`FrameSet::scan`] again to
/// restart from the current state of the directory.
#[derive(Debug, Clone, Default)]
pub struct FrameSet {
    frames: Vec<FrameFile>,
}

impl FrameSet {
    /// List every file in `dir` that follows `naming`, sorted by index.
    ///
    /// Other files and subdirectories are ignored.
    pub fn scan(dir: &Path, naming: &FrameNaming) -> FramesieveResult<Self> {
        let mut frames = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(index) = name.to_str().and_then(|n| naming.parse_index(n)) else {
                continue;
            };
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            frames.push(FrameFile { index, path });
        }
        frames.sort_by_key(|f| f.index);

        tracing::debug!(dir = %dir.display(), frames = frames.len(), "Scanned frame directory");
        Ok(Self { frames })
    }

    pub fn from_frames(mut frames: Vec<FrameFile>) -> Self {
        frames.sort_by_key(|f| f.index);
        Self { frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FrameFile> {
        self.frames.iter()
    }
}

impl IntoIterator for FrameSet {
    type Item = FrameFile;
    type IntoIter = std::vec::IntoIter<FrameFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_file_name_is_zero_padded() {
        let naming = FrameNaming::default();
        assert_eq!(naming.file_name(1), "000001.jpg");
        assert_eq!(naming.file_name(1234567), "1234567.jpg");
        assert_eq!(naming.ffmpeg_pattern(), "%06d.jpg");
    }

    #[test]
    fn test_extension_dot_is_stripped() {
        let naming = FrameNaming::new(".png");
        assert_eq!(naming.file_name(3), "000003.png");
    }

    #[test]
    fn test_parse_index_rejects_foreign_names() {
        let naming = FrameNaming::default();
        assert_eq!(naming.parse_index("000042.jpg"), Some(42));
        assert_eq!(naming.parse_index("000042.JPG"), Some(42));
        assert_eq!(naming.parse_index("42.jpg"), None);
        assert_eq!(naming.parse_index("000042.png"), None);
        assert_eq!(naming.parse_index("frame-000042.jpg"), None);
        assert_eq!(naming.parse_index("00004a.jpg"), None);
        assert_eq!(naming.parse_index("000042"), None);
    }

    #[test]
    fn test_scan_orders_by_numeric_index() {
        let dir = tempfile::tempdir().unwrap();
        let naming = FrameNaming::default();
        for index in [10u64, 2, 1000000, 1] {
            std::fs::write(dir.path().join(naming.file_name(index)), b"x").unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("000099.jpg")).unwrap();

        let set = FrameSet::scan(dir.path(), &naming).unwrap();
        let indices: Vec<u64> = set.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![1, 2, 10, 1000000]);
        assert_eq!(set.iter().next().unwrap().file_name(), "000001.jpg");
    }

    #[test]
    fn test_snapshot_survives_deletion() {
        let dir = tempfile::tempdir().unwrap();
        let naming = FrameNaming::default();
        for index in 1..=3 {
            std::fs::write(dir.path().join(naming.file_name(index)), b"x").unwrap();
        }

        let set = FrameSet::scan(dir.path(), &naming).unwrap();
        std::fs::remove_file(dir.path().join(naming.file_name(2))).unwrap();
        assert_eq!(set.len(), 3);

        let rescanned = FrameSet::scan(dir.path(), &naming).unwrap();
        assert_eq!(rescanned.len(), 2);
    }

    #[test]
    fn test_scan_missing_directory_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FrameSet::scan(&dir.path().join("absent"), &FrameNaming::default()).is_err());
    }

    proptest! {
        #[test]
        fn prop_file_name_round_trips_through_parse(index in 0u64..100_000_000) {
            let naming = FrameNaming::default();
            prop_assert_eq!(naming.parse_index(&naming.file_name(index)), Some(index));
        }

        #[test]
        fn prop_from_frames_is_strictly_increasing(
            indices in proptest::collection::hash_set(0u64..10_000, 0..64)
        ) {
            let naming = FrameNaming::default();
            let frames = indices
                .iter()
                .map(|&index| FrameFile { index, path: PathBuf::from(naming.file_name(index)) })
                .collect();
            let set = FrameSet::from_frames(frames);
            let ordered: Vec<u64> = set.iter().map(|f| f.index).collect();
            prop_assert!(ordered.windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(ordered.len(), indices.len());
        }
    }
}
