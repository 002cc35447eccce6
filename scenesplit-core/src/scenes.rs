use std::{fs, iter, path::Path};

use anyhow::{bail, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::SceneFileError;

/// Ordered list of split frame numbers. Each entry is the first frame of a
/// new segment; frame 0 and the final frame of the clip are implicit
/// boundaries and never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitPlan {
    splits: Vec<usize>,
}

impl SplitPlan {
    #[inline]
    pub fn new(splits: Vec<usize>) -> Self {
        Self {
            splits,
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[usize] {
        &self.splits
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.splits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }

    /// Split points must be strictly increasing and lie strictly inside the
    /// clip.
    pub fn ensure_valid(&self, total_frames: usize) -> Result<()> {
        for (index, &split) in self.splits.iter().enumerate() {
            if split == 0 || split >= total_frames {
                bail!("split point {split} is outside the clip (1..{total_frames})");
            }
            if index > 0 && self.splits[index - 1] >= split {
                bail!(
                    "split points are not strictly increasing at index {index} ({prev} >= \
                     {split})",
                    prev = self.splits[index - 1]
                );
            }
        }
        Ok(())
    }

    /// Segments implied by the plan, with the clip boundaries included.
    pub fn segments(&self, total_frames: usize) -> Vec<Segment> {
        iter::once(0)
            .chain(self.splits.iter().copied())
            .chain(iter::once(total_frames))
            .tuple_windows()
            .map(|(start_frame, end_frame)| Segment {
                start_frame,
                end_frame,
            })
            .collect()
    }
}

/// Contiguous frame range, start inclusive, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start_frame: usize,
    pub end_frame:   usize,
}

impl Segment {
    #[inline]
    pub fn frames(&self) -> usize {
        self.end_frame - self.start_frame
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SceneFile {
    scenes: Vec<usize>,
}

/// Writes the split list as `{"scenes": [...]}`, replacing `path` atomically
/// via a sibling temp file.
pub fn write_scenes_to_file(plan: &SplitPlan, path: &Path) -> Result<(), SceneFileError> {
    let document = SceneFile {
        scenes: plan.as_slice().to_vec(),
    };
    let json = serde_json::to_string(&document).map_err(|source| SceneFileError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;

    let staging = path.with_extension("tmp");
    fs::write(&staging, json).map_err(|source| SceneFileError::Write {
        path: staging.clone(),
        source,
    })?;
    fs::rename(&staging, path).map_err(|source| SceneFileError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_scenes_from_file(path: &Path) -> Result<SplitPlan, SceneFileError> {
    let raw = fs::read_to_string(path).map_err(|source| SceneFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let document: SceneFile =
        serde_json::from_str(&raw).map_err(|source| SceneFileError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(SplitPlan::new(document.scenes))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn round_trips_through_the_scene_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("scenes.txt");

        let plan = SplitPlan::new(vec![120, 340, 900, 1500]);
        write_scenes_to_file(&plan, &path).unwrap();

        assert_eq!(read_scenes_from_file(&path).unwrap(), plan);
        // No staging file left behind
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn empty_scene_list_is_valid() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("scenes.txt");

        write_scenes_to_file(&SplitPlan::default(), &path).unwrap();
        assert!(read_scenes_from_file(&path).unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let temp = TempDir::new().unwrap();
        let result = read_scenes_from_file(&temp.path().join("nope.txt"));
        assert!(matches!(result, Err(SceneFileError::Read { .. })));
    }

    #[test]
    fn malformed_json_is_a_format_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("scenes.txt");
        fs::write(&path, "{\"scenes\": [12, oops").unwrap();

        let result = read_scenes_from_file(&path);
        assert!(matches!(result, Err(SceneFileError::Malformed { .. })));
    }

    #[test]
    fn missing_scenes_key_is_a_format_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("scenes.txt");
        fs::write(&path, "{\"frames\": [12]}").unwrap();

        let result = read_scenes_from_file(&path);
        assert!(matches!(result, Err(SceneFileError::Malformed { .. })));
    }

    #[test]
    fn validation_accepts_strictly_increasing_interior_points() {
        let plan = SplitPlan::new(vec![1, 2, 999]);
        assert!(plan.ensure_valid(1000).is_ok());
        assert!(SplitPlan::default().ensure_valid(1).is_ok());
    }

    #[test]
    fn validation_rejects_out_of_range_points() {
        assert!(SplitPlan::new(vec![0, 10]).ensure_valid(100).is_err());
        assert!(SplitPlan::new(vec![10, 100]).ensure_valid(100).is_err());
    }

    #[test]
    fn validation_rejects_unsorted_and_duplicate_points() {
        assert!(SplitPlan::new(vec![30, 20]).ensure_valid(100).is_err());
        assert!(SplitPlan::new(vec![20, 20]).ensure_valid(100).is_err());
    }

    #[test]
    fn segments_cover_the_whole_clip() {
        let plan = SplitPlan::new(vec![400]);
        let segments = plan.segments(1000);
        assert_eq!(segments, vec![
            Segment {
                start_frame: 0,
                end_frame:   400
            },
            Segment {
                start_frame: 400,
                end_frame:   1000
            },
        ]);
        assert_eq!(segments.iter().map(Segment::frames).sum::<usize>(), 1000);
    }

    #[test]
    fn empty_plan_is_one_segment() {
        assert_eq!(SplitPlan::default().segments(500), vec![Segment {
            start_frame: 0,
            end_frame:   500
        }]);
    }
}
