use std::{
    ffi::OsString,
    iter,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use itertools::Itertools;
use tracing::debug;

use crate::{error::SegmentationError, into_vec, scenes::SplitPlan};

/// How the split plan for a run is obtained, resolved once from the
/// configured scene file path and the state of the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneSource {
    /// `--scenes 0`: no detection, the whole clip becomes one segment.
    Disabled,
    /// A scene file saved by an earlier run; used verbatim.
    ReuseExisting(PathBuf),
    /// A scene file path was configured but nothing is there yet; detect
    /// and cache the result for the next run.
    DetectAndCache(PathBuf),
    /// No scene file involved, plain detection.
    Detect,
}

impl SceneSource {
    pub fn resolve(scenes: Option<&str>) -> Self {
        match scenes {
            Some("0") => SceneSource::Disabled,
            Some(path) if Path::new(path).exists() => {
                SceneSource::ReuseExisting(PathBuf::from(path))
            },
            Some(path) => SceneSource::DetectAndCache(PathBuf::from(path)),
            None => SceneSource::Detect,
        }
    }
}

/// Inserts evenly spaced split points into every segment longer than
/// `max_len`, leaving shorter segments untouched.
///
/// A segment of length `L > max_len` receives `L / max_len` interior points
/// (integer division), so a segment marginally over the limit is cut into
/// two near-halves. Only rounding can leave a resulting segment a frame
/// over an exact division. Pure function; identical inputs always produce
/// identical output.
pub fn extra_splits(plan: &SplitPlan, total_frames: usize, max_len: usize) -> SplitPlan {
    debug_assert!(max_len > 0);

    let mut result = plan.as_slice().to_vec();

    let bounds = iter::once(0)
        .chain(plan.as_slice().iter().copied())
        .chain(iter::once(total_frames));
    for (start, end) in bounds.tuple_windows() {
        let len = end - start;
        if len <= max_len {
            continue;
        }
        let count = len / max_len;
        for i in 1..=count {
            let position = start as f64 + len as f64 * i as f64 / (count + 1) as f64;
            result.push(position.round() as usize);
        }
    }

    result.sort_unstable();
    result.dedup();
    SplitPlan::new(result)
}

fn compose_segment_cmd(input: &Path, temp: &Path, plan: &SplitPlan) -> Vec<OsString> {
    let mut cmd: Vec<OsString> = into_vec![
        "ffmpeg",
        "-y",
        "-hide_banner",
        "-loglevel",
        "error",
        "-i",
        input,
        "-map",
        "0:v:0",
        "-an",
        "-c",
        "copy",
        "-avoid_negative_ts",
        "1",
        "-vsync",
        "0",
    ];

    if plan.is_empty() {
        cmd.push(temp.join("split").join("0.mkv").into());
    } else {
        cmd.push("-f".into());
        cmd.push("segment".into());
        cmd.push("-segment_frames".into());
        cmd.push(plan.as_slice().iter().join(",").into());
        cmd.push(temp.join("split").join("%05d.mkv").into());
    }

    cmd
}

/// Cuts the source into one stream-copied file per segment under
/// `<temp>/split`. An empty plan produces a single passthrough file.
#[tracing::instrument(level = "debug")]
pub fn segment(input: &Path, temp: &Path, plan: &SplitPlan) -> Result<(), SegmentationError> {
    let cmd = compose_segment_cmd(input, temp, plan);
    debug!("segmenting with {cmd:?}");

    let output = if let [program, args @ ..] = &*cmd {
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| SegmentationError::Spawn {
                source,
            })?
    } else {
        unreachable!()
    };

    if !output.status.success() {
        return Err(SegmentationError::Failed {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn leaves_short_segments_untouched() {
        let plan = SplitPlan::new(vec![100, 200]);
        assert_eq!(extra_splits(&plan, 300, 150), plan);
    }

    #[test]
    fn splits_both_boundary_segments_evenly() {
        // [0,400) gets one point at its middle, [400,1000) two at thirds.
        let plan = SplitPlan::new(vec![400]);
        let result = extra_splits(&plan, 1000, 300);
        assert_eq!(result.as_slice(), &[200, 400, 600, 800]);
    }

    #[test]
    fn splits_a_whole_clip_without_scene_changes() {
        let result = extra_splits(&SplitPlan::default(), 1000, 300);
        assert_eq!(result.as_slice(), &[250, 500, 750]);
    }

    #[test]
    fn halves_a_segment_marginally_over_the_limit() {
        // 599 frames with a 300 limit: one interior point, both halves fit.
        let result = extra_splits(&SplitPlan::default(), 599, 300);
        assert_eq!(result.as_slice(), &[300]);
        assert!(result.segments(599).iter().all(|segment| segment.frames() <= 300));
    }

    #[test]
    fn keeps_every_segment_within_the_limit() {
        let plan = SplitPlan::new(vec![113, 2971, 3022]);
        let max_len = 240;
        let result = extra_splits(&plan, 9000, max_len);

        result.ensure_valid(9000).unwrap();
        // Rounding may leave a segment one frame over an exact division.
        assert!(result
            .segments(9000)
            .iter()
            .all(|segment| segment.frames() <= max_len + 1));
        // Original split points survive the merge.
        for split in plan.as_slice() {
            assert!(result.as_slice().contains(split));
        }
    }

    #[test]
    fn subdivision_is_deterministic() {
        let plan = SplitPlan::new(vec![113, 2971]);
        assert_eq!(extra_splits(&plan, 9000, 240), extra_splits(&plan, 9000, 240));
    }

    #[test]
    fn resolves_the_disable_sentinel() {
        assert_eq!(SceneSource::resolve(Some("0")), SceneSource::Disabled);
        assert_eq!(SceneSource::resolve(None), SceneSource::Detect);
    }

    #[test]
    fn resolves_scene_file_paths_by_existence() {
        let temp = TempDir::new().unwrap();
        let existing = temp.path().join("saved.json");
        std::fs::write(&existing, "{\"scenes\": []}").unwrap();
        let missing = temp.path().join("fresh.json");

        let existing_str = existing.to_str().unwrap();
        let missing_str = missing.to_str().unwrap();
        assert_eq!(
            SceneSource::resolve(Some(existing_str)),
            SceneSource::ReuseExisting(existing.clone())
        );
        assert_eq!(
            SceneSource::resolve(Some(missing_str)),
            SceneSource::DetectAndCache(missing.clone())
        );
    }

    #[test]
    fn passthrough_command_produces_a_single_file() {
        let cmd = compose_segment_cmd(Path::new("in.mkv"), Path::new("tmp"), &SplitPlan::default());
        let last = cmd.last().unwrap();
        assert_eq!(*last, Path::new("tmp").join("split").join("0.mkv").into_os_string());
        assert!(!cmd.contains(&OsString::from("-segment_frames")));
    }

    #[test]
    fn split_command_passes_the_frame_list() {
        let plan = SplitPlan::new(vec![200, 400, 600]);
        let cmd = compose_segment_cmd(Path::new("in.mkv"), Path::new("tmp"), &plan);
        assert!(cmd.contains(&OsString::from("-segment_frames")));
        assert!(cmd.contains(&OsString::from("200,400,600")));
        assert_eq!(
            *cmd.last().unwrap(),
            Path::new("tmp").join("split").join("%05d.mkv").into_os_string()
        );
    }

    #[test]
    fn segment_lengths_follow_the_plan() {
        let plan = SplitPlan::new(vec![200, 400, 600, 800]);
        let segments = plan.segments(1000);
        assert_eq!(segments.len(), 5);
        assert!(segments.iter().all(|segment| segment.frames() == 200));
    }
}
