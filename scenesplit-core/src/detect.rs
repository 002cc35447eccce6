//! External scene detection invocations. Both detectors run as blocking
//! child processes and only their frame lists cross back into this crate.

use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::error::DetectorError;

/// First-pass parameters used to generate keyframe interval stats when the
/// user's own encoder parameters do not apply.
pub const DEFAULT_FIRST_PASS_PARAMS: &[&str] = &["-preset", "veryfast", "-crf", "30"];

static PTS_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"pts_time:(\d+(?:\.\d+)?)").expect("valid regex"));

/// Shot boundary detection via the scene score filter. Returns the first
/// frames of detected shots, spaced at least `min_scene_len` frames apart.
#[tracing::instrument(level = "debug")]
pub fn detect_shots(
    source: &Path,
    frame_rate: f64,
    threshold: f64,
    min_scene_len: usize,
) -> Result<Vec<usize>, DetectorError> {
    info!("Starting scene detection, threshold: {threshold}, min scene length: {min_scene_len}");

    let filter = format!("select='gt(scene,{threshold})',metadata=print:file=-");
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-hide_banner", "-loglevel", "error", "-i"])
        .arg(source)
        .args(["-an", "-vf", &filter, "-f", "null", "-"])
        .stdin(Stdio::null());
    debug!("detecting shots with {cmd:?}");

    let output = cmd.output().map_err(|source| DetectorError::Spawn {
        tool: "ffmpeg scene filter",
        source,
    })?;
    if !output.status.success() {
        return Err(DetectorError::Failed {
            tool:   "ffmpeg scene filter",
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    // The filter renumbers the frames it lets through, so the original frame
    // numbers have to be recovered from the presentation timestamps.
    let mut report = String::from_utf8_lossy(&output.stdout).into_owned();
    report.push_str(&String::from_utf8_lossy(&output.stderr));

    Ok(space_out(timestamp_frames(&report, frame_rate), min_scene_len))
}

/// Keyframe interval detection: runs a first pass through libx264, then
/// reads the keyframe placements out of the pass log it leaves at
/// `stats_path`.
#[tracing::instrument(level = "debug")]
pub fn detect_keyframes(
    source: &Path,
    stats_path: &Path,
    min_scene_len: usize,
    encoder_params: &[String],
) -> Result<Vec<usize>, DetectorError> {
    info!("Starting keyframe interval detection, min scene length: {min_scene_len}");

    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-y", "-hide_banner", "-loglevel", "error", "-i"])
        .arg(source)
        .args(["-an", "-c:v", "libx264"])
        .args(encoder_params)
        .args(["-pass", "1", "-passlogfile"])
        .arg(stats_path)
        .args(["-f", "null", "-"])
        .stdin(Stdio::null());
    debug!("running first pass with {cmd:?}");

    let output = cmd.output().map_err(|source| DetectorError::Spawn {
        tool: "ffmpeg first pass",
        source,
    })?;
    if !output.status.success() {
        return Err(DetectorError::Failed {
            tool:   "ffmpeg first pass",
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    // ffmpeg appends the pass number to the log file prefix.
    let log_path = PathBuf::from(format!("{}-0.log", stats_path.display()));
    let stats = fs::read_to_string(&log_path).map_err(|source| DetectorError::StatsUnreadable {
        path: log_path.clone(),
        source,
    })?;

    Ok(space_out(keyframe_frames(&stats), min_scene_len))
}

/// Frame numbers recovered from `pts_time:` records, in report order.
fn timestamp_frames(report: &str, frame_rate: f64) -> Vec<usize> {
    PTS_TIME
        .captures_iter(report)
        .filter_map(|capture| capture[1].parse::<f64>().ok())
        .map(|pts_time| (pts_time * frame_rate).round() as usize)
        .collect()
}

/// Display-order frame numbers of the IDR frames recorded in an x264 pass
/// log.
fn keyframe_frames(stats: &str) -> Vec<usize> {
    let mut frames: Vec<usize> = stats
        .lines()
        .filter(|line| line.contains("type:I"))
        .filter_map(|line| {
            let field = line.split_whitespace().find(|field| field.starts_with("in:"))?;
            field.strip_prefix("in:")?.parse().ok()
        })
        .collect();
    frames.sort_unstable();
    frames
}

/// Drops candidate split points closer than `min_len` frames to the
/// previously kept one, counting from the start of the clip. Also drops
/// frame 0, which is never an interior split.
fn space_out(candidates: impl IntoIterator<Item = usize>, min_len: usize) -> Vec<usize> {
    let min_len = min_len.max(1);
    let mut kept = Vec::new();
    let mut last = 0usize;
    for frame in candidates {
        if frame >= last + min_len {
            kept.push(frame);
            last = frame;
        }
    }
    kept
}
