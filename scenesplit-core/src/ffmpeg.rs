use std::{path::Path, process::Command};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::debug;

/// Frame count and rate reported by ffprobe for the first video stream.
#[derive(Debug, Clone, Copy)]
pub struct ClipInfo {
    pub num_frames: usize,
    pub frame_rate: f64,
}

#[derive(Deserialize)]
struct ProbeOutput {
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeStream {
    nb_read_frames: Option<String>,
    r_frame_rate:   Option<String>,
}

/// Counts the frames of the first video stream by decoding the container.
/// No caching; callers keep the value themselves.
#[tracing::instrument(level = "debug")]
pub fn probe(source: &Path) -> Result<ClipInfo> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-count_frames",
            "-show_entries",
            "stream=nb_read_frames,r_frame_rate",
            "-print_format",
            "json",
        ])
        .arg(source)
        .output()
        .with_context(|| format!("failed to run ffprobe on {}", source.display()))?;

    if !output.status.success() {
        bail!(
            "ffprobe failed on {}: {}",
            source.display(),
            String::from_utf8_lossy(&output.stderr)
        );
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    debug!("ffprobe reported {raw}");
    let probe: ProbeOutput =
        serde_json::from_str(&raw).context("failed to parse ffprobe output")?;
    let stream = probe
        .streams
        .first()
        .with_context(|| format!("no video stream in {}", source.display()))?;

    let num_frames = stream
        .nb_read_frames
        .as_deref()
        .and_then(|count| count.parse().ok())
        .with_context(|| format!("ffprobe did not report a frame count for {}", source.display()))?;
    let frame_rate = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .with_context(|| format!("ffprobe did not report a frame rate for {}", source.display()))?;

    Ok(ClipInfo {
        num_frames,
        frame_rate,
    })
}

/// Frame rates arrive either as a ratio like `30000/1001` or as a plain
/// decimal.
fn parse_frame_rate(rate: &str) -> Option<f64> {
    if let Some((numerator, denominator)) = rate.split_once('/') {
        let numerator: f64 = numerator.parse().ok()?;
        let denominator: f64 = denominator.parse().ok()?;
        return (denominator > 0.0).then_some(numerator / denominator);
    }
    rate.parse().ok()
}
