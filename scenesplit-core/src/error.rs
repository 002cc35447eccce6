use std::{io, path::PathBuf, process::ExitStatus};

use thiserror::Error;

/// Failures reading or writing a scene list sidecar file.
#[derive(Debug, Error)]
pub enum SceneFileError {
    #[error("failed to read scene file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write scene file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("scene file {path} is not a valid scene list: {source}")]
    Malformed {
        path:   PathBuf,
        source: serde_json::Error,
    },
}

/// Failures raised by the external scene detection invocations.
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("failed to spawn {tool}: {source}")]
    Spawn { tool: &'static str, source: io::Error },
    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool:   &'static str,
        status: ExitStatus,
        stderr: String,
    },
    #[error("first-pass stats file {path} is unreadable: {source}")]
    StatsUnreadable { path: PathBuf, source: io::Error },
}

/// Failures cutting the source into chunk files.
#[derive(Debug, Error)]
pub enum SegmentationError {
    #[error("failed to spawn ffmpeg for segmenting: {source}")]
    Spawn { source: io::Error },
    #[error("ffmpeg segmenting exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
}
