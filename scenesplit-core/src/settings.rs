use std::path::PathBuf;

use crate::{Encoder, SplitMethod};

/// Source and working paths for a run. Read-only once constructed.
#[derive(Debug, Clone)]
pub struct IoSettings {
    pub input: PathBuf,
    pub temp:  PathBuf,
}

impl IoSettings {
    /// The working scene file this subsystem rewrites every run; the
    /// canonical record of the split decision actually used.
    pub fn working_scene_file(&self) -> PathBuf {
        self.temp.join("scenes.txt")
    }

    /// Where the chunk files are materialized.
    pub fn split_dir(&self) -> PathBuf {
        self.temp.join("split")
    }

    /// Prefix for the keyframe interval first-pass stats.
    pub fn keyframe_stats_prefix(&self) -> PathBuf {
        self.temp.join("keyframes")
    }
}

/// Everything that controls how the split plan is produced.
#[derive(Debug, Clone)]
pub struct SplitSettings {
    /// Path to a reusable scene file, or the literal `"0"` to disable
    /// detection entirely.
    pub scenes:        Option<String>,
    pub split_method:  SplitMethod,
    /// Scene score a frame must exceed to count as a shot change.
    pub threshold:     f64,
    /// Minimum distance between split points, in frames.
    pub min_scene_len: usize,
    /// Maximum segment length in frames; `None` or zero disables the
    /// subdivision pass.
    pub extra_split:   Option<usize>,

    /// Encoder the chunks are destined for; decides whether `video_params`
    /// can drive the keyframe interval first pass.
    pub encoder:      Encoder,
    pub video_params: Vec<String>,
}

/// Run-level behavior switches.
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    /// Reuse the split plan a previous run left in the temp directory.
    pub resume:  bool,
    /// Stop after writing the scene file; do not produce chunks.
    pub sc_only: bool,
}
