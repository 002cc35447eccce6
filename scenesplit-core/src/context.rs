use std::fs;

use anyhow::{bail, ensure, Context, Result};
use tracing::{debug, error, info};

use crate::{
    detect,
    ffmpeg,
    resume,
    scenes::{read_scenes_from_file, write_scenes_to_file, SplitPlan},
    settings::{IoSettings, RunSettings, SplitSettings},
    split::{self, SceneSource},
    Encoder,
    SplitMethod,
};

/// Drives one run end to end: decide the split plan, persist it, and cut
/// the source into chunk files.
#[derive(Debug)]
pub struct RunContext {
    pub frames:         usize,
    pub frame_rate:     f64,
    pub io_settings:    IoSettings,
    pub split_settings: SplitSettings,
    pub run_settings:   RunSettings,
    resuming:           bool,
}

impl RunContext {
    pub fn new(
        io_settings: IoSettings,
        split_settings: SplitSettings,
        run_settings: RunSettings,
    ) -> Result<Self> {
        let mut this = Self {
            frames: 0,
            frame_rate: 0.0,
            io_settings,
            split_settings,
            run_settings,
            resuming: false,
        };
        this.validate()?;
        this.initialize()?;

        let clip_info = ffmpeg::probe(&this.io_settings.input)?;
        this.frames = clip_info.num_frames;
        this.frame_rate = clip_info.frame_rate;
        ensure!(
            this.frames > 0,
            "Input file {:?} contains no video frames",
            this.io_settings.input
        );

        Ok(this)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.io_settings.input.exists(),
            "Input file {:?} does not exist!",
            self.io_settings.input
        );

        for tool in ["ffmpeg", "ffprobe"] {
            if which::which(tool).is_err() {
                bail!("{tool} not found. Is it installed in the system path?");
            }
        }

        if self.split_settings.split_method == SplitMethod::ShotDetect {
            ensure!(
                (0.0..=1.0).contains(&self.split_settings.threshold),
                "Scene threshold must be within 0..=1, got {}",
                self.split_settings.threshold
            );
        }

        Ok(())
    }

    /// Creates the temporary directory layout, wiping leftovers from earlier
    /// runs unless they are being resumed.
    fn initialize(&mut self) -> Result<()> {
        self.resuming = resume::should_resume(&self.run_settings, &self.io_settings);

        if !self.resuming && self.io_settings.temp.is_dir() {
            fs::remove_dir_all(&self.io_settings.temp).with_context(|| {
                format!(
                    "Failed to remove temporary directory {:?}",
                    self.io_settings.temp
                )
            })?;
        }
        fs::create_dir_all(self.io_settings.split_dir()).with_context(|| {
            format!(
                "Failed to create temporary directory {:?}",
                self.io_settings.temp
            )
        })?;
        debug!("temporary directory: {:?}", self.io_settings.temp);

        Ok(())
    }

    pub fn run(&mut self) -> Result<()> {
        info!(
            "Input: {:?}, {} frames @ {:.3} fps",
            self.io_settings.input, self.frames, self.frame_rate
        );

        let plan = self.split_routine()?;
        let segments = plan.segments(self.frames);

        if self.run_settings.sc_only {
            debug!("scene detection only, skipping segmenting");
            return Ok(());
        }

        info!("Segmenting into {} chunks", segments.len());
        split::segment(&self.io_settings.input, &self.io_settings.temp, &plan)?;
        info!("Segmenting done");

        Ok(())
    }

    /// Produces the split plan for this run: loads it back when resuming,
    /// otherwise resolves a scene source, detects if needed, bounds the
    /// segment sizes, and persists the result.
    fn split_routine(&self) -> Result<SplitPlan> {
        let scene_file = self.io_settings.working_scene_file();

        if self.resuming {
            let plan = read_scenes_from_file(&scene_file)?;
            plan.ensure_valid(self.frames).with_context(|| {
                format!("scene file {scene_file:?} does not match the input clip")
            })?;
            info!(
                "Resuming with {} splits from {scene_file:?}",
                plan.len()
            );
            return Ok(plan);
        }

        let source = SceneSource::resolve(self.split_settings.scenes.as_deref());
        let mut plan = match &source {
            SceneSource::Disabled => {
                info!("Skipping scene detection");
                SplitPlan::default()
            },
            SceneSource::ReuseExisting(path) => {
                info!("Using Saved Scenes");
                let plan = read_scenes_from_file(path)?;
                plan.ensure_valid(self.frames).with_context(|| {
                    format!("scene file {path:?} does not match the input clip")
                })?;
                plan
            },
            SceneSource::DetectAndCache(_) | SceneSource::Detect => self.detect()?,
        };

        if let SceneSource::DetectAndCache(path) = &source {
            write_scenes_to_file(&plan, path)?;
            info!("Saved detected scenes to {path:?} for reuse");
        }

        write_scenes_to_file(&plan, &scene_file)?;

        if let Some(max_len) = self.split_settings.extra_split.filter(|max_len| *max_len > 0) {
            plan = split::extra_splits(&plan, self.frames, max_len);
            write_scenes_to_file(&plan, &scene_file)?;
        }

        Ok(plan)
    }

    fn detect(&self) -> Result<SplitPlan> {
        debug!(
            "detecting splits with method {}",
            self.split_settings.split_method
        );
        let detected = match self.split_settings.split_method {
            SplitMethod::ShotDetect => detect::detect_shots(
                &self.io_settings.input,
                self.frame_rate,
                self.split_settings.threshold,
                self.split_settings.min_scene_len,
            ),
            SplitMethod::KeyframeInterval => detect::detect_keyframes(
                &self.io_settings.input,
                &self.io_settings.keyframe_stats_prefix(),
                self.split_settings.min_scene_len,
                &self.first_pass_params(),
            ),
        };

        let splits = match detected {
            Ok(splits) => splits,
            Err(e) => {
                error!("Scene detection failed: {e}");
                return Err(e.into());
            },
        };

        let plan = SplitPlan::new(
            splits
                .into_iter()
                .filter(|&split| split > 0 && split < self.frames)
                .collect(),
        );
        plan.ensure_valid(self.frames)
            .context("detector returned an invalid split list")?;
        info!("Found {} scenes", plan.len() + 1);

        Ok(plan)
    }

    /// The keyframe interval first pass runs through libx264; the user's
    /// own parameters only apply when that is also the target encoder.
    fn first_pass_params(&self) -> Vec<String> {
        if self.split_settings.encoder == Encoder::x264
            && !self.split_settings.video_params.is_empty()
        {
            self.split_settings.video_params.clone()
        } else {
            detect::DEFAULT_FIRST_PASS_PARAMS
                .iter()
                .map(|param| (*param).to_string())
                .collect()
        }
    }
}
