use std::{path::PathBuf, process::exit};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use scenesplit_core::{
    context::RunContext,
    settings::{IoSettings, RunSettings, SplitSettings},
    Encoder,
    SplitMethod,
};
use tracing::error;

mod logging;

pub const DEFAULT_TEMP_PATH: &str = ".scenesplit";
pub const DEFAULT_LOG_PATH: &str = "logs/scenesplit.log";

/// Cuts a video into independently encodable chunks along scene boundaries.
#[derive(Parser, Debug)]
#[command(name = "scenesplit", version, about)]
struct Cli {
    /// Source video file
    #[arg(short, long)]
    input: PathBuf,

    /// Working directory for the split plan and the chunk files
    #[arg(long, default_value = DEFAULT_TEMP_PATH)]
    temp: PathBuf,

    /// Reusable scene file path, or "0" to disable scene detection
    #[arg(short, long)]
    scenes: Option<String>,

    /// How split points are chosen
    #[arg(long, value_enum, default_value_t = SplitMethodArg::ShotDetect)]
    split_method: SplitMethodArg,

    /// Scene score a frame must exceed to count as a shot change (0..=1)
    #[arg(long, default_value_t = 0.4)]
    threshold: f64,

    /// Minimum distance between split points, in frames
    #[arg(long, default_value_t = 24)]
    min_scene_len: usize,

    /// Maximum chunk length in frames; 0 or absent disables extra splits
    #[arg(short = 'x', long)]
    extra_split: Option<usize>,

    /// Encoder the chunks are destined for
    #[arg(short, long, value_enum, default_value_t = EncoderArg::Aom)]
    encoder: EncoderArg,

    /// Parameters for the keyframe interval first pass, as one quoted string
    #[arg(short, long, allow_hyphen_values = true)]
    video_params: Option<String>,

    /// Reuse the split plan a previous run left in the temp directory
    #[arg(short, long)]
    resume: bool,

    /// Stop after writing the scene file, do not produce chunks
    #[arg(long)]
    sc_only: bool,

    /// Log file location
    #[arg(short, long)]
    log_file: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum SplitMethodArg {
    ShotDetect,
    KeyframeInterval,
}

impl From<SplitMethodArg> for SplitMethod {
    fn from(arg: SplitMethodArg) -> Self {
        match arg {
            SplitMethodArg::ShotDetect => SplitMethod::ShotDetect,
            SplitMethodArg::KeyframeInterval => SplitMethod::KeyframeInterval,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum EncoderArg {
    Aom,
    Rav1e,
    SvtAv1,
    Vpx,
    X264,
    X265,
}

impl From<EncoderArg> for Encoder {
    fn from(arg: EncoderArg) -> Self {
        match arg {
            EncoderArg::Aom => Encoder::aom,
            EncoderArg::Rav1e => Encoder::rav1e,
            EncoderArg::SvtAv1 => Encoder::svt_av1,
            EncoderArg::Vpx => Encoder::vpx,
            EncoderArg::X264 => Encoder::x264,
            EncoderArg::X265 => Encoder::x265,
        }
    }
}

fn main() {
    if let Err(e) = run() {
        error!("{e:#}");
        eprintln!("Error: {e:#}");
        exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let log_file = cli.log_file.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH));
    let _guard = logging::init_logging(&log_file)?;

    let video_params = match cli.video_params.as_deref() {
        Some(params) => shlex::split(params)
            .with_context(|| format!("Failed to parse video params: {params}"))?,
        None => Vec::new(),
    };

    let io_settings = IoSettings {
        input: cli.input,
        temp:  cli.temp,
    };
    let split_settings = SplitSettings {
        scenes: cli.scenes,
        split_method: cli.split_method.into(),
        threshold: cli.threshold,
        min_scene_len: cli.min_scene_len,
        extra_split: cli.extra_split,
        encoder: cli.encoder.into(),
        video_params,
    };
    let run_settings = RunSettings {
        resume:  cli.resume,
        sc_only: cli.sc_only,
    };

    let mut context = RunContext::new(io_settings, split_settings, run_settings)?;
    context.run()
}
