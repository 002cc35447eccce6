use std::{fs, io, path::Path};

use anyhow::{Context, Result};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Layer,
};

/// Sends INFO and up to stderr (overridable through `RUST_LOG`) and DEBUG
/// and up to `log_file`. The returned guard must stay alive for the file
/// writer to flush.
pub fn init_logging(log_file: &Path) -> Result<WorkerGuard> {
    if let Some(parent) = log_file.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {parent:?}"))?;
    }
    let file = fs::File::create(log_file)
        .with_context(|| format!("Failed to create log file {log_file:?}"))?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        );
    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_filter(LevelFilter::DEBUG);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}
