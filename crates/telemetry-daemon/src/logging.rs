use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::DaemonConfig;
use crate::error::DaemonError;

/// Rotating file logger, mirroring the teacher's `setup_logging`: a
/// non-blocking file appender plus an `EnvFilter` defaulting to `info`
/// (`debug` when `--verbose`/`TELEMETRY_VERBOSE` is set).
pub fn setup(config: &DaemonConfig) -> Result<tracing_appender::non_blocking::WorkerGuard, DaemonError> {
    let parent = config.log_path.parent().ok_or(DaemonError::NoStateDir)?;
    std::fs::create_dir_all(parent)?;

    let file_name = config.log_path.file_name().ok_or(DaemonError::NoStateDir)?;
    let file_appender = tracing_appender::rolling::never(parent, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if config.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
