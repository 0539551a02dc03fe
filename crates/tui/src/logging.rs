use directories::BaseDirs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Sends logs to `<data_dir>/luke/logs/luke.log.<date>`; stdout belongs to
/// the UI. Returns `None` when no log directory can be set up, in which case
/// the session runs without logs. Keep the guard alive until exit.
pub fn init() -> Option<WorkerGuard> {
    let log_dir = BaseDirs::new()?.data_dir().join("luke").join("logs");
    std::fs::create_dir_all(&log_dir).ok()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "luke.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    let layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_writer(writer);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .ok()?;
    Some(guard)
}
