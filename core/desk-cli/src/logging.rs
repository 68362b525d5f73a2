//! File logging for the CLI.
//!
//! Logs go to `~/.orderdesk/logs/` so stdout stays clean for command output.
//! Best-effort: if the directory cannot be created, the CLI runs unlogged.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const FILTER_ENV: &str = "ORDERDESK_LOG";

/// Initializes the tracing subscriber. The returned guard must be held for
/// the life of the process so buffered log lines get flushed.
pub fn init() -> Option<WorkerGuard> {
    let log_dir = dirs::home_dir()?.join(".orderdesk").join("logs");
    std::fs::create_dir_all(&log_dir).ok()?;

    let appender = tracing_appender::rolling::daily(log_dir, "orderdesk.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;

    Some(guard)
}
