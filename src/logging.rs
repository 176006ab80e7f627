use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "noteline.log";

/// Initialise logging into `<dir>/noteline.log`; the terminal belongs to the
/// TUI. The level is `info`, or `debug` with `--debug`, in which case
/// `RUST_LOG` may override it.
///
/// Returns the writer guard, which must live until exit. Logging is skipped
/// when the directory cannot be used.
pub fn init(debug: bool, dir: &Path) -> Option<WorkerGuard> {
    let level = if debug { "debug" } else { "info" };
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    if fs::create_dir_all(dir).is_err() {
        return None;
    }
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE)
        .build(dir)
        .ok()?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    Some(guard)
}
