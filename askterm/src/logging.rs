//! Development-time tracing for debugging askterm.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: Dev diagnostics via `RUST_LOG`, written to
//!   `PathManager::debug_log_path` so they never interleave with the
//!   conversation. Falls back to stderr when the file cannot be opened.
//!
//! - **Transcript (`io/transcript`)**: The user-facing conversation log in
//!   `<home>/askterm.log`. Always written, unaffected by `RUST_LOG`.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`, defaulting to `warn`, and writes to `log_file` when
/// given. Keep the returned guard alive until exit so buffered file output
/// is flushed.
///
/// # Example
/// ```bash
/// RUST_LOG=askterm=debug askterm
/// ```
pub fn init(log_file: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let appender = log_file.and_then(file_appender);

    match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(writer).with_ansi(false).compact())
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr).compact())
                .init();
            None
        }
    }
}

/// Non-rotating appender writing to exactly `path`.
fn file_appender(path: &Path) -> Option<RollingFileAppender> {
    let dir = path.parent()?;
    let name = path.file_name()?.to_str()?;
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(dir)
        .ok()
}
