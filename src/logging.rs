use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the global subscriber: compact lines on stderr, plus plain lines appended to
/// `file_name` inside `dir`. Both honour `RUST_LOG`, defaulting to `info`.
/// When the log file cannot be opened only stderr logging is installed.
pub fn init(dir: &Path, file_name: &str) {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr = fmt::layer()
        .with_level(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .with_filter(filter());

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir);
    let (file, open_error) = match appender {
        Ok(appender) => (
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(appender)
                    .with_filter(filter()),
            ),
            None,
        ),
        Err(err) => (None, Some(err)),
    };

    tracing_subscriber::registry().with(stderr).with(file).init();

    if let Some(err) = open_error {
        tracing::warn!("file logging disabled, {}: {err}", dir.display());
    }
}
