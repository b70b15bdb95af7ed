//! Log subscriber setup.
//!
//! Library code only emits `tracing` events; the binary decides where they go.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter directives, e.g. `ANSWERFLOW_LOG=answerflow_core=debug`.
pub const LOG_ENV: &str = "ANSWERFLOW_LOG";

const DEFAULT_FILTER: &str = "answerflow=warn";

/// Installs the global subscriber, writing to stderr or to `log_file`.
///
/// The returned guard flushes the file writer on drop; keep it alive until exit.
pub fn init(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .context("install log subscriber")?;
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .with_context(|| format!("log file path has no file name: {}", path.display()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).with_context(|| format!("create log dir {}", dir.display()))?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .try_init()
        .context("install log subscriber")?;
    Ok(Some(guard))
}
