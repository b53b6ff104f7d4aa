//! Console (and optional file) logging for the CLI.

use std::path::Path;

use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::error::{CliError, Result};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "split_playlist=info,playlist_splitter=info";

/// Formats timestamps in the local timezone.
#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

fn filter(verbose: bool, quiet: bool) -> EnvFilter {
    if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    }
}

/// Installs the global subscriber. Keep the returned guard alive until exit
/// so buffered file output is flushed.
pub fn init_logging(verbose: bool, quiet: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let console = fmt::layer()
        .with_target(verbose)
        .with_timer(LocalTimer);
    let registry = tracing_subscriber::registry()
        .with(filter(verbose, quiet))
        .with(console);

    let Some(path) = log_file else {
        registry
            .try_init()
            .map_err(|e| CliError::Logging(e.to_string()))?;
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| CliError::Logging(format!("{} is not a file path", path.display())))?;
    std::fs::create_dir_all(dir)?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    registry
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(LocalTimer),
        )
        .try_init()
        .map_err(|e| CliError::Logging(e.to_string()))?;
    Ok(Some(guard))
}
