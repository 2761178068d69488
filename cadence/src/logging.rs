//! Logging setup.
//!
//! Installs a `tracing` subscriber with a human-readable stderr layer and an
//! optional plain-text file layer. `RUST_LOG` takes precedence over the
//! configured filter.
//!
//! ```ignore
//! let _guard = cadence::logging::init(&LogConfig::default())?;
//! tracing::info!("ready");
//! // keep `_guard` alive until exit so the file writer flushes
//! ```

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when neither `RUST_LOG` nor the caller provide one.
pub const DEFAULT_LOG_FILTER: &str = "cadence=info";

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second].[subsecond digits:3]");

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {source}")]
    InvalidFilter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("Failed to open log file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("A global subscriber is already installed: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

/// Logging options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `cadence=debug`.
    pub filter: String,
    /// Append logs to this file in addition to stderr.
    pub file: Option<PathBuf>,
    /// Colorize stderr output.
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            file: None,
            ansi: true,
        }
    }
}

impl LogConfig {
    /// Config whose filter follows a `-v` count.
    pub fn with_verbosity(verbose: u8) -> Self {
        Self {
            filter: verbosity_filter(verbose).to_string(),
            ..Self::default()
        }
    }
}

/// Map a `-v` count to a filter directive.
pub fn verbosity_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "cadence=info",
        1 => "cadence=debug",
        _ => "cadence=trace",
    }
}

/// Keeps the background file writer alive. Dropping it flushes the file.
#[derive(Debug)]
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber.
pub fn init(config: &LogConfig) -> Result<LogGuard, LoggingError> {
    let filter = build_filter(config)?;
    let timer = LocalTime::new(TIMESTAMP_FORMAT);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(timer.clone())
        .with_ansi(config.ansi)
        .with_target(false);

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let file = open_log_file(path)?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_timer(timer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    if let Some(path) = &config.file {
        tracing::debug!(path = %path.display(), "File logging enabled");
    }

    Ok(LogGuard { _file: guard })
}

/// `RUST_LOG` if set and valid, the configured filter otherwise.
fn build_filter(config: &LogConfig) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.filter).map_err(|source| LoggingError::InvalidFilter {
        filter: config.filter.clone(),
        source,
    })
}

fn open_log_file(path: &Path) -> Result<std::fs::File, LoggingError> {
    let io_error = |source| LoggingError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_error)
}
