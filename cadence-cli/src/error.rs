//! CLI error type.

use thiserror::Error;

use cadence::config::ConfigError;
use cadence::logging::LoggingError;

/// Errors surfaced to the user by the `cadence` binary.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("Failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Arguments are individually valid but make no sense together.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}
