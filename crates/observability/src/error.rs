//! Error types for observability crate

use thiserror::Error;

/// Errors that can occur during observability initialization
#[derive(Error, Debug)]
pub enum ObservabilityError {
    /// A global subscriber was already installed
    #[error("Failed to initialize observability: {0}")]
    InitFailed(String),

    /// The log level is not a valid filter directive
    #[error("Configuration error: {0}")]
    Config(String),
}
