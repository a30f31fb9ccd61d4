//! Pipeline Error Types

use signal_model::SignalError;
use thiserror::Error;

/// Errors surfaced by [`crate::Pipeline`] and configuration loading
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A processing stage rejected its input or parameters
    #[error("Signal processing failed: {0}")]
    Signal(#[from] SignalError),

    /// Configuration sources could not be read or deserialized
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Report serialization failed
    #[error("Report serialization failed: {0}")]
    Report(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
