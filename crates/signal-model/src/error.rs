//! Signal Processing Error Types

use thiserror::Error;

/// Errors raised by any stage of the localization pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    /// Malformed, empty or too-short input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unknown filter kind, Nyquist violation or unordered band edges
    #[error("Invalid filter spec: {0}")]
    InvalidFilterSpec(String),

    /// Window is zero, larger than the input, or has a zero step
    #[error("Invalid window: window={window}, step={step}, input length={len}")]
    InvalidWindow { window: usize, step: usize, len: usize },

    /// Mapped index or window falls outside the raw sample range (strict mode)
    #[error("Index {index} maps outside raw sample range [0, {len})")]
    IndexMapping { index: i64, len: usize },
}

impl SignalError {
    pub(crate) fn input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
