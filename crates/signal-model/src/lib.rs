//! Signal Model
//!
//! Immutable multi-channel sample buffer shared read-only by every pipeline
//! stage, plus the error taxonomy the stages report through.

mod error;
mod signal;

pub use error::SignalError;
pub use signal::MultiChannelSignal;
