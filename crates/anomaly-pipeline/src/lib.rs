//! Vibration Anomaly Localization Pipeline
//!
//! Isolates a frequency band, builds an energy envelope, clusters envelope
//! peaks into events and cuts raw segments around each event.

mod error;
mod pipeline;
mod settings;

pub use error::{PipelineError, Result};
pub use pipeline::{ChannelReport, Pipeline, PipelineReport};
pub use settings::{BandConfig, EnvelopeMethod, PipelineConfig, ENV_PREFIX};

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("Tracing subscriber already installed");
    }
}
