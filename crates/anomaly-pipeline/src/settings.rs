//! Pipeline Settings

use crate::error::Result;
use config::{builder::DefaultState, Config, ConfigBuilder, Environment, File};
use dsp_engine::{Cutoff, FilterKind, FilterSpec, MovingRms, DEFAULT_ORDER};
use event_locator::{PeakClusterer, SegmentExtractor};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Environment prefix; `VIBRA_PEAKS__MAX_GAP=500` sets `peaks.max_gap`
pub const ENV_PREFIX: &str = "VIBRA";

/// Band isolation settings; the sampling rate comes from the signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandConfig {
    pub kind: FilterKind,
    pub cutoff: Cutoff,
    #[serde(default = "default_order")]
    pub order: usize,
}

fn default_order() -> usize {
    DEFAULT_ORDER
}

impl BandConfig {
    /// Concrete filter description at `sampling_rate_hz`
    pub fn spec(&self, sampling_rate_hz: f64) -> FilterSpec {
        FilterSpec {
            kind: self.kind,
            cutoff: self.cutoff,
            order: self.order,
            sampling_rate_hz,
        }
    }
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            kind: FilterKind::Bandpass,
            cutoff: Cutoff::Band(2_000.0, 4_000.0),
            order: DEFAULT_ORDER,
        }
    }
}

/// How the band-limited signal is turned into an energy envelope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeMethod {
    /// Hilbert amplitude envelope at the raw rate
    Hilbert,
    /// Moving RMS of the filtered samples
    MovingRms,
    /// Hilbert envelope smoothed by the moving RMS
    #[default]
    HilbertRms,
}

/// Full pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Band isolation filter
    pub band: BandConfig,
    pub envelope: EnvelopeMethod,
    /// Used by the `moving_rms` and `hilbert_rms` envelope methods
    pub moving_rms: MovingRms,
    /// Detection threshold and event gap (raw samples)
    pub peaks: PeakClusterer,
    /// Extra raw-sample shift applied after the envelope geometry mapping
    pub alignment_offset: i64,
    pub segments: SegmentExtractor,
    /// Channels to analyze; empty means all
    pub channels: Vec<usize>,
    /// Embed the full one-sided spectrum in the report
    pub include_spectrum: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            band: BandConfig::default(),
            envelope: EnvelopeMethod::default(),
            moving_rms: MovingRms::new(100, 10),
            peaks: PeakClusterer::default(),
            alignment_offset: 0,
            segments: SegmentExtractor::new(0.1),
            channels: Vec::new(),
            include_spectrum: false,
        }
    }
}

impl PipelineConfig {
    /// Load from an optional file, then `VIBRA_*` environment overrides
    ///
    /// Missing keys keep their defaults. The file format follows its
    /// extension (TOML, JSON, YAML, ...).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            info!("Loading pipeline configuration from {}", path.display());
            builder = builder.add_source(File::from(path).required(false));
        }
        Self::from_builder(builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        ))
    }

    /// Deserialize whatever sources `builder` holds
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        Ok(builder.build()?.try_deserialize()?)
    }
}
