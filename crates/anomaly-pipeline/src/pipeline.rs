//! Localization pipeline
//!
//! Runs the stages in order for every selected channel: spectrum
//! (diagnostic), band isolation, envelope, peak clustering, segment
//! extraction.

use crate::error::Result;
use crate::settings::{EnvelopeMethod, PipelineConfig};
use dsp_engine::{
    ButterworthFilter, EnvelopeSignal, HilbertEnvelope, SpectralAnalyzer, SpectralResult, StatisticalFeatures,
};
use event_locator::{IndexMapping, PeakGroup, Segment};
use serde::Serialize;
use signal_model::{MultiChannelSignal, SignalError};
use tracing::{debug, info, warn};

/// Results for one channel
#[derive(Debug, Clone, Serialize)]
pub struct ChannelReport {
    pub channel: usize,
    /// Strongest non-DC frequency of the raw channel
    pub dominant_frequency_hz: Option<f64>,
    /// Detection level the envelope was compared against
    pub threshold: f64,
    /// Envelope length and its mapping back to raw samples
    pub envelope_len: usize,
    pub mapping: IndexMapping,
    pub groups: Vec<PeakGroup>,
    /// Representative index of every group, mapped to raw samples
    pub event_indices: Vec<i64>,
    pub segments: Vec<Segment>,
    /// Amplitude statistics of each segment, in segment order
    pub segment_features: Vec<StatisticalFeatures>,
}

/// Everything the pipeline derived from one signal
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub sample_count: usize,
    pub sampling_rate_hz: f64,
    pub config: PipelineConfig,
    pub channels: Vec<ChannelReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spectrum: Option<SpectralResult>,
}

impl PipelineReport {
    /// Total number of extracted segments across channels
    pub fn segment_count(&self) -> usize {
        self.channels.iter().map(|c| c.segments.len()).sum()
    }

    /// Pretty JSON for the reporting side
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Anomaly localization pipeline
pub struct Pipeline {
    config: PipelineConfig,
    analyzer: SpectralAnalyzer,
    hilbert: HilbertEnvelope,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            analyzer: SpectralAnalyzer::new(),
            hilbert: HilbertEnvelope::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage over `signal`
    pub fn run(&mut self, signal: &MultiChannelSignal) -> Result<PipelineReport> {
        info!(
            "Running pipeline: {} channels x {} samples @ {} Hz, band {} {:?}",
            signal.channel_count(),
            signal.sample_count(),
            signal.sampling_rate_hz(),
            self.config.band.kind,
            self.config.band.cutoff
        );

        let channels = self.selected_channels(signal)?;
        let spectrum = self.analyzer.analyze(signal)?;
        let filter = ButterworthFilter::new(self.config.band.spec(signal.sampling_rate_hz()))?;
        let filtered = filter.apply(signal)?;

        let mut reports = Vec::with_capacity(channels.len());
        for channel in channels {
            let report = self.run_channel(signal, &filtered, &spectrum, channel)?;
            if report.groups.is_empty() {
                warn!("No events detected on channel {}", channel);
            }
            reports.push(report);
        }

        let report = PipelineReport {
            sample_count: signal.sample_count(),
            sampling_rate_hz: signal.sampling_rate_hz(),
            config: self.config.clone(),
            channels: reports,
            spectrum: self.config.include_spectrum.then_some(spectrum),
        };
        info!("Pipeline complete: {} segments extracted", report.segment_count());
        Ok(report)
    }

    fn selected_channels(&self, signal: &MultiChannelSignal) -> Result<Vec<usize>> {
        if self.config.channels.is_empty() {
            return Ok((0..signal.channel_count()).collect());
        }
        if let Some(&bad) = self.config.channels.iter().find(|&&c| c >= signal.channel_count()) {
            return Err(SignalError::InvalidInput(format!(
                "channel {} requested but signal has {} channels",
                bad,
                signal.channel_count()
            ))
            .into());
        }
        Ok(self.config.channels.clone())
    }

    /// Envelope of one band-limited channel
    fn envelope(&mut self, samples: &[f64]) -> Result<EnvelopeSignal> {
        let envelope = match self.config.envelope {
            EnvelopeMethod::Hilbert => self.hilbert.envelope(samples)?,
            EnvelopeMethod::MovingRms => self.config.moving_rms.apply(samples)?,
            EnvelopeMethod::HilbertRms => {
                let hilbert = self.hilbert.envelope(samples)?;
                self.config.moving_rms.smooth(&hilbert)?
            }
        };
        Ok(envelope)
    }

    fn run_channel(
        &mut self,
        raw: &MultiChannelSignal,
        filtered: &MultiChannelSignal,
        spectrum: &SpectralResult,
        channel: usize,
    ) -> Result<ChannelReport> {
        let band = filtered.channel_to_vec(channel)?;
        let envelope = self.envelope(&band)?;

        let detection = self.config.peaks.locate(&envelope);

        let mapping = IndexMapping::from_envelope(&envelope).with_alignment_offset(self.config.alignment_offset);
        let event_indices: Vec<i64> = detection.representatives().iter().map(|&i| mapping.to_raw(i)).collect();
        let segments = self.config.segments.extract_raw(raw, channel, &event_indices)?;
        let segment_features = segments.iter().map(|s| StatisticalFeatures::compute(&s.samples)).collect();

        debug!(
            "Channel {}: envelope {} values (step {}), gap {} envelope samples, {} groups, {} segments",
            channel,
            envelope.len(),
            envelope.step(),
            detection.max_gap,
            detection.groups.len(),
            segments.len()
        );

        Ok(ChannelReport {
            channel,
            dominant_frequency_hz: spectrum.dominant_frequency(channel),
            threshold: detection.level,
            envelope_len: envelope.len(),
            mapping,
            groups: detection.groups,
            event_indices,
            segments,
            segment_features,
        })
    }
}
