//! Raw Segment Extraction Around Events

use crate::mapping::IndexMapping;
use serde::{Deserialize, Serialize};
use signal_model::{MultiChannelSignal, SignalError};
use tracing::{debug, warn};

/// Placement of the window relative to the mapped index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// Window starts at the mapped index
    #[default]
    Start,
    /// Window is centered on the mapped index
    Center,
}

/// Raw samples of one channel around one event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub channel: usize,
    /// Mapped raw index of the event; may lie outside the buffer when the
    /// window was truncated
    ///
    /// The window starts here under [`Alignment::Start`] and is centered
    /// here under [`Alignment::Center`].
    pub event_index: i64,
    /// Raw index of `samples[0]`
    pub start: usize,
    pub samples: Vec<f64>,
    /// Window length that was asked for
    pub requested_len: usize,
    /// True when the window was cut at a buffer edge
    pub partial: bool,
}

impl Segment {
    /// Actual window length
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// One past the last raw index covered
    pub fn end(&self) -> usize {
        self.start + self.samples.len()
    }
}

/// Fixed-duration window extractor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentExtractor {
    /// Window duration (seconds)
    pub duration_secs: f64,
    #[serde(default)]
    pub alignment: Alignment,
    /// Fail instead of truncating when a window leaves the buffer
    #[serde(default)]
    pub strict: bool,
}

impl SegmentExtractor {
    pub fn new(duration_secs: f64) -> Self {
        Self {
            duration_secs,
            alignment: Alignment::default(),
            strict: false,
        }
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Window length in samples at `sampling_rate_hz`
    pub fn window_len(&self, sampling_rate_hz: f64) -> Result<usize, SignalError> {
        let len = (self.duration_secs * sampling_rate_hz).round();
        if !(len.is_finite() && len >= 1.0) {
            return Err(SignalError::InvalidInput(format!(
                "segment duration {} s gives no samples at {} Hz",
                self.duration_secs, sampling_rate_hz
            )));
        }
        Ok(len as usize)
    }

    /// Cut windows around envelope-domain `indices` mapped through `mapping`
    pub fn extract(
        &self,
        signal: &MultiChannelSignal,
        channel: usize,
        indices: &[usize],
        mapping: &IndexMapping,
    ) -> Result<Vec<Segment>, SignalError> {
        let raw: Vec<i64> = indices.iter().map(|&i| mapping.to_raw(i)).collect();
        self.extract_raw(signal, channel, &raw)
    }

    /// Cut windows around raw-domain indices
    pub fn extract_raw(
        &self,
        signal: &MultiChannelSignal,
        channel: usize,
        raw_indices: &[i64],
    ) -> Result<Vec<Segment>, SignalError> {
        let samples = signal.channel(channel)?;
        let n = signal.sample_count();
        let requested_len = self.window_len(signal.sampling_rate_hz())?;

        let mut segments = Vec::with_capacity(raw_indices.len());
        for &index in raw_indices {
            if self.strict && !(0..n as i64).contains(&index) {
                return Err(SignalError::IndexMapping { index, len: n });
            }

            let start = match self.alignment {
                Alignment::Start => index,
                Alignment::Center => index - (requested_len / 2) as i64,
            };
            let end = start + requested_len as i64;
            let clipped_start = start.clamp(0, n as i64) as usize;
            let clipped_end = end.clamp(0, n as i64) as usize;
            let partial = clipped_end - clipped_start < requested_len;

            if partial && self.strict {
                return Err(SignalError::IndexMapping { index, len: n });
            }
            if clipped_start == clipped_end {
                warn!(
                    "Dropping event at raw index {} on channel {}: window [{}, {}) misses buffer of {} samples",
                    index, channel, start, end, n
                );
                continue;
            }
            if partial {
                debug!(
                    "Truncated segment at raw index {}: {} of {} samples",
                    index,
                    clipped_end - clipped_start,
                    requested_len
                );
            }

            segments.push(Segment {
                channel,
                event_index: index,
                start: clipped_start,
                samples: samples.slice(ndarray::s![clipped_start..clipped_end]).to_vec(),
                requested_len,
                partial,
            });
        }

        Ok(segments)
    }
}
