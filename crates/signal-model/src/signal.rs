//! Multi-Channel Signal Buffer

use crate::error::SignalError;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::Serialize;

/// Equally sampled multi-channel buffer, shape `[samples, channels]`
///
/// Validated once on construction and never mutated afterwards; stages
/// borrow it and return new buffers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiChannelSignal {
    /// Sample matrix, one row per time step
    samples: Array2<f64>,
    /// Sampling rate (Hz)
    sampling_rate_hz: f64,
}

impl MultiChannelSignal {
    /// Wrap a `[samples, channels]` matrix
    pub fn new(samples: Array2<f64>, sampling_rate_hz: f64) -> Result<Self, SignalError> {
        if !(sampling_rate_hz.is_finite() && sampling_rate_hz > 0.0) {
            return Err(SignalError::input(format!(
                "sampling rate must be positive, got {sampling_rate_hz}"
            )));
        }
        if samples.nrows() == 0 || samples.ncols() == 0 {
            return Err(SignalError::input(format!(
                "signal must have at least one sample and one channel, got shape {:?}",
                samples.dim()
            )));
        }
        if let Some(((row, col), v)) = samples.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(SignalError::input(format!(
                "non-finite sample {v} at row {row}, channel {col}"
            )));
        }

        Ok(Self {
            samples,
            sampling_rate_hz,
        })
    }

    /// Build from time-step rows, each holding one value per channel
    pub fn from_rows(rows: &[Vec<f64>], sampling_rate_hz: f64) -> Result<Self, SignalError> {
        let channels = rows.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = rows.iter().position(|r| r.len() != channels) {
            return Err(SignalError::input(format!(
                "row {bad} has {} values, expected {channels}",
                rows[bad].len()
            )));
        }

        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let samples = Array2::from_shape_vec((rows.len(), channels), flat)
            .map_err(|e| SignalError::input(e.to_string()))?;
        Self::new(samples, sampling_rate_hz)
    }

    /// Build from one vector per channel
    pub fn from_channels(channels: Vec<Vec<f64>>, sampling_rate_hz: f64) -> Result<Self, SignalError> {
        let len = channels.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = channels.iter().position(|c| c.len() != len) {
            return Err(SignalError::input(format!(
                "channel {bad} has {} samples, expected {len}",
                channels[bad].len()
            )));
        }

        let samples = Array2::from_shape_fn((len, channels.len()), |(i, c)| channels[c][i]);
        Self::new(samples, sampling_rate_hz)
    }

    /// Number of time steps
    pub fn sample_count(&self) -> usize {
        self.samples.nrows()
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.samples.ncols()
    }

    pub fn sampling_rate_hz(&self) -> f64 {
        self.sampling_rate_hz
    }

    pub fn nyquist_hz(&self) -> f64 {
        self.sampling_rate_hz / 2.0
    }

    /// Buffer duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.sample_count() as f64 / self.sampling_rate_hz
    }

    /// Full sample matrix
    pub fn samples(&self) -> ArrayView2<'_, f64> {
        self.samples.view()
    }

    /// Read-only view of one channel
    pub fn channel(&self, channel: usize) -> Result<ArrayView1<'_, f64>, SignalError> {
        if channel >= self.channel_count() {
            return Err(SignalError::input(format!(
                "channel {channel} out of range, signal has {} channels",
                self.channel_count()
            )));
        }
        Ok(self.samples.index_axis(Axis(1), channel))
    }

    /// Owned copy of one channel
    pub fn channel_to_vec(&self, channel: usize) -> Result<Vec<f64>, SignalError> {
        Ok(self.channel(channel)?.to_vec())
    }

    /// Iterate over all channels in order
    pub fn channels(&self) -> impl Iterator<Item = ArrayView1<'_, f64>> {
        self.samples.axis_iter(Axis(1))
    }
}
