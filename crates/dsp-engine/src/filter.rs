//! Zero-Phase Butterworth Filtering
//!
//! A [`FilterSpec`] describes the band in raw Hz; [`ButterworthFilter`]
//! validates it, designs the second-order-section cascade and applies it
//! forward then backward so the output carries no net delay.

use ndarray::{Array2, ArrayView1, Axis};
use rustfft::num_complex::Complex;
use sci_rs::signal::filter::design::{butter_dyn, DigitalFilter, FilterBandType, FilterOutputType, Sos};
use sci_rs::signal::filter::{sosfilt_dyn, sosfiltfilt_dyn};
use serde::{Deserialize, Serialize};
use signal_model::{MultiChannelSignal, SignalError};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Prototype order when none is configured
pub const DEFAULT_ORDER: usize = 3;

/// Filter response type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum FilterKind {
    Lowpass,
    Highpass,
    Bandpass,
    Bandstop,
}

impl FilterKind {
    fn is_band(self) -> bool {
        matches!(self, Self::Bandpass | Self::Bandstop)
    }

    fn band_type(self) -> FilterBandType {
        match self {
            Self::Lowpass => FilterBandType::Lowpass,
            Self::Highpass => FilterBandType::Highpass,
            Self::Bandpass => FilterBandType::Bandpass,
            Self::Bandstop => FilterBandType::Bandstop,
        }
    }
}

impl FromStr for FilterKind {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lowpass" | "low" => Ok(Self::Lowpass),
            "highpass" | "high" => Ok(Self::Highpass),
            "bandpass" | "band" => Ok(Self::Bandpass),
            "bandstop" | "stop" => Ok(Self::Bandstop),
            other => Err(SignalError::InvalidFilterSpec(format!(
                "unrecognized filter kind '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for FilterKind {
    type Error = SignalError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lowpass => "lowpass",
            Self::Highpass => "highpass",
            Self::Bandpass => "bandpass",
            Self::Bandstop => "bandstop",
        };
        f.write_str(name)
    }
}

/// Cutoff frequencies in Hz
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cutoff {
    /// Lowpass / highpass corner
    Single(f64),
    /// Band edges (low, high)
    Band(f64, f64),
}

/// Filter description in raw Hz
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub kind: FilterKind,
    pub cutoff: Cutoff,
    /// Prototype order; band kinds end up with twice as many poles
    #[serde(default = "default_order")]
    pub order: usize,
    pub sampling_rate_hz: f64,
}

fn default_order() -> usize {
    DEFAULT_ORDER
}

impl FilterSpec {
    pub fn lowpass(cutoff_hz: f64, sampling_rate_hz: f64) -> Self {
        Self::new(FilterKind::Lowpass, Cutoff::Single(cutoff_hz), sampling_rate_hz)
    }

    pub fn highpass(cutoff_hz: f64, sampling_rate_hz: f64) -> Self {
        Self::new(FilterKind::Highpass, Cutoff::Single(cutoff_hz), sampling_rate_hz)
    }

    pub fn bandpass(low_hz: f64, high_hz: f64, sampling_rate_hz: f64) -> Self {
        Self::new(FilterKind::Bandpass, Cutoff::Band(low_hz, high_hz), sampling_rate_hz)
    }

    pub fn bandstop(low_hz: f64, high_hz: f64, sampling_rate_hz: f64) -> Self {
        Self::new(FilterKind::Bandstop, Cutoff::Band(low_hz, high_hz), sampling_rate_hz)
    }

    fn new(kind: FilterKind, cutoff: Cutoff, sampling_rate_hz: f64) -> Self {
        Self {
            kind,
            cutoff,
            order: DEFAULT_ORDER,
            sampling_rate_hz,
        }
    }

    /// Override the prototype order
    pub fn with_order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    /// Critical frequencies as `2 * f / fs` (1.0 = Nyquist), validated
    pub fn normalized(&self) -> Result<Vec<f64>, SignalError> {
        let invalid = |msg: String| Err(SignalError::InvalidFilterSpec(msg));

        if !(self.sampling_rate_hz.is_finite() && self.sampling_rate_hz > 0.0) {
            return invalid(format!("sampling rate must be positive, got {}", self.sampling_rate_hz));
        }
        if self.order == 0 {
            return invalid("order must be at least 1".to_string());
        }

        let edges = match (self.kind.is_band(), self.cutoff) {
            (false, Cutoff::Single(f)) => vec![f],
            (true, Cutoff::Band(low, high)) => {
                if !(low < high) {
                    return invalid(format!("band edges must satisfy low < high, got ({low}, {high})"));
                }
                vec![low, high]
            }
            (_, cutoff) => {
                return invalid(format!("{} filter cannot use cutoff {cutoff:?}", self.kind));
            }
        };

        let mut normalized = Vec::with_capacity(edges.len());
        for f in edges {
            let w = 2.0 * f / self.sampling_rate_hz;
            if !(w.is_finite() && w > 0.0) {
                return invalid(format!("cutoff {f} Hz must be positive"));
            }
            if w >= 1.0 {
                return invalid(format!(
                    "cutoff {f} Hz is at or above Nyquist ({} Hz)",
                    self.sampling_rate_hz / 2.0
                ));
            }
            normalized.push(w);
        }
        Ok(normalized)
    }
}


/// Designed Butterworth cascade bound to one sampling rate
#[derive(Debug, Clone)]
pub struct ButterworthFilter {
    spec: FilterSpec,
    sections: Vec<Sos<f64>>,
}

impl ButterworthFilter {
    /// Validate `spec` and design the filter
    pub fn new(spec: FilterSpec) -> Result<Self, SignalError> {
        let normalized = spec.normalized()?;
        let design = butter_dyn(
            spec.order,
            normalized.clone(),
            Some(spec.kind.band_type()),
            Some(false),
            Some(FilterOutputType::Sos),
            None,
        );
        let sections = match design {
            DigitalFilter::Sos(filter) => filter.sos,
            _ => {
                return Err(SignalError::InvalidFilterSpec(format!(
                    "{} design did not produce second-order sections",
                    spec.kind
                )))
            }
        };

        debug!(
            "Designed {} order-{} Butterworth at {:?} (normalized {:?}), {} sections",
            spec.kind,
            spec.order,
            spec.cutoff,
            normalized,
            sections.len()
        );

        Ok(Self { spec, sections })
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    /// Second-order sections, overall gain folded into the first
    pub fn sections(&self) -> &[Sos<f64>] {
        &self.sections
    }

    /// Fewest samples the forward-backward pass accepts
    ///
    /// Both ends are padded by `3 * (2 * sections + 1)` odd-reflected
    /// samples, which must come from inside the input.
    pub fn min_len(&self) -> usize {
        3 * (2 * self.sections.len() + 1) + 1
    }

    /// Magnitude response at `frequency_hz`
    pub fn frequency_response(&self, frequency_hz: f64) -> f64 {
        let omega = 2.0 * std::f64::consts::PI * frequency_hz / self.spec.sampling_rate_hz;
        let z1 = Complex::from_polar(1.0, -omega);
        let z2 = z1 * z1;
        self.sections
            .iter()
            .map(|s| (s.b[0] + z1 * s.b[1] + z2 * s.b[2]) / (s.a[0] + z1 * s.a[1] + z2 * s.a[2]))
            .fold(Complex::new(1.0, 0.0), |acc, h| acc * h)
            .norm()
    }

    /// Single causal pass from rest; output lags the input
    pub fn filter_causal(&self, samples: &[f64]) -> Vec<f64> {
        let mut sections = self.sections.clone();
        sosfilt_dyn(samples.iter(), &mut sections)
    }

    /// Forward-backward pass with zero net phase
    pub fn filtfilt(&self, samples: &[f64]) -> Result<Vec<f64>, SignalError> {
        self.check_len(samples.len())?;
        Ok(sosfiltfilt_dyn(samples.iter(), &self.sections))
    }

    /// Forward-backward pass over a borrowed channel view
    pub fn filtfilt_view(&self, samples: ArrayView1<'_, f64>) -> Result<Vec<f64>, SignalError> {
        self.check_len(samples.len())?;
        Ok(sosfiltfilt_dyn(samples.iter(), &self.sections))
    }

    fn check_len(&self, len: usize) -> Result<(), SignalError> {
        if len < self.min_len() {
            return Err(SignalError::InvalidInput(format!(
                "zero-phase filtering needs at least {} samples, got {len}",
                self.min_len()
            )));
        }
        Ok(())
    }

    /// Zero-phase filter every channel of `signal`
    pub fn apply(&self, signal: &MultiChannelSignal) -> Result<MultiChannelSignal, SignalError> {
        let rate_mismatch = (signal.sampling_rate_hz() - self.spec.sampling_rate_hz).abs();
        if rate_mismatch > f64::EPSILON * self.spec.sampling_rate_hz {
            return Err(SignalError::InvalidFilterSpec(format!(
                "filter designed for {} Hz applied to a {} Hz signal",
                self.spec.sampling_rate_hz,
                signal.sampling_rate_hz()
            )));
        }

        let mut out = Array2::zeros(signal.samples().raw_dim());
        for (input, mut output) in signal.channels().zip(out.axis_iter_mut(Axis(1))) {
            let filtered = self.filtfilt_view(input)?;
            output.iter_mut().zip(filtered).for_each(|(o, v)| *o = v);
        }

        debug!(
            "Applied {} filter to {} channels x {} samples",
            self.spec.kind,
            signal.channel_count(),
            signal.sample_count()
        );

        MultiChannelSignal::new(out, signal.sampling_rate_hz())
    }
}
