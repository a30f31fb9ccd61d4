//! FFT-based Frequency Analysis

use rustfft::{num_complex::Complex, FftPlanner};
use serde::Serialize;
use signal_model::{MultiChannelSignal, SignalError};
use tracing::debug;

/// One-sided magnitude spectrum of every channel
#[derive(Debug, Clone, Serialize)]
pub struct SpectralResult {
    /// Bin frequencies (Hz), ascending from 0, Nyquist excluded
    pub frequencies: Vec<f64>,
    /// Per-channel magnitudes, normalized by the sample count
    pub magnitudes: Vec<Vec<f64>>,
}

impl SpectralResult {
    /// Number of one-sided bins
    pub fn bin_count(&self) -> usize {
        self.frequencies.len()
    }

    /// Spacing between adjacent bins (Hz)
    pub fn bin_width_hz(&self) -> f64 {
        match self.frequencies.get(1) {
            Some(f) => *f,
            None => 0.0,
        }
    }

    /// Index of the bin closest to `frequency_hz`
    pub fn nearest_bin(&self, frequency_hz: f64) -> usize {
        let width = self.bin_width_hz();
        if width <= 0.0 {
            return 0;
        }
        let bin = (frequency_hz / width).round().max(0.0) as usize;
        bin.min(self.bin_count().saturating_sub(1))
    }

    /// Frequency of the strongest non-DC bin of a channel
    pub fn dominant_frequency(&self, channel: usize) -> Option<f64> {
        let magnitudes = self.magnitudes.get(channel)?;
        let (bin, _) = magnitudes
            .iter()
            .enumerate()
            .skip(1)
            .fold(None, |best: Option<(usize, f64)>, (i, &m)| match best {
                Some((_, bm)) if bm >= m => best,
                _ => Some((i, m)),
            })?;
        Some(self.frequencies[bin])
    }

    /// Summed magnitude of a channel over `[low_hz, high_hz)`
    pub fn band_magnitude(&self, channel: usize, low_hz: f64, high_hz: f64) -> Option<f64> {
        let magnitudes = self.magnitudes.get(channel)?;
        Some(
            self.frequencies
                .iter()
                .zip(magnitudes)
                .filter(|(f, _)| **f >= low_hz && **f < high_hz)
                .map(|(_, m)| m)
                .sum(),
        )
    }
}

/// FFT analyzer producing one-sided magnitude spectra
pub struct SpectralAnalyzer {
    /// FFT planner, caches plans across calls of the same length
    planner: FftPlanner<f64>,
}

impl SpectralAnalyzer {
    /// Create a new analyzer
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// Compute the spectrum of every channel of `signal`
    pub fn analyze(&mut self, signal: &MultiChannelSignal) -> Result<SpectralResult, SignalError> {
        let n = signal.sample_count();
        if n < 2 {
            return Err(SignalError::InvalidInput(format!(
                "spectrum needs at least 2 samples, got {n}"
            )));
        }

        let bins = n / 2;
        let fft = self.planner.plan_fft_forward(n);

        let magnitudes: Vec<Vec<f64>> = signal
            .channels()
            .map(|channel| {
                let mut buffer: Vec<Complex<f64>> =
                    channel.iter().map(|&v| Complex::new(v, 0.0)).collect();
                fft.process(&mut buffer);
                buffer
                    .iter()
                    .take(bins)
                    .map(|c| c.norm() / n as f64)
                    .collect()
            })
            .collect();

        // linspace(0, fs/2, bins) with the endpoint left out
        let spacing = signal.nyquist_hz() / bins as f64;
        let frequencies = (0..bins).map(|k| k as f64 * spacing).collect();

        debug!(
            "Spectrum computed: {} channels, {} bins, {:.4} Hz/bin",
            signal.channel_count(),
            bins,
            spacing
        );

        Ok(SpectralResult {
            frequencies,
            magnitudes,
        })
    }
}

impl Default for SpectralAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
