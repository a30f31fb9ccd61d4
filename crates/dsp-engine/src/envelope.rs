//! Hilbert Envelope Extraction
//!
//! The analytic signal is built in the frequency domain: negative
//! frequencies are zeroed, positive ones doubled, DC (and Nyquist for even
//! lengths) kept. Its magnitude is the amplitude envelope.

use ndarray::ArrayView1;
use rustfft::{num_complex::Complex, FftPlanner};
use serde::Serialize;
use signal_model::{MultiChannelSignal, SignalError};
use tracing::debug;

/// Smoothed energy sequence for one channel, with its raw-domain geometry
///
/// Output index `i` summarizes raw samples centered on
/// `origin + i * step`; `window` is how many raw samples feed one value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvelopeSignal {
    values: Vec<f64>,
    /// Length of the raw sequence this was derived from
    source_len: usize,
    /// Raw samples contributing to one output value
    window: usize,
    /// Raw samples between consecutive output values
    step: usize,
    /// Raw index corresponding to output index 0 (may be negative)
    origin: i64,
}

impl EnvelopeSignal {
    /// Envelope sampled at the raw rate, one value per raw sample
    pub fn full_rate(values: Vec<f64>) -> Self {
        let source_len = values.len();
        Self {
            values,
            source_len,
            window: 1,
            step: 1,
            origin: 0,
        }
    }

    pub(crate) fn with_geometry(
        values: Vec<f64>,
        source_len: usize,
        window: usize,
        step: usize,
        origin: i64,
    ) -> Self {
        Self {
            values,
            source_len,
            window,
            step,
            origin,
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn source_len(&self) -> usize {
        self.source_len
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn origin(&self) -> i64 {
        self.origin
    }

    /// Raw sample index an output index stands for (unclamped)
    pub fn raw_index(&self, index: usize) -> i64 {
        self.origin + (index * self.step) as i64
    }
}

/// FFT-based analytic signal and envelope extractor
pub struct HilbertEnvelope {
    planner: FftPlanner<f64>,
}

impl HilbertEnvelope {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// Analytic signal `x + i*H[x]` of a real sequence of any length
    pub fn analytic_signal(&mut self, samples: &[f64]) -> Result<Vec<Complex<f64>>, SignalError> {
        self.analytic_view(ArrayView1::from(samples))
    }

    fn analytic_view(&mut self, samples: ArrayView1<'_, f64>) -> Result<Vec<Complex<f64>>, SignalError> {
        let n = samples.len();
        if n == 0 {
            return Err(SignalError::InvalidInput(
                "cannot build the analytic signal of an empty sequence".to_string(),
            ));
        }

        let mut buffer: Vec<Complex<f64>> = samples.iter().map(|&v| Complex::new(v, 0.0)).collect();
        self.planner.plan_fft_forward(n).process(&mut buffer);

        // Weights: 1 at DC, 2 over positive bins, 1 at Nyquist (even n), 0 above
        let positive_end = (n + 1) / 2;
        for (k, bin) in buffer.iter_mut().enumerate() {
            let weight = if k == 0 || (n % 2 == 0 && k == n / 2) {
                1.0
            } else if k < positive_end {
                2.0
            } else {
                0.0
            };
            *bin *= weight;
        }

        self.planner.plan_fft_inverse(n).process(&mut buffer);
        let scale = 1.0 / n as f64;
        for v in buffer.iter_mut() {
            *v *= scale;
        }
        Ok(buffer)
    }

    /// Amplitude envelope `|x + i*H[x]|`, same length as the input
    pub fn envelope(&mut self, samples: &[f64]) -> Result<EnvelopeSignal, SignalError> {
        self.envelope_view(ArrayView1::from(samples))
    }

    fn envelope_view(&mut self, samples: ArrayView1<'_, f64>) -> Result<EnvelopeSignal, SignalError> {
        let analytic = self.analytic_view(samples)?;
        Ok(EnvelopeSignal::full_rate(analytic.iter().map(|c| c.norm()).collect()))
    }

    /// Wrapped instantaneous phase in radians
    pub fn instantaneous_phase(&mut self, samples: &[f64]) -> Result<Vec<f64>, SignalError> {
        let analytic = self.analytic_signal(samples)?;
        Ok(analytic.iter().map(|c| c.arg()).collect())
    }

    /// Envelope of every channel of `signal`
    pub fn envelope_channels(&mut self, signal: &MultiChannelSignal) -> Result<Vec<EnvelopeSignal>, SignalError> {
        let envelopes = signal
            .channels()
            .map(|c| self.envelope_view(c))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "Hilbert envelope computed for {} channels x {} samples",
            signal.channel_count(),
            signal.sample_count()
        );
        Ok(envelopes)
    }
}

impl Default for HilbertEnvelope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f64::consts::PI;

    #[test]
    fn test_cosine_envelope_is_flat() {
        // Whole number of periods: H[cos] = sin exactly
        let n = 256;
        let x: Vec<f64> = (0..n).map(|i| 3.0 * (2.0 * PI * 8.0 * i as f64 / n as f64).cos()).collect();
        let mut hilbert = HilbertEnvelope::new();

        let analytic = hilbert.analytic_signal(&x).unwrap();
        for (i, c) in analytic.iter().enumerate() {
            let expected_im = 3.0 * (2.0 * PI * 8.0 * i as f64 / n as f64).sin();
            assert!((c.re - x[i]).abs() < 1e-9);
            assert!((c.im - expected_im).abs() < 1e-9);
        }

        let env = hilbert.envelope(&x).unwrap();
        assert_eq!(env.len(), n);
        assert!(env.values().iter().all(|v| (v - 3.0).abs() < 1e-9));
    }

    #[test]
    fn test_odd_length_keeps_real_part() {
        let x = [1.0, 2.0, 3.0, 2.0, 1.0, 0.0, -1.0];
        let analytic = HilbertEnvelope::new().analytic_signal(&x).unwrap();
        for (c, v) in analytic.iter().zip(x) {
            assert!((c.re - v).abs() < 1e-12);
        }
    }

    #[test]
    fn test_modulated_tone_envelope() {
        // 100 Hz carrier, 2 Hz amplitude modulation, 1 kHz rate
        let fs = 1000.0;
        let n = 2000;
        let am = |t: f64| 1.0 + 0.5 * (2.0 * PI * 2.0 * t).cos();
        let x: Vec<f64> = (0..n)
            .map(|i| {
                let t = i as f64 / fs;
                am(t) * (2.0 * PI * 100.0 * t).cos()
            })
            .collect();

        let env = HilbertEnvelope::new().envelope(&x).unwrap();
        for i in 100..1900 {
            let expected = am(i as f64 / fs);
            assert!((env.values()[i] - expected).abs() < 1e-6, "sample {i}");
        }
    }

    #[test]
    fn test_phase_of_cosine() {
        let n = 64;
        let x: Vec<f64> = (0..n).map(|i| (2.0 * PI * 4.0 * i as f64 / n as f64).cos()).collect();
        let phase = HilbertEnvelope::new().instantaneous_phase(&x).unwrap();
        assert!(phase[0].abs() < 1e-9);
        assert!((phase[2] - PI / 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_full_rate_geometry() {
        let env = HilbertEnvelope::new().envelope(&[1.0, -1.0, 1.0, -1.0]).unwrap();
        assert_eq!(env.window(), 1);
        assert_eq!(env.step(), 1);
        assert_eq!(env.source_len(), 4);
        assert_eq!(env.raw_index(3), 3);
    }

    #[test]
    fn test_multi_channel_envelopes() {
        let signal = MultiChannelSignal::from_channels(vec![vec![0.0; 32], vec![1.0; 32]], 100.0).unwrap();
        let envelopes = HilbertEnvelope::default().envelope_channels(&signal).unwrap();
        assert_eq!(envelopes.len(), 2);
        assert!(envelopes[0].values().iter().all(|v| v.abs() < 1e-12));
        assert!(envelopes[1].values().iter().all(|v| (v - 1.0).abs() < 1e-9));
    }

    #[test]
    fn test_strided_channel_matches_slice() {
        let a: Vec<f64> = (0..50).map(|i| (i as f64 * 0.3).sin()).collect();
        let b: Vec<f64> = (0..50).map(|i| (i as f64 * 0.7).cos()).collect();
        let signal = MultiChannelSignal::from_channels(vec![a, b.clone()], 100.0).unwrap();

        let mut hilbert = HilbertEnvelope::new();
        let envelopes = hilbert.envelope_channels(&signal).unwrap();
        let direct = hilbert.envelope(&b).unwrap();
        for (x, y) in envelopes[1].values().iter().zip(direct.values()) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(
            HilbertEnvelope::new().envelope(&[]),
            Err(SignalError::InvalidInput(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_envelope_non_negative(x in prop::collection::vec(-1.0e6f64..1.0e6, 1..300)) {
            let env = HilbertEnvelope::new().envelope(&x).unwrap();
            prop_assert_eq!(env.len(), x.len());
            prop_assert!(env.values().iter().all(|v| *v >= 0.0));
        }
    }
}
