//! Moving RMS Energy Indicator

use crate::envelope::EnvelopeSignal;
use serde::{Deserialize, Serialize};
use signal_model::SignalError;
use tracing::debug;

/// What to emit for positions without a full window behind them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgePolicy {
    /// Repeat the first full-window value, keeping the input length
    #[default]
    BackFill,
    /// Emit only positions with a full window
    ValidOnly,
}

/// Causal moving RMS with optional decimation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovingRms {
    /// Window length (samples)
    pub window: usize,
    /// Output stride (samples); 1 keeps every position
    #[serde(default = "default_step")]
    pub step: usize,
    #[serde(default)]
    pub edge: EdgePolicy,
}

fn default_step() -> usize {
    1
}

impl MovingRms {
    pub fn new(window: usize, step: usize) -> Self {
        Self {
            window,
            step,
            edge: EdgePolicy::default(),
        }
    }

    pub fn with_edge(mut self, edge: EdgePolicy) -> Self {
        self.edge = edge;
        self
    }

    fn validate(&self, len: usize) -> Result<(), SignalError> {
        if self.window == 0 || self.window > len || self.step == 0 {
            return Err(SignalError::InvalidWindow {
                window: self.window,
                step: self.step,
                len,
            });
        }
        Ok(())
    }

    /// Index of the first emitted full-length position
    fn first_position(&self) -> usize {
        match self.edge {
            EdgePolicy::BackFill => 0,
            EdgePolicy::ValidOnly => self.window - 1,
        }
    }

    /// Output length for an input of `len` samples
    pub fn output_len(&self, len: usize) -> Result<usize, SignalError> {
        self.validate(len)?;
        let span = len - self.first_position();
        Ok(span.div_ceil(self.step))
    }

    /// Full-length RMS before decimation, right-aligned windows
    ///
    /// Uses a running sum of squares so cost does not depend on the window.
    pub fn full_length(&self, samples: &[f64]) -> Result<Vec<f64>, SignalError> {
        self.validate(samples.len())?;
        let w = self.window;

        let mut prefix = Vec::with_capacity(samples.len() + 1);
        prefix.push(0.0);
        let mut acc = 0.0;
        for &x in samples {
            acc += x * x;
            prefix.push(acc);
        }

        let mut out = Vec::with_capacity(samples.len());
        let first_valid = ((prefix[w] - prefix[0]) / w as f64).max(0.0).sqrt();
        out.extend(std::iter::repeat(first_valid).take(w - 1));
        for p in (w - 1)..samples.len() {
            let energy = (prefix[p + 1] - prefix[p + 1 - w]) / w as f64;
            out.push(energy.max(0.0).sqrt());
        }
        Ok(out)
    }

    /// Moving RMS of a raw sequence, decimated by `step`
    pub fn apply(&self, samples: &[f64]) -> Result<EnvelopeSignal, SignalError> {
        self.smooth(&EnvelopeSignal::full_rate(samples.to_vec()))
    }

    /// Moving RMS of an existing envelope, composing the index geometry
    ///
    /// Each output value is mapped to the center of its window, expressed in
    /// the raw domain of `input`.
    pub fn smooth(&self, input: &EnvelopeSignal) -> Result<EnvelopeSignal, SignalError> {
        let full = self.full_length(input.values())?;
        let first = self.first_position();
        let values: Vec<f64> = full[first..].iter().step_by(self.step).copied().collect();

        let center_lag = ((self.window - 1) / 2) as i64;
        let in_step = input.step() as i64;
        let origin = input.origin() + (first as i64 - center_lag) * in_step;
        let window = input.window() + (self.window - 1) * input.step();
        let step = self.step * input.step();

        debug!(
            "Moving RMS: window={}, step={}, {} -> {} values",
            self.window,
            self.step,
            input.len(),
            values.len()
        );

        Ok(EnvelopeSignal::with_geometry(values, input.source_len(), window, step, origin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_constant_input() {
        let rms = MovingRms::new(5, 1).full_length(&[2.5; 20]).unwrap();
        assert_eq!(rms.len(), 20);
        assert!(rms.iter().all(|v| (v - 2.5).abs() < 1e-12));
    }

    #[test]
    fn test_back_fill_and_values() {
        let x = [3.0, 4.0, 0.0, 0.0, 5.0];
        let rms = MovingRms::new(2, 1).full_length(&x).unwrap();
        let expected = [
            (12.5f64).sqrt(),
            (12.5f64).sqrt(),
            (8.0f64).sqrt(),
            0.0,
            (12.5f64).sqrt(),
        ];
        for (a, b) in rms.iter().zip(expected) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_decimation_reindexes() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let op = MovingRms::new(3, 4);
        let full = op.full_length(&x).unwrap();
        let env = op.apply(&x).unwrap();

        assert_eq!(env.values(), &[full[0], full[4], full[8]]);
        assert_eq!(op.output_len(10).unwrap(), 3);
        assert_eq!(env.step(), 4);
        assert_eq!(env.window(), 3);
        // Window ending at position 4 is centered on raw sample 3
        assert_eq!(env.raw_index(1), 3);
    }

    #[test]
    fn test_valid_only_length() {
        let x = vec![1.0; 100];
        let op = MovingRms::new(10, 7).with_edge(EdgePolicy::ValidOnly);
        let env = op.apply(&x).unwrap();

        // ceil((100 - 10 + 1) / 7)
        assert_eq!(env.len(), 13);
        assert_eq!(op.output_len(100).unwrap(), 13);
        // First full window covers 0..=9, center 5 after integer halving
        assert_eq!(env.origin(), 5);
    }

    #[test]
    fn test_smooth_composes_geometry() {
        let base = MovingRms::new(5, 2).apply(&[1.0; 40]).unwrap();
        let twice = MovingRms::new(3, 3).smooth(&base).unwrap();

        assert_eq!(twice.step(), 6);
        assert_eq!(twice.window(), 5 + 2 * 2);
        assert_eq!(twice.source_len(), 40);
        assert_eq!(twice.origin(), base.origin() - 2);
    }

    #[test]
    fn test_invalid_window() {
        let x = [1.0; 8];
        assert!(matches!(
            MovingRms::new(0, 1).apply(&x),
            Err(SignalError::InvalidWindow { .. })
        ));
        assert!(MovingRms::new(9, 1).apply(&x).is_err());
        assert!(MovingRms::new(8, 0).apply(&x).is_err());
        assert!(MovingRms::new(8, 1).apply(&x).is_ok());
    }

    proptest! {
        #[test]
        fn prop_length_matches_input(
            x in prop::collection::vec(-100.0f64..100.0, 1..200),
            window_frac in 0.0f64..1.0,
        ) {
            let window = 1 + ((x.len() - 1) as f64 * window_frac) as usize;
            let rms = MovingRms::new(window, 1).full_length(&x).unwrap();
            prop_assert_eq!(rms.len(), x.len());
            prop_assert!(rms.iter().all(|v| *v >= 0.0));
        }
    }
}
