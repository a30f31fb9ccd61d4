//! Statistical Features Computation

use serde::Serialize;

/// Amplitude statistics for a signal or envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatisticalFeatures {
    /// Mean value
    pub mean: f64,
    /// Standard deviation
    pub std_dev: f64,
    /// Root mean square
    pub rms: f64,
    /// Largest absolute value
    pub peak: f64,
    /// Peak over RMS; impulsive faults push this up
    pub crest_factor: f64,
    /// Skewness (asymmetry)
    pub skewness: f64,
    /// Kurtosis (tailedness)
    pub kurtosis: f64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
}

impl StatisticalFeatures {
    /// Compute statistical features from a slice of values
    pub fn compute(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;

        // Mean
        let mean = values.iter().sum::<f64>() / n;

        // Min/Max
        let min = values.iter().cloned().fold(f64::MAX, f64::min);
        let max = values.iter().cloned().fold(f64::MIN, f64::max);
        let peak = min.abs().max(max.abs());

        // Variance and higher moments
        let mut m2 = 0.0;
        let mut m3 = 0.0;
        let mut m4 = 0.0;
        let mut sum_sq = 0.0;

        for &v in values {
            let d = v - mean;
            m2 += d * d;
            m3 += d * d * d;
            m4 += d * d * d * d;
            sum_sq += v * v;
        }

        let variance = m2 / n;
        let std_dev = variance.sqrt();
        let rms = (sum_sq / n).sqrt();

        // Skewness: E[(X-μ)³] / σ³
        let skewness = if std_dev > 0.0 {
            (m3 / n) / (std_dev * std_dev * std_dev)
        } else {
            0.0
        };

        // Kurtosis: E[(X-μ)⁴] / σ⁴ - 3 (excess kurtosis)
        let kurtosis = if std_dev > 0.0 {
            (m4 / n) / (variance * variance) - 3.0
        } else {
            0.0
        };

        let crest_factor = if rms > 0.0 { peak / rms } else { 0.0 };

        Self {
            mean,
            std_dev,
            rms,
            peak,
            crest_factor,
            skewness,
            kurtosis,
            min,
            max,
        }
    }
}
