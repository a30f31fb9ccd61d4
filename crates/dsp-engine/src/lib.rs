//! DSP Engine
//!
//! Spectrum, zero-phase Butterworth filtering, moving RMS and Hilbert
//! envelopes for equally sampled vibration channels. Every operation borrows
//! its input and returns new data.

mod envelope;
mod filter;
mod rms;
mod spectrum;
mod statistics;

pub use envelope::{EnvelopeSignal, HilbertEnvelope};
pub use filter::{ButterworthFilter, Cutoff, FilterKind, FilterSpec, DEFAULT_ORDER};
pub use rms::{EdgePolicy, MovingRms};
pub use spectrum::{SpectralAnalyzer, SpectralResult};
pub use statistics::StatisticalFeatures;
