//! Envelope-to-Raw Index Mapping

use dsp_engine::EnvelopeSignal;
use serde::{Deserialize, Serialize};

/// Affine map from envelope indices to raw sample indices
///
/// `raw = origin + index * step + alignment_offset`. `origin` and `step`
/// come from the envelope's own window geometry; `alignment_offset` is an
/// extra caller-chosen shift in raw samples, e.g. 10000 to compensate for
/// a detector's group width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMapping {
    pub origin: i64,
    pub step: usize,
    #[serde(default)]
    pub alignment_offset: i64,
}

impl IndexMapping {
    /// Envelope at the raw rate with no shift
    pub fn identity() -> Self {
        Self {
            origin: 0,
            step: 1,
            alignment_offset: 0,
        }
    }

    /// Mapping derived from how `envelope` was produced
    pub fn from_envelope(envelope: &EnvelopeSignal) -> Self {
        Self {
            origin: envelope.origin(),
            step: envelope.step(),
            alignment_offset: 0,
        }
    }

    pub fn with_alignment_offset(mut self, offset: i64) -> Self {
        self.alignment_offset = offset;
        self
    }

    /// Raw sample index for an envelope index, unclamped
    pub fn to_raw(&self, index: usize) -> i64 {
        self.origin + (index * self.step) as i64 + self.alignment_offset
    }
}

impl Default for IndexMapping {
    fn default() -> Self {
        Self::identity()
    }
}
