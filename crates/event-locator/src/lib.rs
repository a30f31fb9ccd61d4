//! Event Localization
//!
//! Turns an energy envelope into event positions and cuts raw-signal
//! segments around them:
//! - peaks: thresholded local maxima, clustered by gap, one index per event
//! - mapping: envelope index to raw sample index
//! - segments: fixed-duration raw windows, truncated at the buffer edges

mod mapping;
mod peaks;
mod segments;

pub use mapping::IndexMapping;
pub use peaks::{local_maxima, PeakClusterer, PeakDetection, PeakGroup, Threshold, DEFAULT_MAX_GAP};
pub use segments::{Alignment, Segment, SegmentExtractor};
