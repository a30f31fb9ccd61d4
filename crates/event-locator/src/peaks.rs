//! Thresholded Peak Detection and Gap Clustering

use dsp_engine::{EnvelopeSignal, StatisticalFeatures};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default largest gap (raw samples) between peaks of one event
pub const DEFAULT_MAX_GAP: usize = 10_000;

/// How the detection level is chosen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum Threshold {
    /// Fixed envelope level
    Absolute(f64),
    /// Envelope mean plus this many standard deviations
    StdDevsAboveMean(f64),
}

impl Threshold {
    /// Concrete level for a given envelope
    pub fn resolve(&self, envelope: &[f64]) -> f64 {
        match *self {
            Self::Absolute(level) => level,
            Self::StdDevsAboveMean(k) => {
                let stats = StatisticalFeatures::compute(envelope);
                stats.mean + k * stats.std_dev
            }
        }
    }
}

/// Cluster of nearby peak indices belonging to one event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakGroup {
    /// Peak indices in ascending order
    pub members: Vec<usize>,
    /// Median member, see [`PeakClusterer::median_index`]
    pub representative: usize,
    /// Largest envelope value among the members
    pub peak_value: f64,
}

impl PeakGroup {
    pub fn first(&self) -> usize {
        self.members[0]
    }

    pub fn last(&self) -> usize {
        self.members[self.members.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Indices of local maxima strictly above `threshold`
///
/// Endpoints are never peaks. A sample is a peak when it rises above its
/// left neighbour and the first different sample to its right is lower, so a
/// flat top reports its leftmost sample.
pub fn local_maxima(envelope: &[f64], threshold: f64) -> Vec<usize> {
    let n = envelope.len();
    let mut peaks = Vec::new();

    let mut i = 1;
    while i + 1 < n {
        if envelope[i] <= envelope[i - 1] {
            i += 1;
            continue;
        }

        let mut j = i + 1;
        while j < n && envelope[j] == envelope[i] {
            j += 1;
        }
        if j < n && envelope[j] < envelope[i] && envelope[i] > threshold {
            peaks.push(i);
        }
        i = j;
    }

    peaks
}

/// Outcome of peak detection on one envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakDetection {
    /// Resolved detection level
    pub level: f64,
    /// Clustering gap in envelope samples
    pub max_gap: usize,
    pub groups: Vec<PeakGroup>,
}

impl PeakDetection {
    pub fn representatives(&self) -> Vec<usize> {
        self.groups.iter().map(|g| g.representative).collect()
    }
}

/// Peak detector that reduces each burst to one representative index
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakClusterer {
    pub threshold: Threshold,
    /// Largest gap between consecutive peaks of one group, in raw samples
    ///
    /// Decimated envelopes see `max_gap / step` envelope samples.
    #[serde(default = "default_max_gap")]
    pub max_gap: usize,
}

fn default_max_gap() -> usize {
    DEFAULT_MAX_GAP
}

impl PeakClusterer {
    pub fn new(threshold: Threshold, max_gap: usize) -> Self {
        Self { threshold, max_gap }
    }

    /// Split ascending indices wherever consecutive ones are more than `max_gap` apart
    pub fn cluster(indices: &[usize], max_gap: usize) -> Vec<Vec<usize>> {
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for &idx in indices {
            if let Some(group) = groups.last_mut() {
                if idx.saturating_sub(group[group.len() - 1]) <= max_gap {
                    group.push(idx);
                    continue;
                }
            }
            groups.push(vec![idx]);
        }
        groups
    }

    /// Median of an ascending, non-empty group
    ///
    /// Odd sizes take the middle member; even sizes take the floor of the
    /// mean of the two middle members.
    pub fn median_index(group: &[usize]) -> usize {
        let mid = group.len() / 2;
        if group.len() % 2 == 1 {
            group[mid]
        } else {
            (group[mid - 1] + group[mid]) / 2
        }
    }

    /// Envelope-domain gap for an envelope decimated by `step`
    pub fn gap_for_step(&self, step: usize) -> usize {
        self.max_gap / step.max(1)
    }

    /// Detect and cluster peaks of a raw-rate envelope
    pub fn groups(&self, envelope: &[f64]) -> Vec<PeakGroup> {
        let level = self.threshold.resolve(envelope);
        Self::groups_at(envelope, level, self.max_gap)
    }

    /// Detect peaks above an already resolved `level` and cluster them with
    /// an envelope-domain `max_gap`
    pub fn groups_at(envelope: &[f64], level: f64, max_gap: usize) -> Vec<PeakGroup> {
        let candidates = local_maxima(envelope, level);

        let groups: Vec<PeakGroup> = Self::cluster(&candidates, max_gap)
            .into_iter()
            .map(|members| {
                let peak_value = members
                    .iter()
                    .map(|&i| envelope[i])
                    .fold(f64::MIN, f64::max);
                PeakGroup {
                    representative: Self::median_index(&members),
                    members,
                    peak_value,
                }
            })
            .collect();

        debug!(
            "Peak clustering: level={:.6}, {} candidates, {} groups (max_gap={})",
            level,
            candidates.len(),
            groups.len(),
            max_gap
        );
        groups
    }

    /// Detect and cluster peaks of an envelope with raw-domain geometry
    ///
    /// The threshold is resolved once and the raw gap is scaled by the
    /// envelope step.
    pub fn locate(&self, envelope: &EnvelopeSignal) -> PeakDetection {
        let values = envelope.values();
        let level = self.threshold.resolve(values);
        let max_gap = self.gap_for_step(envelope.step());
        PeakDetection {
            level,
            max_gap,
            groups: Self::groups_at(values, level, max_gap),
        }
    }

    /// One representative index per event, strictly increasing
    pub fn detect(&self, envelope: &[f64]) -> Vec<usize> {
        self.groups(envelope).iter().map(|g| g.representative).collect()
    }
}

impl Default for PeakClusterer {
    fn default() -> Self {
        Self::new(Threshold::StdDevsAboveMean(3.0), DEFAULT_MAX_GAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Envelope with single-sample spikes at the given positions
    fn spikes(len: usize, at: &[usize], height: f64) -> Vec<f64> {
        let mut env = vec![0.0; len];
        for &i in at {
            env[i] = height;
        }
        env
    }

    #[test]
    fn test_two_groups_from_four_peaks() {
        let env = spikes(6000, &[100, 105, 110, 5000], 1.0);
        let clusterer = PeakClusterer::new(Threshold::Absolute(0.5), 50);

        let groups = clusterer.groups(&env);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].members, vec![100, 105, 110]);
        assert_eq!(groups[1].members, vec![5000]);
        assert_eq!(clusterer.detect(&env), vec![105, 5000]);
    }

    #[test]
    fn test_gap_boundary_is_inclusive() {
        assert_eq!(PeakClusterer::cluster(&[0, 50, 101], 50), vec![vec![0, 50], vec![101]]);
        assert_eq!(PeakClusterer::cluster(&[], 50), Vec::<Vec<usize>>::new());
    }

    #[test]
    fn test_median_rounding() {
        assert_eq!(PeakClusterer::median_index(&[7]), 7);
        assert_eq!(PeakClusterer::median_index(&[100, 105, 110]), 105);
        assert_eq!(PeakClusterer::median_index(&[100, 105]), 102);
        assert_eq!(PeakClusterer::median_index(&[100, 106]), 103);
        assert_eq!(PeakClusterer::median_index(&[1, 2, 10, 11]), 6);
    }

    #[test]
    fn test_plateau_leftmost_wins() {
        let env = [0.0, 1.0, 3.0, 3.0, 3.0, 1.0, 0.0];
        assert_eq!(local_maxima(&env, 0.0), vec![2]);

        // Rising into a higher step is not a peak
        let env = [0.0, 2.0, 2.0, 4.0, 1.0];
        assert_eq!(local_maxima(&env, 0.0), vec![3]);
    }

    #[test]
    fn test_endpoints_and_trailing_plateau() {
        assert!(local_maxima(&[5.0, 1.0, 0.0], 0.0).is_empty());
        assert!(local_maxima(&[0.0, 1.0, 5.0], 0.0).is_empty());
        assert!(local_maxima(&[0.0, 2.0, 2.0], 0.0).is_empty());
        assert!(local_maxima(&[1.0], 0.0).is_empty());
    }

    #[test]
    fn test_threshold_is_strict() {
        let env = [0.0, 1.0, 0.0, 2.0, 0.0];
        assert_eq!(local_maxima(&env, 1.0), vec![3]);
        assert_eq!(local_maxima(&env, 0.999), vec![1, 3]);
    }

    #[test]
    fn test_nothing_above_threshold() {
        let env = spikes(100, &[10, 50], 1.0);
        let clusterer = PeakClusterer::new(Threshold::Absolute(2.0), 5);
        assert!(clusterer.detect(&env).is_empty());
    }

    #[test]
    fn test_std_dev_threshold() {
        let mut env = vec![1.0; 1000];
        for (i, v) in env.iter_mut().enumerate() {
            *v += 0.01 * ((i % 7) as f64 - 3.0);
        }
        env[400] = 10.0;

        let clusterer = PeakClusterer::new(Threshold::StdDevsAboveMean(5.0), 10);
        let level = clusterer.threshold.resolve(&env);
        assert!(level > 1.05 && level < 10.0);
        assert_eq!(clusterer.detect(&env), vec![400]);
    }

    #[test]
    fn test_peak_value_recorded() {
        let mut env = spikes(300, &[10, 20], 1.0);
        env[20] = 4.0;
        let groups = PeakClusterer::new(Threshold::Absolute(0.5), 100).groups(&env);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].peak_value, 4.0);
        assert_eq!((groups[0].first(), groups[0].last()), (10, 20));
    }

    #[test]
    fn test_gap_scales_with_envelope_step() {
        let clusterer = PeakClusterer::default();
        assert_eq!(clusterer.gap_for_step(1), DEFAULT_MAX_GAP);
        assert_eq!(clusterer.gap_for_step(10), 1_000);
        assert_eq!(clusterer.gap_for_step(0), DEFAULT_MAX_GAP);
        assert_eq!(PeakClusterer::new(Threshold::Absolute(1.0), 95).gap_for_step(10), 9);
    }

    #[test]
    fn test_locate_measures_gap_in_raw_samples() {
        // Two unit bursts 3000 raw samples apart
        let mut raw = vec![0.0; 20_000];
        for i in (1_000..1_100).chain(4_000..4_100) {
            raw[i] = 1.0;
        }
        let envelope = dsp_engine::MovingRms::new(100, 10).apply(&raw).unwrap();
        assert_eq!(envelope.step(), 10);

        let merged = PeakClusterer::new(Threshold::Absolute(0.5), 5_000).locate(&envelope);
        assert_eq!(merged.level, 0.5);
        assert_eq!(merged.max_gap, 500);
        assert_eq!(merged.groups.len(), 1);

        // 2000 raw samples would still span both bursts if read as envelope samples
        let split = PeakClusterer::new(Threshold::Absolute(0.5), 2_000).locate(&envelope);
        assert_eq!(split.max_gap, 200);
        assert_eq!(split.groups.len(), 2);

        let reps = split.representatives();
        assert!((envelope.raw_index(reps[0]) - 1_050).abs() <= 100);
        assert!((envelope.raw_index(reps[1]) - 4_050).abs() <= 100);
    }

    #[test]
    fn test_locate_resolves_threshold_once() {
        let mut env = vec![1.0; 1000];
        env[300] = 9.0;
        let clusterer = PeakClusterer::new(Threshold::StdDevsAboveMean(4.0), 10);
        let detection = clusterer.locate(&EnvelopeSignal::full_rate(env.clone()));

        assert_eq!(detection.level, clusterer.threshold.resolve(&env));
        assert_eq!(detection.groups, PeakClusterer::groups_at(&env, detection.level, 10));
        assert_eq!(detection.representatives(), vec![300]);
    }

    proptest! {
        #[test]
        fn prop_representatives_strictly_increase(
            env in prop::collection::vec(0.0f64..10.0, 3..500),
            max_gap in 0usize..50,
        ) {
            let clusterer = PeakClusterer::new(Threshold::Absolute(2.0), max_gap);
            let groups = clusterer.groups(&env);
            let reps: Vec<usize> = groups.iter().map(|g| g.representative).collect();

            prop_assert!(reps.windows(2).all(|w| w[0] < w[1]));
            for g in &groups {
                prop_assert!(g.representative >= g.first() && g.representative <= g.last());
                prop_assert!(g.members.windows(2).all(|w| w[1] - w[0] <= max_gap));
            }
            for pair in groups.windows(2) {
                prop_assert!(pair[1].first() - pair[0].last() > max_gap);
            }
        }
    }
}
