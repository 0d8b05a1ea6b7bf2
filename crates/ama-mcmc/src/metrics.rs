use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Result of one attempted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MoveOutcome {
    /// No candidate existed, so nothing was proposed.
    NoMove,
    /// A candidate was drawn but is structurally forbidden.
    Blocked,
    /// Proposed and rejected by the Metropolis-Hastings test.
    Rejected,
    /// Proposed and applied.
    Accepted,
}

/// Outcome counters for one move type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    /// Attempts with no candidate.
    pub no_move: u64,
    /// Attempts with a forbidden candidate (singular slide source, invalid
    /// join direction).
    pub blocked: u64,
    /// Proposals rejected by the acceptance test.
    pub rejected: u64,
    /// Proposals applied.
    pub accepted: u64,
}

impl OutcomeCounts {
    /// Counts `outcome` and hands it back.
    pub fn record(&mut self, outcome: MoveOutcome) -> MoveOutcome {
        match outcome {
            MoveOutcome::NoMove => self.no_move += 1,
            MoveOutcome::Blocked => self.blocked += 1,
            MoveOutcome::Rejected => self.rejected += 1,
            MoveOutcome::Accepted => self.accepted += 1,
        }
        outcome
    }

    /// All attempts regardless of outcome.
    pub fn attempts(&self) -> u64 {
        self.no_move + self.blocked + self.rejected + self.accepted
    }

    /// Accepted share of evaluated proposals.
    pub fn acceptance_rate(&self) -> f64 {
        rate(self.accepted, self.accepted + self.rejected)
    }
}

/// Outcome counters for the three alignment moves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveStats {
    /// Residue slides between neighbouring columns.
    pub slide: OutcomeCounts,
    /// Residues broken out into a new column.
    pub break_column: OutcomeCounts,
    /// Singular columns merged into a neighbour.
    pub join_column: OutcomeCounts,
}

/// Accepted and rejected replica exchanges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapCounts {
    /// Exchanges performed.
    pub accepted: u64,
    /// Exchanges refused.
    pub rejected: u64,
}

impl SwapCounts {
    /// Counts one exchange attempt.
    pub fn record(&mut self, accepted: bool) {
        if accepted {
            self.accepted += 1;
        } else {
            self.rejected += 1;
        }
    }

    /// Accepted share of attempts, zero before the first attempt.
    pub fn acceptance_rate(&self) -> f64 {
        rate(self.accepted, self.accepted + self.rejected)
    }

    /// Clears both counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn rate(hits: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Summary statistics of a sequence of values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dispersion {
    /// Arithmetic mean.
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
}

impl Dispersion {
    /// Summarises `values`; `None` when there are none.
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        Some(Self {
            mean,
            std_dev: variance.sqrt(),
            min,
            max,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SampleEntry {
    count: u64,
    distance: u64,
}

/// Per-chain record of visited distances and recorded samples.
///
/// Samples are keyed by the alignment's canonical FASTA text, so equal gap
/// placements collapse into one entry. Entries keep first-seen order, which
/// keeps derived statistics reproducible.
#[derive(Debug, Clone, Default)]
pub struct SampleRecorder {
    visits: BTreeMap<u64, u64>,
    distinct_by_distance: BTreeMap<u64, u64>,
    samples: IndexMap<String, SampleEntry>,
    total: u64,
    max_count: u64,
    max_distance: u64,
}

impl SampleRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one step spent at `distance`.
    pub fn note_visit(&mut self, distance: u64) {
        *self.visits.entry(distance).or_insert(0) += 1;
    }

    /// Records a sample and returns how often it has now been seen.
    pub fn record(&mut self, key: String, distance: u64) -> u64 {
        let entry = self.samples.entry(key).or_insert_with(|| {
            *self.distinct_by_distance.entry(distance).or_insert(0) += 1;
            SampleEntry { count: 0, distance }
        });
        entry.count += 1;
        let count = entry.count;
        if count > self.max_count {
            self.max_count = count;
            self.max_distance = distance;
        }
        self.total += 1;
        count
    }

    /// Samples recorded so far.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Distinct alignments among the samples.
    pub fn distinct(&self) -> usize {
        self.samples.len()
    }

    /// How often the alignment with canonical text `key` was sampled.
    pub fn count_of(&self, key: &str) -> u64 {
        self.samples.get(key).map_or(0, |entry| entry.count)
    }

    /// Highest per-alignment count and the distance of that alignment.
    pub fn most_frequent(&self) -> Option<(u64, u64)> {
        (self.max_count > 0).then_some((self.max_count, self.max_distance))
    }

    /// Steps spent at each distance.
    pub fn visits(&self) -> &BTreeMap<u64, u64> {
        &self.visits
    }

    /// Distinct sampled alignments at each distance.
    pub fn distinct_by_distance(&self) -> &BTreeMap<u64, u64> {
        &self.distinct_by_distance
    }

    /// Count every distinct alignment would have under perfectly uniform
    /// sampling of the alignments seen.
    pub fn expected_count(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.total as f64 / self.samples.len() as f64
        }
    }

    /// Absolute percentage deviation of each alignment's count from
    /// [`SampleRecorder::expected_count`], summarised.
    pub fn deviation(&self) -> Option<Dispersion> {
        let expected = self.expected_count();
        let deviations: Vec<f64> = self
            .samples
            .values()
            .map(|entry| ((entry.count as f64 - expected) / expected * 100.0).abs())
            .collect();
        Dispersion::of(&deviations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_tracks_counts_and_maxima() {
        let mut recorder = SampleRecorder::new();
        assert_eq!(recorder.record("a".into(), 4), 1);
        assert_eq!(recorder.record("b".into(), 6), 1);
        assert_eq!(recorder.record("a".into(), 4), 2);
        assert_eq!(recorder.record("c".into(), 4), 1);

        assert_eq!(recorder.total(), 4);
        assert_eq!(recorder.distinct(), 3);
        assert_eq!(recorder.count_of("a"), 2);
        assert_eq!(recorder.count_of("z"), 0);
        assert_eq!(recorder.most_frequent(), Some((2, 4)));
        assert_eq!(recorder.distinct_by_distance().get(&4), Some(&2));
        assert_eq!(recorder.distinct_by_distance().get(&6), Some(&1));
    }

    #[test]
    fn deviation_against_uniform_expectation() {
        let mut recorder = SampleRecorder::new();
        assert!(recorder.deviation().is_none());
        for key in ["a", "a", "a", "b"] {
            recorder.record(key.into(), 0);
        }
        // expected 2 per alignment: a deviates by +50%, b by -50%
        let summary = recorder.deviation().unwrap();
        assert!((summary.mean - 50.0).abs() < 1e-12);
        assert!(summary.std_dev.abs() < 1e-12);
        assert_eq!(summary.min, 50.0);
        assert_eq!(summary.max, 50.0);
    }

    #[test]
    fn outcome_counters() {
        let mut counts = OutcomeCounts::default();
        for outcome in [
            MoveOutcome::Accepted,
            MoveOutcome::Rejected,
            MoveOutcome::Accepted,
            MoveOutcome::NoMove,
            MoveOutcome::Blocked,
        ] {
            counts.record(outcome);
        }
        assert_eq!(counts.attempts(), 5);
        assert!((counts.acceptance_rate() - 2.0 / 3.0).abs() < 1e-12);

        let mut swaps = SwapCounts::default();
        assert_eq!(swaps.acceptance_rate(), 0.0);
        swaps.record(true);
        swaps.record(false);
        assert_eq!(swaps.acceptance_rate(), 0.5);
        swaps.reset();
        assert_eq!(swaps, SwapCounts::default());
    }
}
