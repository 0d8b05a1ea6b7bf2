use std::mem;

use ama_align::{Alignment, DistanceCache, Entry};
use ama_core::{AmaError, ErrorInfo, RngHandle};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::metrics::{MoveOutcome, MoveStats, SampleRecorder, SwapCounts};
use crate::tempering;

/// The three structural moves, drawn uniformly each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MoveKind {
    /// Swap a residue with the gap next to it in an adjacent column.
    Slide,
    /// Extract one residue of a column into a new neighbouring column.
    BreakColumn,
    /// Merge a single-residue column into a neighbour.
    JoinColumn,
}

/// One tempered Markov chain over alignments of a fixed sequence set.
///
/// The chain targets the tent density `log pi(d) = -2 |d - target| / heat`
/// where `d` is the distance of its alignment from the reference. Distance
/// and log density are maintained incrementally; strict chains recompute both
/// around every step.
#[derive(Debug, Clone)]
pub struct Chain {
    index: usize,
    target: u64,
    heat: f64,
    alignment: Alignment,
    distance: u64,
    log_pi: f64,
    strict: bool,
    moves: MoveStats,
    swaps: SwapCounts,
    recorder: SampleRecorder,
    gap_column: Box<[Entry]>,
    rows: Vec<usize>,
}

impl Chain {
    /// Creates chain `index` positioned at `reference`.
    pub fn new(index: usize, reference: &Alignment, target: u64, heat: f64) -> Self {
        let mut chain = Self {
            index,
            target,
            heat,
            alignment: reference.rebuild(),
            distance: 0,
            log_pi: 0.0,
            strict: false,
            moves: MoveStats::default(),
            swaps: SwapCounts::default(),
            recorder: SampleRecorder::new(),
            gap_column: Box::default(),
            rows: Vec::new(),
        };
        chain.init(reference);
        chain
    }

    /// Enables the consistency checks run before and after every step.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Clears every counter and restarts from `reference` at distance zero.
    pub fn init(&mut self, reference: &Alignment) {
        self.moves = MoveStats::default();
        self.swaps.reset();
        self.recorder = SampleRecorder::new();
        self.gap_column = vec![None; reference.num_rows()].into_boxed_slice();
        self.rows = Vec::with_capacity(reference.num_rows());
        self.alignment = reference.rebuild();
        self.distance = 0;
        self.log_pi = self.log_density(0);
    }

    /// Replaces the current state by a copy of `alignment`, recomputing its
    /// distance in full.
    pub fn jump_to(&mut self, alignment: &Alignment, cache: &DistanceCache) -> Result<(), AmaError> {
        let copy = alignment.rebuild();
        self.distance = cache.distance(&copy)?;
        self.alignment = copy;
        self.log_pi = self.log_density(self.distance);
        Ok(())
    }

    /// Moves the chain to `heat`, re-evaluating the current log density.
    pub fn change_heat(&mut self, heat: f64) {
        self.heat = heat;
        self.log_pi = self.log_density(self.distance);
    }

    /// Log target density of `distance` at this chain's heat.
    pub fn log_density(&self, distance: u64) -> f64 {
        -2.0 * (distance as f64 - self.target as f64).abs() / self.heat
    }

    /// Position of the chain in the ladder.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Target distance.
    pub fn target(&self) -> u64 {
        self.target
    }

    /// Current heat.
    pub fn heat(&self) -> f64 {
        self.heat
    }

    /// Current alignment.
    pub fn alignment(&self) -> &Alignment {
        &self.alignment
    }

    /// Distance of the current alignment from the reference.
    pub fn distance(&self) -> u64 {
        self.distance
    }

    /// Log density of the current state.
    pub fn log_pi(&self) -> f64 {
        self.log_pi
    }

    /// Move outcome counters.
    pub fn moves(&self) -> &MoveStats {
        &self.moves
    }

    /// Exchanges initiated by this chain with the chain above it.
    pub fn swaps(&self) -> &SwapCounts {
        &self.swaps
    }

    /// Clears the exchange counters.
    pub fn reset_swaps(&mut self) {
        self.swaps.reset();
    }

    /// Visits and samples recorded so far.
    pub fn recorder(&self) -> &SampleRecorder {
        &self.recorder
    }

    /// Performs one step: a uniformly chosen move, then a visit count at the
    /// resulting distance.
    pub fn step(&mut self, cache: &DistanceCache, rng: &mut RngHandle) -> Result<MoveKind, AmaError> {
        if self.strict {
            self.verify_state(cache)?;
        }
        let kind = match rng.gen_range(0..3) {
            0 => MoveKind::Slide,
            1 => MoveKind::BreakColumn,
            _ => MoveKind::JoinColumn,
        };
        match kind {
            MoveKind::Slide => self.slide_char(cache, rng)?,
            MoveKind::BreakColumn => self.break_column(cache, rng),
            MoveKind::JoinColumn => self.join_column(cache, rng)?,
        };
        self.recorder.note_visit(self.distance);
        if self.strict {
            self.verify_state(cache)?;
        }
        Ok(kind)
    }

    /// Slides a residue across the gap facing it in a random pair of
    /// adjacent columns.
    ///
    /// The proposal is symmetric. Residues in single-residue columns are
    /// never slid, since that would leave a gap-only column behind.
    pub fn slide_char(
        &mut self,
        cache: &DistanceCache,
        rng: &mut RngHandle,
    ) -> Result<MoveOutcome, AmaError> {
        let Some(window) = self.alignment.random_window(2, rng) else {
            return Ok(self.moves.slide.record(MoveOutcome::NoMove));
        };
        let (left, right) = (window.first(), window.last());

        self.rows.clear();
        let cells1 = self.alignment.cells(left);
        let cells2 = self.alignment.cells(right);
        self.rows.extend(
            (0..cells1.len()).filter(|&row| cells1[row].is_some() != cells2[row].is_some()),
        );
        if self.rows.is_empty() {
            return Ok(self.moves.slide.record(MoveOutcome::NoMove));
        }

        let row = self.rows[rng.gen_range(0..self.rows.len())];
        let (ch1, ch2) = (cells1[row], cells2[row]);
        let source = if ch1.is_some() { left } else { right };
        if self.alignment.is_singular(source) {
            return Ok(self.moves.slide.record(MoveOutcome::Blocked));
        }

        let added = cache.single(cells1, row, ch2) + cache.single(cells2, row, ch1);
        let removed = cache.single(cells1, row, ch1) + cache.single(cells2, row, ch2);
        let new_distance = self.distance + added - removed;

        if self.strict {
            self.alignment.set_entry(left, row, ch2);
            self.alignment.set_entry(right, row, ch1);
            let trial = cache.distance(&self.alignment);
            self.alignment.set_entry(left, row, ch1);
            self.alignment.set_entry(right, row, ch2);
            if trial? != new_distance {
                return Err(drift("slide-distance", new_distance, self.index));
            }
        }

        let new_log_pi = self.log_density(new_distance);
        if tempering::accept_log_ratio(new_log_pi - self.log_pi, rng) {
            self.alignment.set_entry(left, row, ch2);
            self.alignment.set_entry(right, row, ch1);
            self.alignment.update_singularity(left);
            self.alignment.update_singularity(right);
            self.distance = new_distance;
            self.log_pi = new_log_pi;
            Ok(self.moves.slide.record(MoveOutcome::Accepted))
        } else {
            Ok(self.moves.slide.record(MoveOutcome::Rejected))
        }
    }

    /// Breaks a random residue out of a random column into a new column on
    /// its left or right.
    ///
    /// The Hastings factor is `columns * residues / singular_after`, where
    /// `singular_after` counts the singular columns after the move. When the
    /// source keeps one residue it turns singular as well, and the two
    /// resulting singular columns give the reverse join two paths.
    pub fn break_column(&mut self, cache: &DistanceCache, rng: &mut RngHandle) -> MoveOutcome {
        let id = self.alignment.random_column(rng);
        self.rows.clear();
        let cells = self.alignment.cells(id);
        self.rows
            .extend((0..cells.len()).filter(|&row| cells[row].is_some()));
        let residues = self.rows.len();
        if residues < 2 {
            return self.moves.break_column.record(MoveOutcome::NoMove);
        }

        let singular_after =
            self.alignment.singular_count() + if residues == 2 { 2 } else { 1 };
        let mut mh = self.alignment.len() as f64 * residues as f64 / singular_after as f64;

        let row = self.rows[rng.gen_range(0..residues)];
        let to_right = rng.gen_range(0..2) == 1;

        let entry = cells[row];
        let added = cache.single(cells, row, None) + cache.single(&self.gap_column, row, entry);
        let removed = cache.single(cells, row, entry);
        let new_distance = self.distance + added - removed;
        let new_log_pi = self.log_density(new_distance);
        mh *= (new_log_pi - self.log_pi).exp();

        if rng.gen::<f64>() < mh {
            self.alignment.set_entry(id, row, None);
            self.alignment.update_singularity(id);
            let mut split = self.gap_column.clone();
            split[row] = entry;
            let after = if to_right {
                Some(id)
            } else {
                self.alignment.prev(id)
            };
            self.alignment.insert_column(split, after);
            self.distance = new_distance;
            self.log_pi = new_log_pi;
            self.moves.break_column.record(MoveOutcome::Accepted)
        } else {
            self.moves.break_column.record(MoveOutcome::Rejected)
        }
    }

    /// Joins a random singular column into its left or right neighbour.
    ///
    /// Blocked when there is no neighbour in the chosen direction or the
    /// neighbour already holds a residue of that row.
    pub fn join_column(
        &mut self,
        cache: &DistanceCache,
        rng: &mut RngHandle,
    ) -> Result<MoveOutcome, AmaError> {
        let Some(id) = self.alignment.random_singular_column(rng) else {
            return Ok(self.moves.join_column.record(MoveOutcome::NoMove));
        };
        let cells = self.alignment.cells(id);
        let row = cells.iter().position(Option::is_some).ok_or_else(|| {
            AmaError::Alignment(
                ErrorInfo::new("singular-flag", "singular column holds no residue")
                    .with_context("chain", self.index.to_string()),
            )
        })?;
        let to_right = rng.gen_range(0..2) == 1;
        let neighbour = if to_right {
            self.alignment.next(id)
        } else {
            self.alignment.prev(id)
        };
        let Some(neighbour) = neighbour.filter(|&n| self.alignment.cells(n)[row].is_none()) else {
            return Ok(self.moves.join_column.record(MoveOutcome::Blocked));
        };

        let entry = cells[row];
        let merged = self.alignment.cells(neighbour);
        let added = cache.single(merged, row, entry);
        let removed = cache.single(cells, row, entry) + cache.single(merged, row, None);
        let new_distance = self.distance + added - removed;

        let residues = self.alignment.non_gaps(neighbour);
        let mut mh = self.alignment.singular_count() as f64
            / (self.alignment.len() - 1) as f64
            / (residues + 1) as f64;
        let new_log_pi = self.log_density(new_distance);
        mh *= (new_log_pi - self.log_pi).exp();

        if rng.gen::<f64>() < mh {
            self.alignment.set_entry(neighbour, row, entry);
            self.alignment.update_singularity(neighbour);
            self.alignment.remove_column(id);
            self.distance = new_distance;
            self.log_pi = new_log_pi;
            Ok(self.moves.join_column.record(MoveOutcome::Accepted))
        } else {
            Ok(self.moves.join_column.record(MoveOutcome::Rejected))
        }
    }

    /// Attempts a replica exchange with `other`.
    ///
    /// On acceptance the two chains trade alignments, distances and log
    /// densities (re-evaluated at their own heats). The outcome is counted on
    /// `self` only.
    pub fn try_swap_with(&mut self, other: &mut Chain, rng: &mut RngHandle) -> bool {
        let swapped = self.log_density(other.distance);
        let other_swapped = other.log_density(self.distance);
        let ratio =
            tempering::exchange_log_ratio(self.log_pi, swapped, other.log_pi, other_swapped);
        let accepted = tempering::accept_log_ratio(ratio, rng);
        if accepted {
            mem::swap(&mut self.alignment, &mut other.alignment);
            mem::swap(&mut self.distance, &mut other.distance);
            self.log_pi = swapped;
            other.log_pi = other_swapped;
        }
        self.swaps.record(accepted);
        accepted
    }

    /// Records the current alignment as a sample unless `exact_only` is set
    /// and the distance misses the target. Returns whether it was recorded.
    pub fn sample(&mut self, exact_only: bool) -> bool {
        if exact_only && self.distance != self.target {
            return false;
        }
        self.recorder
            .record(self.alignment.to_string(), self.distance);
        true
    }

    /// Checks the alignment invariants and that the cached distance and log
    /// density match a full recomputation.
    pub fn verify_state(&self, cache: &DistanceCache) -> Result<(), AmaError> {
        self.alignment.check_consistency()?;
        let fresh = cache.distance(&self.alignment)?;
        if fresh != self.distance {
            return Err(drift("distance-drift", fresh, self.index));
        }
        if self.log_pi != self.log_density(self.distance) {
            return Err(AmaError::Alignment(
                ErrorInfo::new("density-drift", "inconsistency in likelihood calculation")
                    .with_context("chain", self.index.to_string())
                    .with_context("cached", self.log_pi.to_string()),
            ));
        }
        Ok(())
    }
}

fn drift(code: &str, expected: u64, chain: usize) -> AmaError {
    AmaError::Alignment(
        ErrorInfo::new(code, "inconsistency in distance calculation")
            .with_context("expected", expected.to_string())
            .with_context("chain", chain.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ama_align::RawSequences;

    fn reference() -> Alignment {
        let mut raw = RawSequences::new();
        raw.add("A", "-A--B").unwrap();
        raw.add("E", "-EF--").unwrap();
        raw.add("C", "C-D--").unwrap();
        Alignment::from_raw(&raw).unwrap()
    }

    #[test]
    fn new_chain_sits_at_reference() {
        let reference = reference();
        let chain = Chain::new(0, &reference, 4, 2.0);
        assert_eq!(chain.distance(), 0);
        assert_eq!(chain.log_pi(), -4.0);
        assert_eq!(chain.alignment().to_raw(), reference.to_raw());
    }

    #[test]
    fn heat_change_rescales_density() {
        let reference = reference();
        let mut chain = Chain::new(0, &reference, 4, 2.0);
        chain.change_heat(4.0);
        assert_eq!(chain.log_pi(), -2.0);
        assert_eq!(chain.log_density(6), -1.0);
    }

    #[test]
    fn strict_steps_keep_cached_state_exact() {
        let reference = reference();
        let cache = DistanceCache::new(&reference);
        let mut chain = Chain::new(0, &reference, 3, 1.5).with_strict(true);
        let mut rng = RngHandle::from_seed(99);
        for _ in 0..2_000 {
            chain.step(&cache, &mut rng).unwrap();
        }
        chain.verify_state(&cache).unwrap();
        let visits: u64 = chain.recorder().visits().values().sum();
        assert_eq!(visits, 2_000);
        let moves = chain.moves();
        let attempts =
            moves.slide.attempts() + moves.break_column.attempts() + moves.join_column.attempts();
        assert_eq!(attempts, 2_000);
        assert!(moves.break_column.accepted > 0);
        assert!(moves.join_column.accepted > 0);
    }

    #[test]
    fn jump_recomputes_distance() {
        let reference = reference();
        let cache = DistanceCache::new(&reference);
        let mut wandering = Chain::new(1, &reference, 6, 1.0);
        let mut rng = RngHandle::from_seed(5);
        for _ in 0..200 {
            wandering.step(&cache, &mut rng).unwrap();
        }
        let mut chain = Chain::new(0, &reference, 6, 1.0);
        chain.jump_to(wandering.alignment(), &cache).unwrap();
        assert_eq!(chain.distance(), wandering.distance());
        assert_eq!(chain.log_pi(), wandering.log_pi());
        chain.verify_state(&cache).unwrap();
    }

    #[test]
    fn swap_exchanges_states() {
        let reference = reference();
        let cache = DistanceCache::new(&reference);
        let mut cold = Chain::new(0, &reference, 0, 1.0);
        let mut hot = Chain::new(1, &reference, 0, 2.0);
        let mut rng = RngHandle::from_seed(17);
        while hot.distance() == 0 {
            hot.step(&cache, &mut rng).unwrap();
        }
        let hot_distance = hot.distance();
        let hot_text = hot.alignment().to_string();

        // moving the far state to the cold chain is never favourable, so keep
        // trying until the draw accepts it
        while !cold.try_swap_with(&mut hot, &mut rng) {}
        assert_eq!(cold.distance(), hot_distance);
        assert_eq!(cold.alignment().to_string(), hot_text);
        assert_eq!(hot.distance(), 0);
        assert_eq!(cold.log_pi(), cold.log_density(hot_distance));
        assert_eq!(hot.log_pi(), 0.0);
        assert!(cold.swaps().accepted == 1);
        cold.verify_state(&cache).unwrap();
        hot.verify_state(&cache).unwrap();
    }

    #[test]
    fn exact_only_sampling_skips_misses() {
        let reference = reference();
        let mut chain = Chain::new(0, &reference, 2, 1.0);
        assert!(!chain.sample(true));
        assert!(chain.sample(false));
        assert_eq!(chain.recorder().count_of(&reference.to_string()), 1);
    }
}
