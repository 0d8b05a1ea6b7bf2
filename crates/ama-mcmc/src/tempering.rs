use ama_core::RngHandle;
use rand::Rng;

/// Heats above this bound are never produced by tuning.
pub const MAX_HEAT: f64 = 100.0;

/// Base of the geometric tuning multiplier.
const TUNING_BASE: f64 = 1.5;

/// Initial ladder: chain `i` runs at heat `1 + heat_step * i`.
pub fn build_ladder(chains: usize, heat_step: f64) -> Vec<f64> {
    (0..chains).map(|i| 1.0 + heat_step * i as f64).collect()
}

/// Log Metropolis ratio for exchanging the states of two chains.
///
/// `a_now`/`b_now` are the chains' current log densities, `a_swapped` and
/// `b_swapped` their log densities evaluated at the other chain's distance.
pub fn exchange_log_ratio(a_now: f64, a_swapped: f64, b_now: f64, b_swapped: f64) -> f64 {
    a_swapped + b_swapped - a_now - b_now
}

/// Metropolis test on a log ratio. Non-negative ratios accept without
/// consuming a draw.
pub fn accept_log_ratio(log_ratio: f64, rng: &mut RngHandle) -> bool {
    log_ratio >= 0.0 || rng.gen::<f64>() < log_ratio.exp()
}

/// Heat multiplier applied after tuning step `step` (zero based) of a pair.
///
/// Starts at 1.5 and decays geometrically to 1 over `steps_per_pair` steps.
/// It is inverted when the observed swap acceptance `rate` is below
/// `target`, pulling the heats above the pair down towards it.
pub fn tuning_multiplier(step: usize, steps_per_pair: usize, rate: f64, target: f64) -> f64 {
    let span = steps_per_pair.saturating_sub(1).max(1) as f64;
    let mult = TUNING_BASE.powf(1.0 - step as f64 / span);
    if rate < target {
        1.0 / mult
    } else {
        mult
    }
}

/// New heat for a chain after scaling by `mult`, if the result still lies
/// strictly between `lower` and `ceiling`.
pub fn scaled_heat(lower: f64, heat: f64, mult: f64, ceiling: f64) -> Option<f64> {
    let scaled = heat * mult;
    (lower < scaled && scaled < ceiling).then_some(scaled)
}

/// Scales `heats[first..]` by `mult`, keeping the ladder strictly increasing
/// and below [`MAX_HEAT`]. A chain whose scaled heat would leave its slot
/// keeps its current heat.
///
/// Raising heats runs top down so that a chain held at the cap bounds the
/// chains below it; lowering runs bottom up against the already updated
/// chain underneath.
pub fn rescale_ladder(heats: &mut [f64], first: usize, mult: f64) {
    let first = first.max(1);
    if first >= heats.len() {
        return;
    }
    if mult > 1.0 {
        let mut ceiling = MAX_HEAT;
        for i in (first..heats.len()).rev() {
            if let Some(heat) = scaled_heat(heats[i - 1], heats[i], mult, ceiling) {
                heats[i] = heat;
            }
            ceiling = heats[i];
        }
    } else {
        for i in first..heats.len() {
            if let Some(heat) = scaled_heat(heats[i - 1], heats[i], mult, MAX_HEAT) {
                heats[i] = heat;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_is_evenly_spaced() {
        assert_eq!(build_ladder(3, 0.5), vec![1.0, 1.5, 2.0]);
        assert!(build_ladder(0, 1.0).is_empty());
    }

    #[test]
    fn multiplier_decays_to_one() {
        let first = tuning_multiplier(9, 100, 0.9, 0.7);
        let last = tuning_multiplier(99, 100, 0.9, 0.7);
        assert!(first > 1.4 && first < 1.5);
        assert!((last - 1.0).abs() < 1e-12);
        let low = tuning_multiplier(9, 100, 0.1, 0.7);
        assert!((low * first - 1.0).abs() < 1e-12);
        // a single-step schedule must not divide by zero
        assert!(tuning_multiplier(0, 1, 0.9, 0.7).is_finite());
    }

    #[test]
    fn scaling_keeps_ladder_ordered() {
        assert_eq!(scaled_heat(1.0, 2.0, 1.5, MAX_HEAT), Some(3.0));
        assert_eq!(scaled_heat(1.5, 2.0, 0.5, MAX_HEAT), None);
        assert_eq!(scaled_heat(1.0, 80.0, 1.5, MAX_HEAT), None);
    }

    #[test]
    fn rescaling_respects_pair_and_cap() {
        let mut heats = vec![1.0, 2.0, 3.0, 4.0];
        rescale_ladder(&mut heats, 2, 1.5);
        assert_eq!(heats, vec![1.0, 2.0, 4.5, 6.0]);

        let mut heats = vec![1.0, 1.2, 3.0];
        rescale_ladder(&mut heats, 1, 0.5);
        // 1.2 would drop below chain 0; 3.0 is checked against the kept 1.2
        assert_eq!(heats, vec![1.0, 1.2, 1.5]);

        // the top chain is held at the cap and the one below must stay under it
        let mut heats = vec![1.0, 60.0, 80.0];
        rescale_ladder(&mut heats, 1, 1.5);
        assert_eq!(heats, vec![1.0, 60.0, 80.0]);
        let mut heats = vec![1.0, 40.0, 80.0];
        rescale_ladder(&mut heats, 1, 1.5);
        assert_eq!(heats, vec![1.0, 60.0, 80.0]);
    }

    #[test]
    fn favourable_exchange_skips_draw() {
        let mut rng = RngHandle::from_seed(1);
        let mut twin = rng.clone();
        assert!(accept_log_ratio(exchange_log_ratio(-4.0, -2.0, -1.0, -1.0), &mut rng));
        assert_eq!(rng.gen::<u64>(), twin.gen::<u64>());
    }
}
