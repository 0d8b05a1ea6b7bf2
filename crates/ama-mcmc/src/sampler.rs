use std::path::PathBuf;

use ama_align::{canonical_hash, write_fasta_file, Alignment, DistanceCache};
use ama_core::{AmaError, ErrorInfo, RngHandle};
use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::chain::Chain;
use crate::config::{NonExactPolicy, RunConfig};
use crate::metrics::SwapCounts;
use crate::report::{ChainReport, RunReport, TuningReport};
use crate::tempering;

/// Distance the chains are centred on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum Target {
    /// Absolute AMA distance.
    Distance(u64),
    /// Accuracy in `[0, 1]`, converted to the nearest distance.
    Accuracy(f64),
}

impl Target {
    /// Resolves the target to a distance against `cache`'s reference.
    ///
    /// Distances beyond the cache's maximum are rejected: no alignment can
    /// reach them, so exact-only sampling would never fill a slot.
    pub fn resolve(self, cache: &DistanceCache) -> Result<u64, AmaError> {
        match self {
            Target::Distance(distance) if distance <= cache.max_distance() => Ok(distance),
            Target::Distance(distance) => Err(AmaError::Config(
                ErrorInfo::new("target-distance", "target distance exceeds the maximum distance")
                    .with_context("distance", distance.to_string())
                    .with_context("max_distance", cache.max_distance().to_string()),
            )),
            Target::Accuracy(accuracy) if (0.0..=1.0).contains(&accuracy) => {
                Ok(cache.acc_to_dist(accuracy))
            }
            Target::Accuracy(accuracy) => Err(AmaError::Config(
                ErrorInfo::new("target-accuracy", "accuracy must lie in [0, 1]")
                    .with_context("accuracy", accuracy.to_string()),
            )),
        }
    }
}

/// Writes the coldest chain's samples and reports their distance to the
/// reference and to the first written sample.
#[derive(Debug)]
struct SampleWriter {
    directory: PathBuf,
    first: Option<DistanceCache>,
}

impl SampleWriter {
    fn write(
        &mut self,
        number: u64,
        alignment: &Alignment,
        cache: &DistanceCache,
    ) -> Result<(), AmaError> {
        let first = self
            .first
            .get_or_insert_with(|| DistanceCache::new(alignment));
        let from_reference = cache.distance(alignment)?;
        let from_first = first.distance(alignment)?;
        info!(
            "{number}\t{from_reference}\t{:.2}\t{from_first}\t{:.2}",
            cache.dist_to_acc(from_reference),
            first.dist_to_acc(from_first)
        );
        let path = self.directory.join(format!("sample{number}.fsa"));
        write_fasta_file(&alignment.to_raw(), &path, 0)
    }
}

/// Parallel tempering scheduler driving a ladder of [`Chain`]s.
///
/// Every global step advances each chain once, coldest first, then attempts
/// one exchange between a random adjacent pair every `swap_frequency` steps.
/// All draws come from the single handle passed to [`Sampler::run`].
#[derive(Debug)]
pub struct Sampler {
    config: RunConfig,
    reference: Alignment,
    reference_key: String,
    cache: DistanceCache,
    target: u64,
    chains: Vec<Chain>,
    last_swap: usize,
    swaps: SwapCounts,
    tuning: Option<TuningReport>,
    writer: Option<SampleWriter>,
    master_seed: Option<u64>,
}

impl Sampler {
    /// Prepares a sampler around `reference` with a validated `config`.
    pub fn new(reference: Alignment, target: Target, config: RunConfig) -> Result<Self, AmaError> {
        config.validate()?;
        let cache = DistanceCache::new(&reference);
        let target = target.resolve(&cache)?;
        let writer = config
            .output
            .sample_directory
            .clone()
            .map(|directory| SampleWriter {
                directory,
                first: None,
            });
        let mut sampler = Self {
            reference_key: reference.to_string(),
            reference,
            cache,
            target,
            chains: Vec::new(),
            last_swap: 0,
            swaps: SwapCounts::default(),
            tuning: None,
            writer,
            master_seed: None,
            config,
        };
        sampler.chains = sampler.build_chains();
        Ok(sampler)
    }

    fn build_chains(&self) -> Vec<Chain> {
        tempering::build_ladder(self.config.chains, self.config.tempering.heat_step)
            .into_iter()
            .enumerate()
            .map(|(index, heat)| {
                Chain::new(index, &self.reference, self.target, heat)
                    .with_strict(self.config.strict)
            })
            .collect()
    }

    /// Records the seed of the handle that will drive the run in its report.
    pub fn with_master_seed(mut self, seed: u64) -> Self {
        self.master_seed = Some(seed);
        self
    }

    /// Target distance shared by every chain.
    pub fn target(&self) -> u64 {
        self.target
    }

    /// Distance cache of the reference.
    pub fn cache(&self) -> &DistanceCache {
        &self.cache
    }

    /// Chains in ladder order, coldest first.
    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    /// Current heat of every chain.
    pub fn heats(&self) -> Vec<f64> {
        self.chains.iter().map(Chain::heat).collect()
    }

    /// Runs with the schedule from the configuration.
    pub fn run(&mut self, rng: &mut RngHandle) -> Result<RunReport, AmaError> {
        let schedule = self.config.schedule.clone();
        self.run_with(schedule.burn_in, schedule.samples, schedule.rate, rng)
    }

    /// Restarts every chain from the reference, tunes heats if enabled, burns
    /// in for `burn_in` steps and then fills `samples` sample slots taken
    /// every `rate` steps.
    pub fn run_with(
        &mut self,
        burn_in: usize,
        samples: usize,
        rate: usize,
        rng: &mut RngHandle,
    ) -> Result<RunReport, AmaError> {
        let tuning = &self.config.tuning;
        info!("target distance: {}", self.target);
        info!("MCMC parameters: {burn_in},{samples},{rate}");
        if tuning.cycles == 0 {
            info!("heat tuning: disabled");
        } else {
            info!(
                "heat tuning: {},{},{}",
                tuning.target_acceptance, tuning.cycles, tuning.frequency
            );
        }

        self.chains = self.build_chains();
        self.last_swap = 0;
        self.swaps.reset();
        self.tuning = None;

        if self.config.tuning.cycles > 0 && self.chains.len() > 1 {
            let report = self.tune(rng)?;
            self.tuning = Some(report);
        }

        if burn_in > 0 {
            info!("burn-in");
            for _ in 0..burn_in {
                self.step(rng)?;
            }
        }

        info!("sampling");
        let policy = self.config.sampling.non_exact;
        let mut filled = 0;
        while filled < samples {
            for _ in 0..rate {
                self.step(rng)?;
            }
            if self.sample()? || policy != NonExactPolicy::Resample {
                filled += 1;
            }
            if self.config.sampling.restart_from_reference {
                for chain in &mut self.chains {
                    chain.jump_to(&self.reference, &self.cache)?;
                }
            }
        }

        info!("statistics");
        let report = self.report();
        report.log_statistics();
        if let Some(path) = &self.config.output.report_file {
            report.write(path)?;
        }
        Ok(report)
    }

    /// One global step: every chain moves once, then an exchange is attempted
    /// when the swap counter reaches the configured frequency.
    pub fn step(&mut self, rng: &mut RngHandle) -> Result<(), AmaError> {
        for chain in &mut self.chains {
            chain.step(&self.cache, rng)?;
        }
        if self.chains.len() > 1 {
            self.last_swap += 1;
            if self.last_swap == self.config.tempering.swap_frequency {
                self.last_swap = 0;
                let lower = rng.gen_range(0..self.chains.len() - 1);
                let accepted = self.swap_pair(lower, rng);
                self.swaps.record(accepted);
            }
        }
        Ok(())
    }

    fn swap_pair(&mut self, lower: usize, rng: &mut RngHandle) -> bool {
        let (cold, hot) = self.chains.split_at_mut(lower + 1);
        cold[lower].try_swap_with(&mut hot[0], rng)
    }

    /// Tunes each adjacent pair in turn, rescaling the heats above the pair
    /// after every cycle until its swap acceptance approaches the target.
    fn tune(&mut self, rng: &mut RngHandle) -> Result<TuningReport, AmaError> {
        let target_acceptance = self.config.tuning.target_acceptance;
        let steps = self.config.tuning.steps_per_pair();
        let initial_heats = self.heats();
        info!("heat tuning, target acceptance {target_acceptance}");
        info!("initial heats: {}", format_heats(&initial_heats));

        let mut cycle_acceptance = Vec::with_capacity(self.chains.len() - 1);
        for pair in 0..self.chains.len() - 1 {
            let mut rates = Vec::with_capacity(self.config.tuning.cycles);
            for step in 0..steps {
                if let Some(rate) = self.tune_step(pair, step, steps, rng)? {
                    rates.push(rate);
                }
            }
            self.tune_reset(pair)?;
            cycle_acceptance.push(rates);
        }
        let pair_acceptance = cycle_acceptance
            .iter()
            .map(|rates| rates.last().copied().unwrap_or(0.0))
            .collect();

        let final_heats = self.heats();
        info!("final heats: {}", format_heats(&final_heats));
        Ok(TuningReport {
            target_acceptance,
            initial_heats,
            final_heats,
            pair_acceptance,
            cycle_acceptance,
        })
    }

    /// Steps both chains of `pair`, attempts their exchange and, at the end
    /// of a cycle, rescales the heats above the pair. Returns the cycle's
    /// acceptance rate when a cycle completes.
    fn tune_step(
        &mut self,
        pair: usize,
        step: usize,
        steps: usize,
        rng: &mut RngHandle,
    ) -> Result<Option<f64>, AmaError> {
        self.chains[pair].step(&self.cache, rng)?;
        self.chains[pair + 1].step(&self.cache, rng)?;
        let accepted = self.swap_pair(pair, rng);
        self.swaps.record(accepted);

        if (step + 1) % self.config.tuning.frequency != 0 {
            return Ok(None);
        }
        let rate = self.swaps.acceptance_rate();
        let mult = tempering::tuning_multiplier(
            step,
            steps,
            rate,
            self.config.tuning.target_acceptance,
        );
        let mut heats = self.heats();
        tempering::rescale_ladder(&mut heats, pair + 1, mult);
        for (chain, heat) in self.chains.iter_mut().zip(heats) {
            if chain.heat() != heat {
                chain.change_heat(heat);
            }
        }
        debug!(
            "pair {} cycle {}: acceptance {rate:.3}, multiplier {mult:.4}, heats {}",
            pair + 1,
            (step + 1) / self.config.tuning.frequency,
            format_heats(&self.heats())
        );
        self.tune_reset(pair)?;
        Ok(Some(rate))
    }

    fn tune_reset(&mut self, pair: usize) -> Result<(), AmaError> {
        for chain in &mut self.chains[pair..=pair + 1] {
            chain.jump_to(&self.reference, &self.cache)?;
            chain.reset_swaps();
        }
        self.swaps.reset();
        Ok(())
    }

    /// Offers the current state of every chain as a sample. Returns whether
    /// the coldest chain recorded one.
    fn sample(&mut self) -> Result<bool, AmaError> {
        let exact_only = self.config.sampling.non_exact != NonExactPolicy::Keep;
        let mut recorded = false;
        for chain in &mut self.chains {
            let hit = chain.sample(exact_only);
            if chain.index() == 0 {
                recorded = hit;
            }
        }
        if let (true, Some(writer), Some(cold)) =
            (recorded, self.writer.as_mut(), self.chains.first())
        {
            writer.write(cold.recorder().total(), cold.alignment(), &self.cache)?;
        }
        Ok(recorded)
    }

    /// Builds the statistics report for the current state.
    pub fn report(&self) -> RunReport {
        let final_alignment_hash = self
            .chains
            .first()
            .map(|chain| canonical_hash(chain.alignment()))
            .unwrap_or_default();
        RunReport {
            target_distance: self.target,
            target_accuracy: self.cache.dist_to_acc(self.target),
            max_distance: self.cache.max_distance(),
            master_seed: self.master_seed,
            seed_label: self.config.seed_policy.label.clone(),
            heats: self.heats(),
            chains: self
                .chains
                .iter()
                .map(|chain| ChainReport::from_chain(chain, &self.reference_key))
                .collect(),
            swaps: self.swaps,
            tuning: self.tuning.clone(),
            final_alignment_hash,
        }
    }
}

fn format_heats(heats: &[f64]) -> String {
    heats
        .iter()
        .map(|heat| format!("{heat:.2}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs a full sampling job seeded from `seed`.
pub fn run(
    config: &RunConfig,
    seed: u64,
    reference: &Alignment,
    target: Target,
) -> Result<RunReport, AmaError> {
    let mut rng = RngHandle::from_seed(seed);
    Sampler::new(reference.rebuild(), target, config.clone())?
        .with_master_seed(seed)
        .run(&mut rng)
}
