use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ama_core::{AmaError, ErrorInfo};
use log::info;
use serde::{Deserialize, Serialize};

use crate::chain::Chain;
use crate::metrics::{Dispersion, MoveStats, SwapCounts};

/// Summary returned to callers after a run completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Distance every chain was centred on.
    pub target_distance: u64,
    /// The target expressed as accuracy.
    pub target_accuracy: f64,
    /// Distance at which accuracy reaches zero.
    pub max_distance: u64,
    /// Master seed, when the run was seeded through [`crate::run`].
    pub master_seed: Option<u64>,
    /// Seed label copied from the configuration.
    pub seed_label: Option<String>,
    /// Final heat ladder, coldest first.
    pub heats: Vec<f64>,
    /// Per-chain statistics, coldest first.
    pub chains: Vec<ChainReport>,
    /// Replica exchanges attempted after tuning.
    pub swaps: SwapCounts,
    /// Heat tuning summary, if tuning ran.
    pub tuning: Option<TuningReport>,
    /// Canonical hash of the coldest chain's final alignment.
    pub final_alignment_hash: String,
}

/// Statistics gathered by one chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainReport {
    /// Heat at the end of the run.
    pub heat: f64,
    /// Samples recorded.
    pub samples: u64,
    /// Distinct alignments among the samples.
    pub seen: usize,
    /// Per-alignment count expected under uniform sampling of the seen set.
    pub expected_count: f64,
    /// Absolute percentage deviation of the per-alignment counts from
    /// `expected_count`.
    pub deviation: Option<Dispersion>,
    /// Highest per-alignment count.
    pub max_count: Option<u64>,
    /// Distance of the alignment holding `max_count`.
    pub max_count_distance: Option<u64>,
    /// Times the reference alignment itself was sampled.
    pub reference_count: u64,
    /// Steps spent at each distance.
    pub visits: BTreeMap<u64, u64>,
    /// Distinct sampled alignments per distance.
    pub distinct_by_distance: BTreeMap<u64, u64>,
    /// Move outcome counters.
    pub moves: MoveStats,
    /// Exchanges initiated with the next hotter chain.
    pub swaps: SwapCounts,
}

impl ChainReport {
    /// Summarises `chain`; `reference_key` is the reference's canonical text.
    pub fn from_chain(chain: &Chain, reference_key: &str) -> Self {
        let recorder = chain.recorder();
        let most_frequent = recorder.most_frequent();
        Self {
            heat: chain.heat(),
            samples: recorder.total(),
            seen: recorder.distinct(),
            expected_count: recorder.expected_count(),
            deviation: recorder.deviation(),
            max_count: most_frequent.map(|(count, _)| count),
            max_count_distance: most_frequent.map(|(_, distance)| distance),
            reference_count: recorder.count_of(reference_key),
            visits: recorder.visits().clone(),
            distinct_by_distance: recorder.distinct_by_distance().clone(),
            moves: *chain.moves(),
            swaps: *chain.swaps(),
        }
    }
}

/// Outcome of the heat tuning phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningReport {
    /// Acceptance rate tuned towards.
    pub target_acceptance: f64,
    /// Heats before tuning.
    pub initial_heats: Vec<f64>,
    /// Heats after tuning.
    pub final_heats: Vec<f64>,
    /// Swap acceptance of each adjacent pair in its last tuning cycle.
    pub pair_acceptance: Vec<f64>,
    /// Swap acceptance of every tuning cycle, per adjacent pair.
    #[serde(default)]
    pub cycle_acceptance: Vec<Vec<f64>>,
}

impl RunReport {
    /// Serialises the report as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, AmaError> {
        serde_json::to_string_pretty(self)
            .map_err(|err| AmaError::Serde(ErrorInfo::new("report-serialize", err.to_string())))
    }

    /// Writes the report to a JSON file, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<(), AmaError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AmaError::io("report-mkdir", err, parent))?;
        }
        let json = self.to_json_pretty().map_err(|err| match err {
            AmaError::Serde(info) => {
                AmaError::Serde(info.with_context("path", path.display().to_string()))
            }
            other => other,
        })?;
        fs::write(path, json).map_err(|err| AmaError::io("report-write", err, path))
    }

    /// Loads a report written by [`RunReport::write`].
    pub fn load(path: &Path) -> Result<Self, AmaError> {
        let contents =
            fs::read_to_string(path).map_err(|err| AmaError::io("report-read", err, path))?;
        serde_json::from_str(&contents).map_err(|err| {
            AmaError::Serde(
                ErrorInfo::new("report-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }

    /// Logs per-chain sampling statistics and the move acceptance table.
    pub fn log_statistics(&self) {
        for (idx, chain) in self.chains.iter().enumerate() {
            info!("chain {}", idx + 1);
            info!(
                "alignments seen: {} expected count: {:.3}",
                chain.seen, chain.expected_count
            );
            if let Some(dev) = &chain.deviation {
                info!(
                    "abs deviation %: mean {:.2} sd {:.2} min {:.2} max {:.2}",
                    dev.mean, dev.std_dev, dev.min, dev.max
                );
            }
            if let (Some(count), Some(distance)) = (chain.max_count, chain.max_count_distance) {
                info!("max count: {count} distance: {distance}");
            }
            info!("reference count: {}", chain.reference_count);
        }

        let chains = &self.chains;
        info!("acceptance statistics");
        info!("slide     accept {}", row(chains, |c| c.moves.slide.accepted));
        info!("slide     reject {}", row(chains, |c| c.moves.slide.rejected));
        info!("slide     single {}", row(chains, |c| c.moves.slide.blocked));
        info!("slide     none   {}", row(chains, |c| c.moves.slide.no_move));
        info!("break     accept {}", row(chains, |c| c.moves.break_column.accepted));
        info!("break     reject {}", row(chains, |c| c.moves.break_column.rejected));
        info!("break     none   {}", row(chains, |c| c.moves.break_column.no_move));
        info!("join      accept {}", row(chains, |c| c.moves.join_column.accepted));
        info!("join      reject {}", row(chains, |c| c.moves.join_column.rejected));
        info!("join      bad    {}", row(chains, |c| c.moves.join_column.blocked));
        info!("join      none   {}", row(chains, |c| c.moves.join_column.no_move));
        info!("swap      accept {}", row(chains, |c| c.swaps.accepted));
        info!("swap      reject {}", row(chains, |c| c.swaps.rejected));
        info!(
            "total swaps: {} accepted, {} rejected",
            self.swaps.accepted, self.swaps.rejected
        );
    }
}

fn row(chains: &[ChainReport], pick: impl Fn(&ChainReport) -> u64) -> String {
    chains.iter().map(|chain| format!("{:>9}", pick(chain))).collect()
}
