#![deny(missing_docs)]
#![doc = "Parallel tempering MCMC over alignments, targeting a prescribed AMA distance from a reference alignment."]

/// Tempered chain state and the slide, break and join moves.
pub mod chain;
/// YAML configuration schema and defaults.
pub mod config;
/// Move, exchange and sample counters.
pub mod metrics;
/// Run report and JSON output.
pub mod report;
/// Replica exchange scheduler and heat tuning.
pub mod sampler;
/// Heat ladder and exchange helpers.
pub mod tempering;

pub use chain::{Chain, MoveKind};
pub use config::{
    NonExactPolicy, OutputConfig, RunConfig, SamplingConfig, ScheduleConfig, SeedPolicy,
    TemperingConfig, TuningConfig,
};
pub use metrics::{Dispersion, MoveOutcome, MoveStats, OutcomeCounts, SampleRecorder, SwapCounts};
pub use report::{ChainReport, RunReport, TuningReport};
pub use sampler::{run, Sampler, Target};
