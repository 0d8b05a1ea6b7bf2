use std::fs;
use std::path::{Path, PathBuf};

use ama_core::{AmaError, ErrorInfo};
use serde::{Deserialize, Serialize};

/// YAML-configurable parameters governing a sampling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of tempered chains; chain 0 is the coldest.
    #[serde(default = "default_chains")]
    pub chains: usize,
    /// Burn-in and sampling loop lengths.
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Heat ladder and replica exchange settings.
    #[serde(default)]
    pub tempering: TemperingConfig,
    /// Heat auto-tuning settings.
    #[serde(default)]
    pub tuning: TuningConfig,
    /// Sample recording behaviour.
    #[serde(default)]
    pub sampling: SamplingConfig,
    /// Output locations.
    #[serde(default)]
    pub output: OutputConfig,
    /// Checks every structural and distance invariant around each step.
    #[serde(default)]
    pub strict: bool,
    /// Master seed and label.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
}

fn default_chains() -> usize {
    10
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            chains: default_chains(),
            schedule: ScheduleConfig::default(),
            tempering: TemperingConfig::default(),
            tuning: TuningConfig::default(),
            sampling: SamplingConfig::default(),
            output: OutputConfig::default(),
            strict: false,
            seed_policy: SeedPolicy::default(),
        }
    }
}

impl RunConfig {
    /// Parses a configuration from YAML text.
    pub fn from_yaml_str(contents: &str) -> Result<Self, AmaError> {
        serde_yaml::from_str(contents)
            .map_err(|err| AmaError::Serde(ErrorInfo::new("config-parse", err.to_string())))
    }

    /// Loads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self, AmaError> {
        let contents =
            fs::read_to_string(path).map_err(|err| AmaError::io("config-read", err, path))?;
        let config = Self::from_yaml_str(&contents).map_err(|err| match err {
            AmaError::Serde(info) => {
                AmaError::Serde(info.with_context("path", path.display().to_string()))
            }
            other => other,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects parameter combinations the sampler cannot run with.
    pub fn validate(&self) -> Result<(), AmaError> {
        if self.chains == 0 {
            return Err(invalid("chains", "at least one chain is required"));
        }
        if self.tempering.swap_frequency == 0 {
            return Err(invalid(
                "tempering.swap_frequency",
                "swap frequency must be positive",
            ));
        }
        if !(self.tempering.heat_step.is_finite() && self.tempering.heat_step >= 0.0) {
            return Err(invalid(
                "tempering.heat_step",
                "heat step must be a non-negative number",
            ));
        }
        if self.tuning.cycles > 0 && self.tuning.frequency == 0 {
            return Err(invalid(
                "tuning.frequency",
                "tuning frequency must be positive when tuning is enabled",
            ));
        }
        if !(0.0..=1.0).contains(&self.tuning.target_acceptance) {
            return Err(invalid(
                "tuning.target_acceptance",
                "target acceptance must lie in [0, 1]",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> AmaError {
    AmaError::Config(ErrorInfo::new("invalid-config", message).with_context("field", field))
}

/// Lengths of the burn-in and sampling loops, in global steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Steps discarded before sampling starts.
    #[serde(default = "default_burn_in")]
    pub burn_in: usize,
    /// Number of sample slots to fill.
    #[serde(default = "default_samples")]
    pub samples: usize,
    /// Steps between consecutive samples.
    #[serde(default = "default_rate")]
    pub rate: usize,
}

fn default_burn_in() -> usize {
    10_000
}

fn default_samples() -> usize {
    10
}

fn default_rate() -> usize {
    100_000
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            burn_in: default_burn_in(),
            samples: default_samples(),
            rate: default_rate(),
        }
    }
}

/// Heat ladder construction and exchange frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperingConfig {
    /// Chain `i` starts at heat `1 + heat_step * i`.
    #[serde(default = "default_heat_step")]
    pub heat_step: f64,
    /// A replica exchange is attempted every `swap_frequency` global steps.
    #[serde(default = "default_swap_frequency")]
    pub swap_frequency: usize,
}

fn default_heat_step() -> f64 {
    1.0
}

fn default_swap_frequency() -> usize {
    1
}

impl Default for TemperingConfig {
    fn default() -> Self {
        Self {
            heat_step: default_heat_step(),
            swap_frequency: default_swap_frequency(),
        }
    }
}

/// Heat auto-tuning run before burn-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningConfig {
    /// Swap acceptance rate each adjacent pair is tuned towards.
    #[serde(default = "default_target_acceptance")]
    pub target_acceptance: f64,
    /// Tuning cycles per adjacent chain pair; zero disables tuning.
    #[serde(default = "default_cycles")]
    pub cycles: usize,
    /// Steps per tuning cycle.
    #[serde(default = "default_frequency")]
    pub frequency: usize,
}

fn default_target_acceptance() -> f64 {
    0.7
}

fn default_cycles() -> usize {
    20
}

fn default_frequency() -> usize {
    10_000
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            target_acceptance: default_target_acceptance(),
            cycles: default_cycles(),
            frequency: default_frequency(),
        }
    }
}

impl TuningConfig {
    /// Tuning steps spent on each adjacent pair.
    pub fn steps_per_pair(&self) -> usize {
        self.cycles * self.frequency
    }
}

/// Handling of samples whose distance misses the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NonExactPolicy {
    /// Record every sample.
    #[default]
    Keep,
    /// Drop non-exact samples; the sample slot still counts.
    Skip,
    /// Drop non-exact samples; the slot is repeated until the coldest chain
    /// records one.
    Resample,
}

/// Sample recording behaviour.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Policy for samples that are not exactly at the target distance.
    #[serde(default)]
    pub non_exact: NonExactPolicy,
    /// Return every chain to the reference after each sample.
    #[serde(default)]
    pub restart_from_reference: bool,
}

/// Output locations; every artefact is optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving `sample<N>.fsa` files from the coldest chain.
    #[serde(default)]
    pub sample_directory: Option<PathBuf>,
    /// JSON report written once the run completes.
    #[serde(default)]
    pub report_file: Option<PathBuf>,
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed used for the run.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional label recorded in the report.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x05EE_D5EE_DD15_5EED_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = RunConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.tuning.steps_per_pair(), 200_000);
        config.validate().unwrap();
    }

    #[test]
    fn partial_document_overrides_fields() {
        let yaml = "chains: 3\nsampling:\n  non_exact: resample\ntuning:\n  cycles: 0\n";
        let config = RunConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.chains, 3);
        assert_eq!(config.sampling.non_exact, NonExactPolicy::Resample);
        assert_eq!(config.tuning.cycles, 0);
        assert_eq!(config.tuning.frequency, 10_000);
        assert_eq!(config.schedule.rate, 100_000);
    }

    #[test]
    fn validation_rejects_bad_parameters() {
        let mut config = RunConfig::default();
        config.chains = 0;
        assert_eq!(
            config.validate().unwrap_err().info().context.get("field"),
            Some(&"chains".to_string())
        );

        let mut config = RunConfig::default();
        config.tuning.target_acceptance = 1.5;
        assert!(matches!(config.validate(), Err(AmaError::Config(_))));

        let mut config = RunConfig::default();
        config.tuning.frequency = 0;
        assert!(config.validate().is_err());
        config.tuning.cycles = 0;
        config.validate().unwrap();
    }
}
