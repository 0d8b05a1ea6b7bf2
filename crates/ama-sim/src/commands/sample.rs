use std::error::Error;
use std::path::PathBuf;

use ama_mcmc::{RunConfig, ScheduleConfig, Target, TuningConfig};
use clap::{ArgGroup, Args};
use log::info;

use super::load_alignment;

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["distance", "accuracy"])))]
pub struct SampleArgs {
    /// Reference alignment (FASTA or MPD).
    pub reference: PathBuf,
    /// Distance at which to sample, as defined by Schwartz et al. (2005)
    /// Alignment Metric Accuracy.
    #[arg(short = 'd', long)]
    pub distance: Option<u64>,
    /// Target given as accuracy (agreement with the reference) in [0, 1].
    #[arg(short = 'a', long, value_parser = parse_accuracy)]
    pub accuracy: Option<f64>,
    /// Number of tempered chains [default: 10].
    #[arg(short = 'c', long)]
    pub chains: Option<usize>,
    /// Burn-in steps, number of samples and sampling rate [default: 10k,10,100k].
    #[arg(short = 'p', long = "params", value_name = "BURN,SAMP,RATE", value_parser = parse_schedule)]
    pub schedule: Option<ScheduleConfig>,
    /// Heat tuning target acceptance, cycles per chain pair (0 disables) and
    /// cycle length in steps [default: 0.7,20,10k].
    #[arg(short = 't', long = "tune", value_name = "TACC,CYC,FREQ", value_parser = parse_tuning)]
    pub tuning: Option<TuningConfig>,
    /// Master seed; falls back to the configuration's seed policy.
    #[arg(short = 's', long)]
    pub seed: Option<u64>,
    /// YAML run configuration; command line options override it.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Directory receiving the coldest chain's samples as FASTA files.
    #[arg(long)]
    pub samples_dir: Option<PathBuf>,
    /// File receiving the JSON run report.
    #[arg(long)]
    pub report: Option<PathBuf>,
    /// Verify every cached distance after each step.
    #[arg(long)]
    pub strict: bool,
}

impl SampleArgs {
    fn target(&self) -> Result<Target, Box<dyn Error>> {
        match (self.distance, self.accuracy) {
            (Some(distance), _) => Ok(Target::Distance(distance)),
            (None, Some(accuracy)) => Ok(Target::Accuracy(accuracy)),
            (None, None) => Err("either --distance or --accuracy must be given".into()),
        }
    }

    /// Applies the command line overrides on top of `config`.
    fn apply(&self, config: &mut RunConfig) {
        if let Some(chains) = self.chains {
            config.chains = chains;
        }
        if let Some(schedule) = &self.schedule {
            config.schedule = schedule.clone();
        }
        if let Some(tuning) = &self.tuning {
            config.tuning = tuning.clone();
        }
        if let Some(seed) = self.seed {
            config.seed_policy.master_seed = seed;
        }
        if let Some(dir) = &self.samples_dir {
            config.output.sample_directory = Some(dir.clone());
        }
        if let Some(path) = &self.report {
            config.output.report_file = Some(path.clone());
        }
        config.strict |= self.strict;
    }
}

pub fn run(args: &SampleArgs) -> Result<(), Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    let reference = load_alignment(&args.reference)?;
    let target = args.target()?;
    let seed = config.seed_policy.master_seed;
    info!("chains: {} seed: {seed:#x}", config.chains);

    let report = ama_mcmc::run(&config, seed, &reference, target)?;
    println!("{}", report.to_json_pretty()?);
    Ok(())
}

/// Parses a non-negative count with an optional `k` (thousand) or `M`
/// (million) suffix, case-insensitive.
pub fn parse_count(text: &str) -> Result<usize, String> {
    let text = text.trim();
    let (digits, factor) = match text.chars().last().map(|c| c.to_ascii_uppercase()) {
        Some('K') => (&text[..text.len() - 1], 1_000),
        Some('M') => (&text[..text.len() - 1], 1_000_000),
        _ => (text, 1),
    };
    let value: usize = digits
        .parse()
        .map_err(|_| format!("bad count '{text}'"))?;
    value
        .checked_mul(factor)
        .ok_or_else(|| format!("count '{text}' is too large"))
}

fn parse_accuracy(text: &str) -> Result<f64, String> {
    let accuracy: f64 = text
        .parse()
        .map_err(|_| format!("bad accuracy '{text}'"))?;
    if (0.0..=1.0).contains(&accuracy) {
        Ok(accuracy)
    } else {
        Err(format!("accuracy {accuracy} is outside [0, 1]"))
    }
}

fn split3(text: &str) -> Result<[&str; 3], String> {
    let parts: Vec<&str> = text.split(',').collect();
    <[&str; 3]>::try_from(parts)
        .map_err(|_| format!("expected three comma separated values, got '{text}'"))
}

fn parse_schedule(text: &str) -> Result<ScheduleConfig, String> {
    let [burn_in, samples, rate] = split3(text)?;
    Ok(ScheduleConfig {
        burn_in: parse_count(burn_in)?,
        samples: parse_count(samples)?,
        rate: parse_count(rate)?,
    })
}

fn parse_tuning(text: &str) -> Result<TuningConfig, String> {
    let [target, cycles, frequency] = split3(text)?;
    Ok(TuningConfig {
        target_acceptance: parse_accuracy(target.trim())?,
        cycles: parse_count(cycles)?,
        frequency: parse_count(frequency)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_take_suffixes() {
        assert_eq!(parse_count("10"), Ok(10));
        assert_eq!(parse_count("10k"), Ok(10_000));
        assert_eq!(parse_count("3K"), Ok(3_000));
        assert_eq!(parse_count("2M"), Ok(2_000_000));
        assert_eq!(parse_count(" 7m "), Ok(7_000_000));
        assert!(parse_count("").is_err());
        assert!(parse_count("k").is_err());
        assert!(parse_count("-5").is_err());
        assert!(parse_count("1.5k").is_err());
    }

    #[test]
    fn triples_need_three_fields() {
        let schedule = parse_schedule("10k,10,100k").unwrap();
        assert_eq!(schedule, ScheduleConfig::default());
        assert!(parse_schedule("10k,10").is_err());
        assert!(parse_schedule("1,2,3,4").is_err());

        let tuning = parse_tuning("0.7,20,10k").unwrap();
        assert_eq!(tuning, TuningConfig::default());
        assert!(parse_tuning("1.5,20,10k").is_err());
    }

    #[test]
    fn overrides_replace_configured_values() {
        let args = SampleArgs {
            reference: PathBuf::from("ref.fsa"),
            distance: Some(3),
            accuracy: None,
            chains: Some(4),
            schedule: None,
            tuning: Some(parse_tuning("0.5,0,1").unwrap()),
            seed: Some(11),
            config: None,
            samples_dir: None,
            report: Some(PathBuf::from("out.json")),
            strict: true,
        };
        let mut config = RunConfig::default();
        args.apply(&mut config);
        assert_eq!(config.chains, 4);
        assert_eq!(config.tuning.cycles, 0);
        assert_eq!(config.seed_policy.master_seed, 11);
        assert_eq!(config.output.report_file, Some(PathBuf::from("out.json")));
        assert_eq!(config.schedule, ScheduleConfig::default());
        assert!(config.strict);
        assert_eq!(args.target().unwrap(), Target::Distance(3));
    }
}
