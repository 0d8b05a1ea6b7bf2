use std::error::Error;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

use commands::{
    dist::{self, DistArgs},
    sample::{self, SampleArgs},
};

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "ama-sim",
    version,
    about = "Samples alignments at a given AMA distance from a reference alignment"
)]
struct Cli {
    /// Log verbosity (off, error, warn, info, debug, trace).
    #[arg(long, short = 'l', global = true, default_value = "info")]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the tempered sampler and print the JSON run report.
    Sample(SampleArgs),
    /// Print the distance and accuracy of test alignments against a reference.
    Dist(DistArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    // stdout carries the report, so every log line goes to stderr
    TermLogger::init(
        cli.log_level,
        ConfigBuilder::new().set_time_level(LevelFilter::Off).build(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    match cli.command {
        Command::Sample(args) => sample::run(&args),
        Command::Dist(args) => dist::run(&args),
    }
}
