use std::error::Error;
use std::path::PathBuf;

use ama_align::DistanceCache;
use clap::Args;

use super::load_alignment;

#[derive(Args, Debug)]
pub struct DistArgs {
    /// Reference alignment (FASTA or MPD).
    pub reference: PathBuf,
    /// Alignments to compare against the reference.
    #[arg(required = true)]
    pub tests: Vec<PathBuf>,
}

pub fn run(args: &DistArgs) -> Result<(), Box<dyn Error>> {
    let reference = load_alignment(&args.reference)?;
    let cache = DistanceCache::new(&reference);
    for path in &args.tests {
        let test = load_alignment(path)?;
        let distance = cache.distance(&test)?;
        println!("{distance}\t{:.6}", cache.dist_to_acc(distance));
    }
    Ok(())
}
