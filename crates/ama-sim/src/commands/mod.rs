use std::path::Path;

use ama_align::{read_fasta_file, Alignment};
use ama_core::AmaError;
use log::info;

pub mod dist;
pub mod sample;

/// Reads a FASTA or MPD file and builds its alignment.
pub fn load_alignment(path: &Path) -> Result<Alignment, AmaError> {
    let raw = read_fasta_file(path)?;
    let alignment = Alignment::from_raw(&raw)?;
    info!(
        "loaded {}: {} sequences, {} columns",
        path.display(),
        alignment.num_rows(),
        alignment.len()
    );
    Ok(alignment)
}
