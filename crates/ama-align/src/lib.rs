#![deny(missing_docs)]
#![doc = "Alignment representation, FASTA input/output and the AMA distance cache."]

/// Column-linked alignment with O(1) structural edits.
pub mod alignment;
/// Distance from a fixed reference alignment.
pub mod distance;
/// FASTA parsing and writing.
pub mod fasta;
/// Canonical alignment digests.
pub mod hash;
/// Named, gapped sequence collections.
pub mod raw;
/// Contiguous column windows.
pub mod window;

pub use alignment::{count_non_gaps, Alignment, ColumnId, Columns, Entry};
pub use distance::DistanceCache;
pub use fasta::{read_fasta, read_fasta_file, write_fasta, write_fasta_file};
pub use hash::canonical_hash;
pub use raw::{RawSequences, GAP_CHAR};
pub use window::Window;
