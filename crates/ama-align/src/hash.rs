use sha2::{Digest, Sha256};

use crate::alignment::Alignment;

/// Computes a canonical SHA-256 digest of an alignment's content.
///
/// The digest depends on row names, residues and the left-to-right column
/// layout only, so two alignments with the same gapped sequences hash equally
/// regardless of their arena layout.
pub fn canonical_hash(alignment: &Alignment) -> String {
    let mut hasher = Sha256::new();
    hasher.update((alignment.num_rows() as u64).to_le_bytes());
    for (row, name) in alignment.names().iter().enumerate() {
        update_slice(name.as_bytes(), &mut hasher);
        update_slice(alignment.residues(row), &mut hasher);
    }
    hasher.update((alignment.len() as u64).to_le_bytes());
    for id in alignment.iter() {
        for &entry in alignment.cells(id) {
            let raw = entry.map_or(u64::MAX, u64::from);
            hasher.update(raw.to_le_bytes());
        }
    }
    format!("{:x}", hasher.finalize())
}

fn update_slice(bytes: &[u8], hasher: &mut Sha256) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}
