use ama_align::{canonical_hash, Alignment, DistanceCache, RawSequences};
use ama_core::RngHandle;
use proptest::prelude::*;
use rand::Rng;

fn aligned_rows(seed: u64, rows: usize, len: usize) -> RawSequences {
    let mut rng = RngHandle::from_seed(seed);
    let mut raw = RawSequences::new();
    for row in 0..rows {
        let seq: String = (0..len)
            .map(|_| {
                if rng.gen_range(0..3) == 0 {
                    '-'
                } else {
                    (b'A' + rng.gen_range(0..4u8)) as char
                }
            })
            .collect();
        raw.add(format!("seq{row}"), seq).unwrap();
    }
    // one residue per row keeps the alignment non-empty
    let mut padded = RawSequences::new();
    for (name, seq) in raw.iter() {
        padded.add(name, format!("{seq}A")).unwrap();
    }
    padded
}

/// Breaks a random residue out into its own column or merges a singular column
/// into a neighbour, mirroring the structural edits of the sampler.
fn random_edit(alignment: &mut Alignment, rng: &mut RngHandle) {
    if rng.gen_range(0..2) == 0 {
        let id = alignment.random_column(rng);
        let rows: Vec<usize> = (0..alignment.num_rows())
            .filter(|&row| alignment.cells(id)[row].is_some())
            .collect();
        if rows.len() < 2 {
            return;
        }
        let row = rows[rng.gen_range(0..rows.len())];
        let mut cells = vec![None; alignment.num_rows()];
        cells[row] = alignment.cells(id)[row];
        alignment.set_entry(id, row, None);
        alignment.update_singularity(id);
        alignment.insert_column(cells.into_boxed_slice(), Some(id));
    } else if let Some(id) = alignment.random_singular_column(rng) {
        let Some(row) = (0..alignment.num_rows()).find(|&row| alignment.cells(id)[row].is_some())
        else {
            return;
        };
        let Some(target) = alignment.next(id) else {
            return;
        };
        if alignment.cells(target)[row].is_some() {
            return;
        }
        let entry = alignment.cells(id)[row];
        alignment.set_entry(target, row, entry);
        alignment.update_singularity(target);
        alignment.remove_column(id);
    }
}

proptest! {
    #[test]
    fn random_edits_preserve_invariants(seed in any::<u64>(), rows in 2usize..6, len in 1usize..12) {
        let raw = aligned_rows(seed, rows, len);
        let mut alignment = Alignment::from_raw(&raw).unwrap();
        alignment.check_consistency().unwrap();
        let cache = DistanceCache::new(&alignment);
        prop_assert_eq!(cache.distance(&alignment).unwrap(), 0);

        let mut rng = RngHandle::from_seed(seed ^ 0x5eed);
        for _ in 0..50 {
            random_edit(&mut alignment, &mut rng);
            alignment.check_consistency().unwrap();
        }

        let rebuilt = Alignment::from_raw(&alignment.to_raw()).unwrap();
        prop_assert_eq!(canonical_hash(&rebuilt), canonical_hash(&alignment));
        prop_assert_eq!(
            cache.distance(&rebuilt).unwrap(),
            cache.distance(&alignment).unwrap()
        );
        prop_assert_eq!(alignment.to_raw(), alignment.rebuild().to_raw());
    }
}

#[test]
fn gap_only_columns_are_dropped() {
    let mut raw = RawSequences::new();
    raw.add("A", "-A--B").unwrap();
    raw.add("E", "-EF--").unwrap();
    raw.add("C", "C-D--").unwrap();
    let alignment = Alignment::from_raw(&raw).unwrap();
    assert_eq!(alignment.len(), 4);
    assert_eq!(alignment.names(), ["A", "C", "E"]);
    assert_eq!(alignment.to_raw().sequence(1), "C-D-");
}

#[test]
fn all_gap_input_is_rejected() {
    let mut raw = RawSequences::new();
    raw.add("x", "--").unwrap();
    raw.add("y", "--").unwrap();
    let err = Alignment::from_raw(&raw).unwrap_err();
    assert_eq!(err.info().code, "no-residues");
}
