use std::collections::HashMap;

use ama_align::{Alignment, DistanceCache, Entry, RawSequences};
use ama_core::RngHandle;
use ama_mcmc::Chain;

const NAMES: [&str; 3] = ["A", "C", "E"];
const SEQUENCES: [&str; 3] = ["AB", "C", "D"];

/// Every alignment of `SEQUENCES`, as one gapped string per row.
fn enumerate(positions: [usize; 3], rows: &mut [String; 3], out: &mut Vec<RawSequences>) {
    if (0..3).all(|row| positions[row] == SEQUENCES[row].len()) {
        let mut raw = RawSequences::new();
        for row in 0..3 {
            raw.add(NAMES[row], rows[row].clone()).unwrap();
        }
        out.push(raw);
        return;
    }
    for mask in 1u32..8 {
        let members: Vec<usize> = (0..3).filter(|row| mask >> row & 1 == 1).collect();
        if members
            .iter()
            .any(|&row| positions[row] == SEQUENCES[row].len())
        {
            continue;
        }
        let mut next = positions;
        for row in 0..3 {
            let ch = if members.contains(&row) {
                next[row] += 1;
                SEQUENCES[row].as_bytes()[positions[row]] as char
            } else {
                '-'
            };
            rows[row].push(ch);
        }
        enumerate(next, rows, out);
        for row in rows.iter_mut() {
            row.pop();
        }
    }
}

fn reference() -> Alignment {
    let mut raw = RawSequences::new();
    raw.add("A", "AB").unwrap();
    raw.add("C", "C-").unwrap();
    raw.add("E", "-D").unwrap();
    Alignment::from_raw(&raw).unwrap()
}

/// Column-major cell content, identifying an alignment of the fixture.
fn key(alignment: &Alignment) -> Vec<Entry> {
    alignment
        .iter()
        .flat_map(|id| alignment.cells(id).iter().copied())
        .collect()
}

/// Total variation distance between `steps` visit frequencies of a chain at
/// `(target, heat)` and the normalised tent density over every alignment.
fn total_variation(target: u64, heat: f64, steps: u64, seed: u64) -> f64 {
    let reference = reference();
    let cache = DistanceCache::new(&reference);
    let mut chain = Chain::new(0, &reference, target, heat);

    let mut space = Vec::new();
    enumerate([0; 3], &mut Default::default(), &mut space);
    assert_eq!(space.len(), 31);

    let mut weights = HashMap::new();
    for raw in &space {
        let alignment = Alignment::from_raw(raw).unwrap();
        let distance = cache.distance(&alignment).unwrap();
        weights.insert(key(&alignment), chain.log_density(distance).exp());
    }
    assert_eq!(weights.len(), space.len());
    let norm: f64 = weights.values().sum();

    let mut rng = RngHandle::from_seed(seed);
    let mut visits: HashMap<Vec<Entry>, u64> = HashMap::new();
    for _ in 0..steps {
        chain.step(&cache, &mut rng).unwrap();
        *visits.entry(key(chain.alignment())).or_insert(0) += 1;
    }
    chain.verify_state(&cache).unwrap();

    assert!(visits.keys().all(|key| weights.contains_key(key)));
    weights
        .iter()
        .map(|(key, weight)| {
            let empirical = visits.get(key).copied().unwrap_or(0) as f64 / steps as f64;
            (empirical - weight / norm).abs()
        })
        .sum::<f64>()
        / 2.0
}

#[test]
fn visit_frequencies_match_tent_density() {
    let tv = total_variation(2, 2.0, 6_000_000, 0x0DDBA11);
    assert!(tv < 0.015, "total variation {tv} too large");
}

/// At a zero target most mass sits on the reference, whose only breakable
/// columns hold two residues and leave two singular columns behind.
#[test]
fn two_residue_breaks_balance_at_the_peak() {
    let tv = total_variation(0, 1.0, 6_000_000, 0x5EED);
    assert!(tv < 0.03, "total variation {tv} too large");
}
