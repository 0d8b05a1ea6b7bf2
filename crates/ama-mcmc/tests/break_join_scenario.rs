use ama_align::{Alignment, DistanceCache, RawSequences};
use ama_core::RngHandle;

use ama_mcmc::{Chain, MoveOutcome};

fn scenario() -> Alignment {
    let mut raw = RawSequences::new();
    raw.add("A", "-A--B").unwrap();
    raw.add("E", "-EF--").unwrap();
    raw.add("C", "C-D--").unwrap();
    Alignment::from_raw(&raw).unwrap()
}

#[test]
fn break_then_join_restores_reference() {
    let reference = scenario();
    let cache = DistanceCache::new(&reference);
    assert_eq!(reference.len(), 4);
    assert_eq!(reference.singular_count(), 2);
    assert_eq!(cache.distance(&reference).unwrap(), 0);

    // a near-flat density accepts every structurally possible break
    let mut chain = Chain::new(0, &reference, 0, 1e9);
    let mut rng = RngHandle::from_seed(3);
    let mut attempts = 0;
    while chain.break_column(&cache, &mut rng) != MoveOutcome::Accepted {
        attempts += 1;
        assert!(attempts < 1_000, "no break accepted");
    }
    assert_eq!(chain.alignment().len(), 5);
    assert_eq!(chain.alignment().singular_count(), 4);
    assert!(chain.distance() > 0);
    chain.verify_state(&cache).unwrap();

    let broken = chain;
    let restored = (0..1_000u64)
        .map(|seed| {
            let mut trial = broken.clone();
            let outcome = trial
                .join_column(&cache, &mut RngHandle::from_seed(seed))
                .unwrap();
            (outcome, trial)
        })
        .find(|(outcome, trial)| *outcome == MoveOutcome::Accepted && trial.distance() == 0)
        .map(|(_, trial)| trial)
        .expect("reverse join never drawn");

    assert_eq!(restored.alignment().len(), reference.len());
    assert_eq!(restored.alignment().singular_count(), 2);
    assert_eq!(restored.alignment().to_string(), reference.to_string());
    restored.verify_state(&cache).unwrap();
}

#[test]
fn singular_columns_cannot_be_broken() {
    let mut raw = RawSequences::new();
    raw.add("a", "A-").unwrap();
    raw.add("b", "-B").unwrap();
    let reference = Alignment::from_raw(&raw).unwrap();
    let cache = DistanceCache::new(&reference);
    let mut chain = Chain::new(0, &reference, 0, 1.0);
    let mut rng = RngHandle::from_seed(11);
    for _ in 0..50 {
        assert_eq!(chain.break_column(&cache, &mut rng), MoveOutcome::NoMove);
    }
    assert_eq!(chain.moves().break_column.no_move, 50);
}
