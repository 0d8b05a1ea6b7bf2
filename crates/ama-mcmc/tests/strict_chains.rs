use ama_align::{Alignment, DistanceCache, RawSequences};
use ama_core::RngHandle;
use proptest::prelude::*;

use ama_mcmc::Chain;

fn reference() -> Alignment {
    let mut raw = RawSequences::new();
    raw.add("p", "AC-GTA-").unwrap();
    raw.add("q", "A-CG-AT").unwrap();
    raw.add("r", "-TCGAA-").unwrap();
    raw.add("s", "ACC--AT").unwrap();
    Alignment::from_raw(&raw).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn strict_chains_never_drift(seed in any::<u64>(), target in 0u64..30, heat in 0.5f64..8.0) {
        let reference = reference();
        let cache = DistanceCache::new(&reference);
        let mut chain = Chain::new(0, &reference, target, heat).with_strict(true);
        let mut rng = RngHandle::from_seed(seed);
        for _ in 0..300 {
            chain.step(&cache, &mut rng).unwrap();
        }
        prop_assert!(chain.distance() <= cache.max_distance());
        prop_assert_eq!(chain.alignment().residue_count(), reference.residue_count());

        let rebuilt = Alignment::from_raw(&chain.alignment().to_raw()).unwrap();
        prop_assert_eq!(cache.distance(&rebuilt).unwrap(), chain.distance());
        prop_assert_eq!(DistanceCache::new(&rebuilt).distance(chain.alignment()).unwrap(), 0);
    }
}
