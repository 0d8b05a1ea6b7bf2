use ama_align::{Alignment, DistanceCache, RawSequences};
use ama_core::RngHandle;
use criterion::{criterion_group, criterion_main, Criterion};

use ama_mcmc::{run, Chain, RunConfig, Target};

fn sample_reference() -> Alignment {
    let rows = [
        ("s01", "MKV-LLAGT-QWERTYIPAS--DFGHKLC"),
        ("s02", "MKVALL-GTSQWE-TYIPASNNDFGH-LC"),
        ("s03", "-KV-LLAGTSQWERTY-PAS--DFGHKLV"),
        ("s04", "MRVALLAG--QWERTYIPGSN-DFGHKL-"),
        ("s05", "MKV-LLSGTSQ-ERTYIPAS--EFGHKLC"),
        ("s06", "MKIALLAGTSQWERSYIPASNNDFGHKLC"),
    ];
    let mut raw = RawSequences::new();
    for (name, seq) in rows {
        raw.add(name, seq).unwrap();
    }
    Alignment::from_raw(&raw).unwrap()
}

fn bench_chain_step(c: &mut Criterion) {
    let reference = sample_reference();
    let cache = DistanceCache::new(&reference);
    let target = cache.acc_to_dist(0.8);
    let mut chain = Chain::new(0, &reference, target, 1.0);
    let mut rng = RngHandle::from_seed(42);

    c.bench_function("chain_step", |b| {
        b.iter(|| chain.step(&cache, &mut rng).unwrap())
    });
}

fn bench_sampler_run(c: &mut Criterion) {
    let reference = sample_reference();
    let mut config = RunConfig::default();
    config.chains = 4;
    config.schedule.burn_in = 200;
    config.schedule.samples = 5;
    config.schedule.rate = 100;
    config.tuning.cycles = 2;
    config.tuning.frequency = 50;

    c.bench_function("sampler_run", |b| {
        b.iter(|| run(&config, 42, &reference, Target::Accuracy(0.8)).unwrap())
    });
}

criterion_group!(benches, bench_chain_step, bench_sampler_run);
criterion_main!(benches);
