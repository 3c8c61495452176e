//! Statistical behavior of the streaming quantile estimator, driven through
//! the full record path with seeded pseudo-random latency streams.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use slastat_engine::testutil::single_pool_engine;
use slastat_engine::{PoolSnapshot, SharedArena};

/// Enough samples for one bootstrap plus several hundred block updates, so
/// the stochastic approximation anneals the bootstrap sampling error.
const SAMPLES: usize = 60_000;

fn backend_snapshot(snapshot: &PoolSnapshot) -> &slastat_engine::CounterSnapshot {
    snapshot.counters.iter().find(|c| c.name == "backend").expect("backend counter")
}

#[test]
fn estimates_converge_on_stationary_uniform_stream() {
    let arena = SharedArena::new();
    let engine = single_pool_engine(&arena);
    let mut rng = StdRng::seed_from_u64(0x51A5_7A7);

    // Uniform integer latencies over [10_000, 12_000): the q-th percentile
    // is 10_000 + 20q.
    for _ in 0..SAMPLES {
        let ms = rng.gen_range(10_000..12_000);
        engine.record(Some("main"), "backend", 200, ms);
    }

    let snap = engine.pool("main").expect("pool").snapshot().expect("snapshot");
    let counter = backend_snapshot(&snap);

    for (i, &target) in snap.quantile_targets.iter().enumerate() {
        let expected = 10_000.0 + 20.0 * f64::from(target);
        let estimate = counter.quantiles[i];
        let error = (estimate - expected).abs();

        assert!(
            error <= expected * 0.05,
            "p{target}: estimate {estimate:.1} deviates more than 5% from {expected}"
        );
        // The estimator should do far better than the coarse bound on a
        // stationary stream.
        assert!(
            error <= 150.0,
            "p{target}: estimate {estimate:.1} off true value {expected} by {error:.1} ms"
        );
    }
}

#[test]
fn estimates_are_ordered_like_their_targets() {
    let arena = SharedArena::new();
    let engine = single_pool_engine(&arena);
    let mut rng = StdRng::seed_from_u64(0xBEEF);

    for _ in 0..SAMPLES {
        let ms = rng.gen_range(10_000..12_000);
        engine.record(Some("main"), "backend", 200, ms);
    }

    let snap = engine.pool("main").expect("pool").snapshot().expect("snapshot");
    let quantiles = backend_snapshot(&snap).quantiles;
    assert!(
        quantiles.windows(2).all(|w| w[0] <= w[1]),
        "estimates out of order: {quantiles:?}"
    );
}

#[test]
fn estimates_follow_distribution_drift() {
    let arena = SharedArena::new();
    let engine = single_pool_engine(&arena);
    let mut rng = StdRng::seed_from_u64(0xD81F7);

    for _ in 0..20_000 {
        let ms = rng.gen_range(10_000..12_000);
        engine.record(Some("main"), "backend", 200, ms);
    }
    let snap = engine.pool("main").expect("pool").snapshot().expect("snapshot");
    let median_before = backend_snapshot(&snap).quantiles[1];

    // The stream shifts upward; the estimator must chase it rather than
    // stay frozen at the bootstrap-time distribution.
    for _ in 0..40_000 {
        let ms = rng.gen_range(20_000..22_000);
        engine.record(Some("main"), "backend", 200, ms);
    }
    let snap = engine.pool("main").expect("pool").snapshot().expect("snapshot");
    let median_after = backend_snapshot(&snap).quantiles[1];

    assert!(
        median_after > median_before + 1_000.0,
        "median did not follow the drift: {median_before:.1} -> {median_after:.1}"
    );
    assert!(median_after.is_finite());
}

#[test]
fn no_estimates_before_bootstrap_completes() {
    let arena = SharedArena::new();
    let engine = single_pool_engine(&arena);

    // 99 admitted samples: one short of the bootstrap block.
    for i in 0..99 {
        engine.record(Some("main"), "backend", 200, 100 + i);
    }

    let snap = engine.pool("main").expect("pool").snapshot().expect("snapshot");
    assert_eq!(backend_snapshot(&snap).quantiles, [0.0; 7]);

    // The hundredth admitted sample completes the bootstrap.
    engine.record(Some("main"), "backend", 200, 100);
    let snap = engine.pool("main").expect("pool").snapshot().expect("snapshot");
    assert!(backend_snapshot(&snap).quantiles.iter().all(|&q| q > 0.0));
}

#[test]
fn excluded_samples_do_not_advance_the_estimator() {
    let arena = SharedArena::new();
    let engine = single_pool_engine(&arena);

    // Interleave zero-latency observations; only the non-zero ones count.
    for i in 0..99 {
        engine.record(Some("main"), "backend", 200, 100 + i);
        engine.record(Some("main"), "backend", 200, 0);
    }
    let snap = engine.pool("main").expect("pool").snapshot().expect("snapshot");
    let counter = backend_snapshot(&snap);
    assert_eq!(*counter.latency_agg_counts.last().expect("agg"), 99);
    assert_eq!(counter.quantiles, [0.0; 7]);
}
