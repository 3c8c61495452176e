//! Concurrent recording stress: many threads hammer the same pool and
//! distinct pools while reports and purges run alongside. Exercises the
//! per-pool lock for lost updates and deadlocks.

use std::sync::Arc;
use std::thread;

use slastat_engine::testutil::small_pool;
use slastat_engine::{Engine, EngineConfig, SharedArena};

const THREADS: usize = 8;
const OPS_PER_THREAD: u64 = 2_000;

#[test]
fn parallel_writers_lose_no_updates() {
    let arena = SharedArena::new();
    let config = EngineConfig::builder().pools(vec![small_pool("main")]).build();
    let engine = Arc::new(Engine::new(config, &arena).expect("config"));

    thread::scope(|scope| {
        for _ in 0..THREADS {
            let engine = Arc::clone(&engine);
            scope.spawn(move || {
                for i in 0..OPS_PER_THREAD {
                    engine.record(Some("main"), "backend", 200, 100 + (i % 50));
                }
            });
        }
    });

    let snap = engine.pool("main").expect("pool").snapshot().expect("snapshot");
    let counter = snap.counters.iter().find(|c| c.name == "backend").expect("backend");
    let total = THREADS as u64 * OPS_PER_THREAD;
    assert_eq!(counter.status_group_counts[5], total);
    assert_eq!(*counter.latency_agg_counts.last().expect("agg"), total);
    let exact: u64 = counter.latency_counts.iter().sum();
    assert_eq!(exact, total);
}

#[test]
fn distinct_pools_proceed_independently() {
    let arena = SharedArena::new();
    let config = EngineConfig::builder()
        .pools(vec![small_pool("a"), small_pool("b")])
        .build();
    let engine = Arc::new(Engine::new(config, &arena).expect("config"));

    thread::scope(|scope| {
        for pool in ["a", "b"] {
            let engine = Arc::clone(&engine);
            scope.spawn(move || {
                for i in 0..OPS_PER_THREAD {
                    engine.record(Some(pool), "backend", 200, 10 + (i % 100));
                }
            });
        }
    });

    for pool in ["a", "b"] {
        let snap = engine.pool(pool).expect("pool").snapshot().expect("snapshot");
        assert_eq!(snap.counters[1].status_group_counts[5], OPS_PER_THREAD);
    }
}

#[test]
fn reports_and_purges_interleave_with_writers() {
    let arena = SharedArena::new();
    let config = EngineConfig::builder().pools(vec![small_pool("main")]).build();
    let engine = Arc::new(Engine::new(config, &arena).expect("config"));

    thread::scope(|scope| {
        for _ in 0..THREADS {
            let engine = Arc::clone(&engine);
            scope.spawn(move || {
                for i in 0..OPS_PER_THREAD {
                    engine.record(Some("main"), "backend", 200, 1 + (i % 500));
                }
            });
        }

        let reader = Arc::clone(&engine);
        scope.spawn(move || {
            for _ in 0..200 {
                let text = reader.report(None);
                // Every report is a consistent snapshot: the aggregate slot
                // header line is always present.
                assert!(text.contains("main.all.http = "), "{text}");
            }
        });

        let purger = Arc::clone(&engine);
        scope.spawn(move || {
            for _ in 0..20 {
                assert_eq!(purger.purge(), "OK\n");
            }
        });
    });

    // After the dust settles the pool still records and reports.
    engine.record(Some("main"), "backend", 404, 42);
    let text = engine.report(Some("main"));
    assert!(text.contains("main.backend.http_404 = "), "{text}");
}
