//! Shared test helpers: compact config factories for unit and integration
//! tests.
//!
//! Enabled with the `testutil` feature (crate tests enable it implicitly).

use crate::arena::SharedArena;
use crate::config::{EngineConfig, PoolConfig};
use crate::engine::Engine;

/// A small pool definition: few tracked codes, tight buckets, tiny
/// averaging window. Keeps test assertions readable.
#[must_use]
pub fn small_pool(name: &str) -> PoolConfig {
    PoolConfig::builder()
        .name(name)
        .status_codes(vec![200, 404, 500])
        .latency_edges(vec![300, 500, 2000])
        .avg_window(4)
        .build()
}

/// An engine with a single default pool named `main`, built over `arena`.
#[must_use]
pub fn single_pool_engine(arena: &SharedArena) -> Engine {
    let config = EngineConfig::builder()
        .pools(vec![{
            let mut pool = small_pool("main");
            pool.is_default = true;
            pool
        }])
        .build();
    Engine::new(config, arena).expect("test config must validate")
}
