//! Engine facade: pool resolution, alias translation, and the three
//! externally-driven operations — record, report, purge.
//!
//! The facade is where soft failures disappear: every [`DropReason`]
//! produced by the locked record path is traced at debug level and
//! swallowed, so the request that produced the observation proceeds
//! untouched. Only configuration errors are ever surfaced, and only at
//! construction time.

use std::collections::HashMap;

use tracing::{debug, info, trace};

use crate::arena::SharedArena;
use crate::config::EngineConfig;
use crate::error::{ConfigResult, DropReason};
use crate::pool::Pool;
use crate::report;

/// Fixed acknowledgement payload returned by [`Engine::purge`].
pub const PURGE_ACK: &str = "OK\n";

/// The statistics engine: a set of independent pools plus the alias map.
///
/// All operations take `&self`; each pool serializes its own table behind
/// its own lock, so distinct pools proceed fully independently.
///
/// # Example
///
/// ```
/// use slastat_engine::{Engine, EngineConfig, PoolConfig, SharedArena};
///
/// let arena = SharedArena::new();
/// let config = EngineConfig::builder()
///     .pools(vec![PoolConfig::builder().name("main").is_default(true).build()])
///     .build();
/// let engine = Engine::new(config, &arena)?;
///
/// engine.record(None, "10.0.0.1:80", 200, 42);
/// let text = engine.report(Some("main"));
/// assert!(text.contains("main.10.0.0.1:80.http = 1"));
/// # Ok::<(), slastat_engine::ConfigError>(())
/// ```
#[derive(Debug)]
pub struct Engine {
    pools: Vec<Pool>,
    index: HashMap<String, usize>,
    default_pool: Option<usize>,
    aliases: HashMap<String, String>,
}

impl Engine {
    /// Validates `config` and binds every pool to its arena segment.
    ///
    /// Validation happens before any segment is touched: a rejected
    /// configuration activates nothing. Binding runs each pool through the
    /// reconfiguration guard, which reuses or resets the segment's existing
    /// data (see [`crate::SharedArena`]).
    ///
    /// # Errors
    ///
    /// The first [`ConfigError`](crate::ConfigError) found in `config`.
    pub fn new(config: EngineConfig, arena: &SharedArena) -> ConfigResult<Self> {
        config.validate()?;

        let mut pools = Vec::with_capacity(config.pools.len());
        let mut index = HashMap::with_capacity(config.pools.len());
        let mut default_pool = None;

        for pool_config in config.pools {
            let table = arena.segment(&pool_config.layout());
            let pool = Pool::bind(pool_config, table);
            info!(
                pool = %pool.name(),
                generation = pool.bound_generation(),
                enabled = pool.config().enabled,
                "pool bound"
            );

            if pool.config().is_default {
                default_pool = Some(pools.len());
            }
            index.insert(pool.name().to_owned(), pools.len());
            pools.push(pool);
        }

        let aliases = config
            .aliases
            .into_iter()
            .map(|rule| (rule.source, rule.alias))
            .collect();

        Ok(Self { pools, index, default_pool, aliases })
    }

    /// Records one observation.
    ///
    /// `pool` of `None` resolves to the default pool, if any. An unknown or
    /// disabled pool is a silent no-op. `source` is first translated through
    /// the alias map; unmapped names pass through unchanged. Every drop
    /// reason is traced and swallowed — recording never fails the caller.
    pub fn record(&self, pool: Option<&str>, source: &str, status: u16, latency_ms: u64) {
        let Some(pool) = self.resolve(pool) else {
            trace!(pool = pool.unwrap_or("<default>"), "observation for unknown pool ignored");
            return;
        };
        if !pool.config().enabled {
            return;
        }

        let source = self.aliases.get(source).map_or(source, String::as_str);

        if let Err(reason) = pool.record(source, status, latency_ms) {
            match reason {
                // Expected during a live reload; not even noteworthy.
                DropReason::StaleGeneration { .. } => {
                    trace!(pool = %pool.name(), %reason, "observation dropped");
                }
                _ => {
                    debug!(pool = %pool.name(), source, %reason, "observation dropped");
                }
            }
        }
    }

    /// Renders the text report for one pool, or for all pools in
    /// configuration order.
    ///
    /// An unknown pool name, or a pool whose table generation no longer
    /// matches its bound configuration, contributes nothing.
    #[must_use]
    pub fn report(&self, pool: Option<&str>) -> String {
        let mut out = String::new();
        match pool {
            Some(name) => {
                if let Some(pool) = self.index.get(name).map(|&i| &self.pools[i]) {
                    if let Some(snapshot) = pool.snapshot() {
                        report::render_pool(&snapshot, &mut out);
                    }
                }
            }
            None => {
                for pool in &self.pools {
                    if let Some(snapshot) = pool.snapshot() {
                        report::render_pool(&snapshot, &mut out);
                    }
                }
            }
        }
        out
    }

    /// Resets every pool's table and returns the fixed acknowledgement.
    ///
    /// Purge is a data operation: table generations are untouched, so every
    /// live pool handle stays valid.
    pub fn purge(&self) -> &'static str {
        for pool in &self.pools {
            pool.reset();
        }
        info!(pools = self.pools.len(), "all pools purged");
        PURGE_ACK
    }

    /// Looks up a pool by name.
    #[must_use]
    pub fn pool(&self, name: &str) -> Option<&Pool> {
        self.index.get(name).map(|&i| &self.pools[i])
    }

    /// All pools, in configuration order.
    pub fn pools(&self) -> impl Iterator<Item = &Pool> {
        self.pools.iter()
    }

    fn resolve(&self, name: Option<&str>) -> Option<&Pool> {
        let idx = match name {
            Some(name) => self.index.get(name).copied()?,
            None => self.default_pool?,
        };
        Some(&self.pools[idx])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{AliasRule, PoolConfig};

    fn engine(arena: &SharedArena) -> Engine {
        let config = EngineConfig::builder()
            .pools(vec![
                PoolConfig::builder().name("main").is_default(true).build(),
                PoolConfig::builder().name("api").build(),
            ])
            .aliases(vec![AliasRule {
                source: "10.0.0.1:80".into(),
                alias: "backend".into(),
            }])
            .build();
        Engine::new(config, arena).unwrap()
    }

    #[test]
    fn record_resolves_default_pool() {
        let arena = SharedArena::new();
        let engine = engine(&arena);
        engine.record(None, "backend", 200, 10);

        let snap = engine.pool("main").unwrap().snapshot().unwrap();
        assert_eq!(snap.counters.len(), 2);
        assert_eq!(snap.counters[1].name, "backend");
    }

    #[test]
    fn unknown_pool_is_silent_noop() {
        let arena = SharedArena::new();
        let engine = engine(&arena);
        engine.record(Some("nope"), "backend", 200, 10);

        for pool in engine.pools() {
            assert_eq!(pool.snapshot().unwrap().counters.len(), 1);
        }
    }

    #[test]
    fn no_default_pool_means_unrouted_observations_vanish() {
        let arena = SharedArena::new();
        let config = EngineConfig::builder()
            .pools(vec![PoolConfig::builder().name("main").build()])
            .build();
        let engine = Engine::new(config, &arena).unwrap();

        engine.record(None, "backend", 200, 10);
        assert_eq!(engine.pool("main").unwrap().snapshot().unwrap().counters.len(), 1);
    }

    #[test]
    fn disabled_pool_ignores_observations() {
        let arena = SharedArena::new();
        let config = EngineConfig::builder()
            .pools(vec![PoolConfig::builder().name("main").enabled(false).build()])
            .build();
        let engine = Engine::new(config, &arena).unwrap();

        engine.record(Some("main"), "backend", 200, 10);
        assert_eq!(engine.pool("main").unwrap().snapshot().unwrap().counters.len(), 1);
    }

    #[test]
    fn aliased_source_lands_under_alias() {
        let arena = SharedArena::new();
        let engine = engine(&arena);
        engine.record(Some("main"), "10.0.0.1:80", 200, 10);

        let snap = engine.pool("main").unwrap().snapshot().unwrap();
        assert_eq!(snap.counters[1].name, "backend");
    }

    #[test]
    fn unaliased_source_passes_through() {
        let arena = SharedArena::new();
        let engine = engine(&arena);
        engine.record(Some("main"), "10.0.0.2:80", 200, 10);

        let snap = engine.pool("main").unwrap().snapshot().unwrap();
        assert_eq!(snap.counters[1].name, "10.0.0.2:80");
    }

    #[test]
    fn report_for_one_pool_excludes_others() {
        let arena = SharedArena::new();
        let engine = engine(&arena);
        engine.record(Some("main"), "backend", 200, 10);
        engine.record(Some("api"), "backend", 200, 10);

        let text = engine.report(Some("api"));
        assert!(text.contains("api.backend.http = 1"));
        assert!(!text.contains("main."));
    }

    #[test]
    fn report_for_all_pools_in_config_order() {
        let arena = SharedArena::new();
        let engine = engine(&arena);
        let text = engine.report(None);

        let main = text.find("main.all.").unwrap();
        let api = text.find("api.all.").unwrap();
        assert!(main < api);
    }

    #[test]
    fn report_unknown_pool_is_empty() {
        let arena = SharedArena::new();
        let engine = engine(&arena);
        assert_eq!(engine.report(Some("nope")), "");
    }

    #[test]
    fn purge_resets_all_pools_and_acks() {
        let arena = SharedArena::new();
        let engine = engine(&arena);
        engine.record(Some("main"), "a", 200, 10);
        engine.record(Some("main"), "b", 200, 10);
        engine.record(Some("main"), "c", 200, 10);
        engine.record(Some("api"), "a", 200, 10);

        assert_eq!(engine.purge(), "OK\n");

        for pool in engine.pools() {
            let snap = pool.snapshot().unwrap();
            assert_eq!(snap.counters.len(), 1);
            assert_eq!(snap.counters[0].name, "all");
            assert_eq!(snap.counters[0].status_group_counts, [0; 6]);
        }
    }

    #[test]
    fn invalid_config_activates_nothing() {
        let arena = SharedArena::new();
        let config = EngineConfig::builder()
            .pools(vec![
                PoolConfig::builder().name("ok").build(),
                PoolConfig::builder().name("bad").latency_edges(vec![5, 5]).build(),
            ])
            .build();

        assert!(Engine::new(config, &arena).is_err());
        assert!(arena.is_empty());
    }
}
