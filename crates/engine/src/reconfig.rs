//! Reconfiguration guard: decides whether a live counter table can be reused
//! by an incoming configuration or must be zeroed and re-seeded.
//!
//! The decision is a pure layout comparison. Equal layouts rebind the table
//! as-is — in-flight writers validated against the current generation stay
//! valid, and no data is lost across the reload. Any difference in pool
//! name, bucket lists, quantile targets, or averaging window means the slot
//! shapes (or their meaning) changed, so the table is rebuilt and its
//! generation bumped; writers still bound to the old generation are fenced
//! out by the per-write generation check.

use tracing::{debug, info};

use crate::config::TableLayout;
use crate::table::CounterTable;

/// Binds `layout` to `table`, rebuilding the table if the layouts differ.
///
/// Returns the generation the caller must record as its bound generation.
/// Must be called with the pool lock held (the table reference proves it).
pub(crate) fn rebind(table: &mut CounterTable, layout: &TableLayout) -> u64 {
    if table.layout() == layout {
        debug!(pool = %layout.name, generation = table.generation(), "reusing counter table");
        return table.generation();
    }

    let old = table.generation();
    table.rebuild(layout.clone());
    info!(
        pool = %layout.name,
        old_generation = old,
        generation = table.generation(),
        "incompatible layout, counter table reset"
    );
    table.generation()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;

    fn config() -> PoolConfig {
        PoolConfig::builder().name("main").build()
    }

    #[test]
    fn identical_layout_preserves_data_and_generation() {
        let config = config();
        let mut table = CounterTable::new(config.layout());
        table.find_or_create("backend").unwrap().record_status(200, &config).unwrap();

        let bound = rebind(&mut table, &config.layout());

        assert_eq!(bound, 1);
        assert_eq!(table.slots().len(), 2);
        assert_eq!(table.slots()[1].status_group_counts()[5], 1);
    }

    #[test]
    fn min_latency_change_is_data_compatible() {
        let config = config();
        let mut table = CounterTable::new(config.layout());
        table.find_or_create("backend").unwrap();

        let mut relaxed = config.clone();
        relaxed.min_latency = 25;
        let bound = rebind(&mut table, &relaxed.layout());

        assert_eq!(bound, 1);
        assert_eq!(table.slots().len(), 2);
    }

    #[test]
    fn changed_edges_reset_and_bump_generation() {
        let config = config();
        let mut table = CounterTable::new(config.layout());
        table.find_or_create("backend").unwrap();

        let changed = PoolConfig::builder().name("main").latency_edges(vec![100]).build();
        let bound = rebind(&mut table, &changed.layout());

        assert_eq!(bound, 2);
        assert_eq!(table.generation(), 2);
        assert_eq!(table.slots().len(), 1);
    }

    #[test]
    fn changed_avg_window_resets() {
        let config = config();
        let mut table = CounterTable::new(config.layout());

        let changed = PoolConfig::builder().name("main").avg_window(32).build();
        assert_eq!(rebind(&mut table, &changed.layout()), 2);
    }

    #[test]
    fn repeated_incompatible_rebinds_keep_bumping() {
        let mut table = CounterTable::new(config().layout());
        for (i, edge) in [100u32, 200, 300].iter().enumerate() {
            let changed =
                PoolConfig::builder().name("main").latency_edges(vec![*edge]).build();
            assert_eq!(rebind(&mut table, &changed.layout()), 2 + i as u64);
        }
    }
}
