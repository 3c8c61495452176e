//! The shared table arena: named, exclusively-owned counter-table segments
//! whose lifetime spans engine rebuilds.
//!
//! This models the pre-sized memory block the engine is handed by its host:
//! the engine never allocates its own backing store ad hoc — it asks the
//! arena for the segment named after each pool. Across a configuration
//! reload the host keeps the arena and constructs a new
//! [`Engine`](crate::Engine) over it; the reconfiguration guard then decides
//! per segment whether the existing data survives.
//!
//! Each segment carries its own lock ([`parking_lot::Mutex`]) scoped to that
//! table alone; the arena's map lock is only held during segment lookup and
//! is never held while a table lock is held.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::config::TableLayout;
use crate::table::CounterTable;

/// Owner of all counter-table segments, keyed by pool name.
///
/// Cheap to share by reference; engines borrow it during construction and
/// hold `Arc` handles to the segments they bind.
#[derive(Debug, Default)]
pub struct SharedArena {
    segments: Mutex<HashMap<String, Arc<Mutex<CounterTable>>>>,
}

impl SharedArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the segment for `layout.name`, creating a freshly-seeded
    /// table shaped for `layout` on first use.
    ///
    /// An existing segment is returned as-is regardless of its current
    /// layout; deciding whether it is compatible is the reconfiguration
    /// guard's job, under the segment's own lock.
    #[must_use]
    pub fn segment(&self, layout: &TableLayout) -> Arc<Mutex<CounterTable>> {
        let mut segments = self.segments.lock();
        Arc::clone(segments.entry(layout.name.clone()).or_insert_with(|| {
            debug!(pool = %layout.name, "allocating counter table segment");
            Arc::new(Mutex::new(CounterTable::new(layout.clone())))
        }))
    }

    /// Number of allocated segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.lock().len()
    }

    /// Whether no segment has been allocated yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.lock().is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;

    #[test]
    fn same_name_returns_same_segment() {
        let arena = SharedArena::new();
        let layout = PoolConfig::builder().name("main").build().layout();

        let a = arena.segment(&layout);
        let b = arena.segment(&layout);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn existing_segment_keeps_its_layout() {
        let arena = SharedArena::new();
        let first = PoolConfig::builder().name("main").build().layout();
        arena.segment(&first);

        // A different layout under the same name does not replace the table;
        // the reconfiguration guard owns that decision.
        let second =
            PoolConfig::builder().name("main").latency_edges(vec![50]).build().layout();
        let segment = arena.segment(&second);
        assert_eq!(segment.lock().layout(), &first);
    }

    #[test]
    fn distinct_pools_get_distinct_segments() {
        let arena = SharedArena::new();
        let a = arena.segment(&PoolConfig::builder().name("a").build().layout());
        let b = arena.segment(&PoolConfig::builder().name("b").build().layout());
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(arena.len(), 2);
    }
}
