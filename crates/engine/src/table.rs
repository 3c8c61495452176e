//! Fixed-capacity counter table: bounded slot storage, name lookup/insert
//! with a scan hint, the generation tag, and the layout record the
//! reconfiguration guard compares against.
//!
//! The table is deliberately not a hash map and never evicts: it is a
//! bounded array of slots with scan-based lookup, preserving the
//! "never grows, never moves, bounded scan cost" property the shared-arena
//! contract depends on. Operators size `MAX_COUNTERS` against their known
//! source cardinality; overflow refuses the observation rather than evicting
//! a live counter.

use crate::config::{AGGREGATE_COUNTER, MAX_COUNTERS, MAX_NAME_LEN, TableLayout};
use crate::counter::Counter;
use crate::error::DropReason;

/// Fixed-capacity slot table for one pool.
///
/// Slot 0 always holds the synthetic aggregate counter
/// [`AGGREGATE_COUNTER`], seeded eagerly at creation and after every reset.
#[derive(Debug)]
pub struct CounterTable {
    /// Layout the slots are shaped for; compared on reconfiguration.
    layout: TableLayout,
    /// Monotonic tag bumped on every incompatible reconfiguration.
    generation: u64,
    /// Live slots, in insertion order; bounded by [`MAX_COUNTERS`].
    slots: Vec<Counter>,
    /// Index of the last successful lookup. Repeat observations for the same
    /// source (the dominant case) resolve in O(1).
    hint: usize,
}

impl CounterTable {
    /// Creates a table for `layout` with the aggregate slot seeded.
    #[must_use]
    pub fn new(layout: TableLayout) -> Self {
        let mut table = Self {
            layout,
            generation: 1,
            slots: Vec::with_capacity(MAX_COUNTERS),
            hint: 0,
        };
        table.seed_aggregate();
        table
    }

    /// The layout this table's slots are shaped for.
    #[must_use]
    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }

    /// Current table generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Live slots, in insertion order.
    #[must_use]
    pub fn slots(&self) -> &[Counter] {
        &self.slots
    }

    /// Returns the counter named `name`, creating it in the first free slot
    /// when absent.
    ///
    /// Lookup checks the hint slot first, then scans in insertion order.
    ///
    /// # Errors
    ///
    /// - `DropReason::NameTooLong` when `name` does not fit a slot.
    /// - `DropReason::TableFull` when the name is new and no free slot
    ///   remains. Existing counters are unaffected.
    pub fn find_or_create(&mut self, name: &str) -> Result<&mut Counter, DropReason> {
        if name.len() >= MAX_NAME_LEN {
            return Err(DropReason::NameTooLong { max: MAX_NAME_LEN });
        }

        let idx = match self.position(name) {
            Some(idx) => idx,
            None => {
                if self.slots.len() >= MAX_COUNTERS {
                    return Err(DropReason::TableFull { capacity: MAX_COUNTERS });
                }
                self.slots.push(Counter::new(name, &self.layout, self.generation));
                self.slots.len() - 1
            }
        };

        self.hint = idx;
        Ok(&mut self.slots[idx])
    }

    fn position(&self, name: &str) -> Option<usize> {
        if self.slots.get(self.hint).is_some_and(|slot| slot.name() == name) {
            return Some(self.hint);
        }
        self.slots.iter().position(|slot| slot.name() == name)
    }

    /// Zeroes the table in place: every slot is dropped and the aggregate is
    /// re-seeded. The generation is untouched — a purge is a data operation,
    /// not a schema change.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.hint = 0;
        self.seed_aggregate();
    }

    /// Installs a new layout: clears every slot, bumps the generation, and
    /// re-seeds the aggregate. Writers bound to the old generation are fenced
    /// out by the generation check.
    pub(crate) fn rebuild(&mut self, layout: TableLayout) {
        self.layout = layout;
        self.generation += 1;
        self.slots.clear();
        self.hint = 0;
        self.seed_aggregate();
    }

    fn seed_aggregate(&mut self) {
        self.slots.push(Counter::new(AGGREGATE_COUNTER, &self.layout, self.generation));
    }
}
