//! A pool binds one bucket configuration to one counter table behind one
//! lock, and records which table generation the binding was validated
//! against.
//!
//! Every operation that touches the table acquires the pool lock for its
//! full duration and compares the table's live generation with the pool's
//! bound generation first. A stale pool — one whose table was rebuilt by a
//! newer configuration — records nothing and reports nothing; that is the
//! expected, benign outcome of a live reload, not an error.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{PoolConfig, QUANTILE_COUNT};
use crate::counter::{Counter, STATUS_GROUPS};
use crate::error::DropReason;
use crate::reconfig;
use crate::table::CounterTable;

/// One configured pool: bucket config, table handle, bound generation.
#[derive(Debug)]
pub struct Pool {
    config: PoolConfig,
    table: Arc<Mutex<CounterTable>>,
    bound_generation: u64,
}

/// Point-in-time copy of one counter, taken under the pool lock.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterSnapshot {
    /// Source name.
    pub name: String,
    /// Table generation the counter was created under.
    pub generation: u64,
    /// Hits per tracked status code, plus the tracked total.
    pub status_counts: Vec<u64>,
    /// Hits per status group (1xx..5xx), plus the group total.
    pub status_group_counts: [u64; STATUS_GROUPS],
    /// Admitted samples per latency bucket.
    pub latency_counts: Vec<u64>,
    /// Cumulative admitted samples per latency bucket.
    pub latency_agg_counts: Vec<u64>,
    /// Running arithmetic mean of admitted samples.
    pub mean: f64,
    /// Bounded-window moving average.
    pub moving_avg: f64,
    /// Current quantile estimates, ordered like the configured targets.
    pub quantiles: [f64; QUANTILE_COUNT],
}

impl CounterSnapshot {
    fn of(counter: &Counter) -> Self {
        Self {
            name: counter.name().to_owned(),
            generation: counter.generation(),
            status_counts: counter.status_counts().to_vec(),
            status_group_counts: *counter.status_group_counts(),
            latency_counts: counter.latency_counts().to_vec(),
            latency_agg_counts: counter.latency_agg_counts().to_vec(),
            mean: counter.mean(),
            moving_avg: counter.moving_avg(),
            quantiles: *counter.quantiles(),
        }
    }
}

/// Point-in-time copy of a whole pool: layout lists plus every live counter.
///
/// This is the read surface for the text exposition, for hosts that want
/// structured values, and for tests.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolSnapshot {
    /// Pool name.
    pub name: String,
    /// Tracked status codes, in report order.
    pub status_codes: Vec<u16>,
    /// Latency bucket edges, in report order.
    pub latency_edges: Vec<u32>,
    /// Tracked quantile percentages.
    pub quantile_targets: [u8; QUANTILE_COUNT],
    /// Table generation at snapshot time.
    pub generation: u64,
    /// Live counters, in slot order.
    pub counters: Vec<CounterSnapshot>,
}

impl Pool {
    /// Binds `config` to its table segment through the reconfiguration
    /// guard, recording the resulting generation.
    pub(crate) fn bind(config: PoolConfig, table: Arc<Mutex<CounterTable>>) -> Self {
        let bound_generation = reconfig::rebind(&mut table.lock(), &config.layout());
        Self { config, table, bound_generation }
    }

    /// This pool's bucket configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Pool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The table generation this pool was validated against.
    #[must_use]
    pub fn bound_generation(&self) -> u64 {
        self.bound_generation
    }

    /// Records one observation for `source`.
    ///
    /// The whole observation is applied — or dropped — atomically under the
    /// pool lock: the latency sample and the status code either both land in
    /// the same counter or neither does.
    ///
    /// # Errors
    ///
    /// Returns the [`DropReason`] when the observation was not recorded.
    /// All reasons are soft; no counter state is mutated on any of them.
    pub fn record(&self, source: &str, status: u16, latency_ms: u64) -> Result<(), DropReason> {
        if !(100..=599).contains(&status) {
            return Err(DropReason::StatusOutOfRange { status });
        }

        let mut table = self.table.lock();
        let live = table.generation();
        if live != self.bound_generation {
            return Err(DropReason::StaleGeneration { bound: self.bound_generation, live });
        }

        let counter = table.find_or_create(source)?;
        counter.record_latency(latency_ms, &self.config);
        counter.record_status(status, &self.config)
    }

    /// Takes a consistent snapshot of every live counter.
    ///
    /// Returns `None` when the table generation no longer matches the bound
    /// generation (stale pool, about to be replaced).
    #[must_use]
    pub fn snapshot(&self) -> Option<PoolSnapshot> {
        let table = self.table.lock();
        if table.generation() != self.bound_generation {
            return None;
        }

        Some(PoolSnapshot {
            name: self.config.name.clone(),
            status_codes: self.config.status_codes.clone(),
            latency_edges: self.config.latency_edges.clone(),
            quantile_targets: self.config.quantile_targets,
            generation: table.generation(),
            counters: table.slots().iter().map(CounterSnapshot::of).collect(),
        })
    }

    /// Zeroes every counter and re-seeds the aggregate slot, leaving the
    /// generation untouched.
    pub fn reset(&self) {
        self.table.lock().reset();
    }
}
