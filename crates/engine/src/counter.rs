//! One named source's statistics bundle: status histograms, latency
//! histograms with cumulative totals, running and moving averages, and the
//! embedded quantile estimator.
//!
//! A counter never locks anything itself — callers reach it through its
//! table, which is owned by the pool lock.

use crate::config::{PoolConfig, TableLayout};
use crate::error::DropReason;
use crate::quantile::QuantileEstimator;

/// Number of status group buckets: 1xx..5xx plus the group total.
pub const STATUS_GROUPS: usize = 6;

/// Statistics for one named source within a pool.
///
/// Count vectors are sized `list length + 1`; the last index is the
/// total/overflow bucket. Invariants maintained by the update rules:
///
/// - `status_counts[last] == Σ status_counts[..last]`
/// - `status_group_counts[5] == Σ status_group_counts[..5]`
/// - `latency_agg_counts[i] == Σ latency_counts[..=i]`
#[derive(Debug, Clone, PartialEq)]
pub struct Counter {
    /// Source name; the table guarantees uniqueness within a pool.
    name: String,
    /// Table generation at creation/reset time.
    generation: u64,
    /// Hits per tracked status code, plus the tracked total.
    status_counts: Vec<u64>,
    /// Hits per status group (1xx..5xx), plus the group total.
    status_group_counts: [u64; STATUS_GROUPS],
    /// Admitted samples per latency bucket (exact bucket hit).
    latency_counts: Vec<u64>,
    /// Admitted samples at or below each bucket's edge (cumulative).
    latency_agg_counts: Vec<u64>,
    /// Running arithmetic mean over all admitted samples.
    mean: f64,
    /// Bounded-window moving average.
    moving_avg: f64,
    /// Streaming quantile state.
    estimator: QuantileEstimator,
}

impl Counter {
    /// Creates a zeroed counter shaped for `layout`, tagged with the table's
    /// current generation.
    #[must_use]
    pub fn new(name: impl Into<String>, layout: &TableLayout, generation: u64) -> Self {
        Self {
            name: name.into(),
            generation,
            status_counts: vec![0; layout.status_bucket_count()],
            status_group_counts: [0; STATUS_GROUPS],
            latency_counts: vec![0; layout.latency_bucket_count()],
            latency_agg_counts: vec![0; layout.latency_bucket_count()],
            mean: 0.0,
            moving_avg: 0.0,
            estimator: QuantileEstimator::new(),
        }
    }

    /// Source name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table generation this counter was created under.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Records one status code.
    ///
    /// The group histogram counts every code in `100..=599`; the per-code
    /// histogram (and its tracked total) only counts codes present in the
    /// pool's status list.
    ///
    /// # Errors
    ///
    /// `DropReason::StatusOutOfRange` for codes outside `100..=599`; no
    /// counter is mutated in that case.
    pub fn record_status(&mut self, status: u16, config: &PoolConfig) -> Result<(), DropReason> {
        if !(100..=599).contains(&status) {
            return Err(DropReason::StatusOutOfRange { status });
        }

        let group = usize::from(status / 100) - 1;
        self.status_group_counts[group] += 1;
        self.status_group_counts[STATUS_GROUPS - 1] += 1;

        if let Some(idx) = config.status_codes.iter().position(|&code| code == status) {
            self.status_counts[idx] += 1;
            let last = self.status_counts.len() - 1;
            self.status_counts[last] += 1;
        }

        Ok(())
    }

    /// Records one latency sample, in milliseconds.
    ///
    /// Samples of zero (a response served without a measurable backend time)
    /// or below the pool's `min_latency` are excluded from every latency
    /// statistic. Admitted samples hit exactly one exact bucket, every
    /// cumulative bucket from there up, the averages, and the quantile
    /// estimator.
    pub fn record_latency(&mut self, ms: u64, config: &PoolConfig) {
        if ms == 0 || ms < config.min_latency {
            return;
        }

        let bucket = config
            .latency_edges
            .iter()
            .position(|&edge| u64::from(edge) > ms)
            .unwrap_or(config.latency_edges.len());
        self.latency_counts[bucket] += 1;
        for agg in &mut self.latency_agg_counts[bucket..] {
            *agg += 1;
        }

        let n = self.admitted_samples();
        let sample = ms as f64;

        self.mean += (sample - self.mean) / n as f64;

        let window = u64::from(config.avg_window);
        if n <= window {
            self.moving_avg += (sample - self.moving_avg) / n as f64;
        } else {
            let w = window as f64;
            self.moving_avg = (w - 1.0) / w * self.moving_avg + sample / w;
        }

        self.estimator.observe(sample, n, &config.quantile_targets, config.quartile_indices());
    }

    /// Total number of admitted latency samples (the overflow bucket's
    /// cumulative count).
    #[must_use]
    pub fn admitted_samples(&self) -> u64 {
        *self.latency_agg_counts.last().unwrap_or(&0)
    }

    /// Hits per tracked status code, plus the tracked total in the last slot.
    #[must_use]
    pub fn status_counts(&self) -> &[u64] {
        &self.status_counts
    }

    /// Hits per status group (1xx..5xx), plus the group total.
    #[must_use]
    pub fn status_group_counts(&self) -> &[u64; STATUS_GROUPS] {
        &self.status_group_counts
    }

    /// Admitted samples per latency bucket.
    #[must_use]
    pub fn latency_counts(&self) -> &[u64] {
        &self.latency_counts
    }

    /// Cumulative admitted samples per latency bucket.
    #[must_use]
    pub fn latency_agg_counts(&self) -> &[u64] {
        &self.latency_agg_counts
    }

    /// Running arithmetic mean of all admitted samples.
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Bounded-window moving average.
    #[must_use]
    pub fn moving_avg(&self) -> f64 {
        self.moving_avg
    }

    /// Current quantile estimates, ordered like the configured targets.
    #[must_use]
    pub fn quantiles(&self) -> &[f64; crate::config::QUANTILE_COUNT] {
        self.estimator.estimates()
    }
}
