//! Streaming quantile estimation over latency samples.
//!
//! The estimator tracks seven quantiles of a latency stream without storing
//! the stream: it keeps only the last [`BOOTSTRAP_LEN`] raw samples in a
//! circular buffer plus O(1) state per tracked quantile.
//!
//! It works in two phases, driven by the admitted-sample count `n`:
//!
//! 1. **Bootstrap** — when the buffer first fills (`n == M`), the sample
//!    quantiles of the sorted buffer seed the estimates, and an initial
//!    bandwidth (`scale`) and density estimate are derived from the
//!    interquartile range.
//! 2. **Block update** — every subsequent `M` admitted samples, each estimate
//!    takes one stochastic-approximation step against the current buffer
//!    contents, and the per-quantile density is refreshed with the same
//!    block. The bandwidth is then re-derived from the current 25th/75th
//!    estimates, so the estimator follows drifting distributions instead of
//!    freezing the bootstrap-time scale.
//!
//! Between cycle boundaries a sample costs one buffer write. The buffer
//! slides in place rather than tumbling: a block update sees the last `M`
//! samples, which may overlap the previous block's view by the write
//! position.

use std::sync::LazyLock;

use crate::config::QUANTILE_COUNT;

/// Number of raw samples retained for bootstrap and block updates (`M`).
pub const BOOTSTRAP_LEN: usize = 100;

/// Fixed stochastic-approximation learning rate (`W`).
pub const LEARN_RATE: f64 = 0.01;

/// Bandwidth floor; keeps the scale positive for near-constant streams.
const MIN_SCALE_RANGE: f64 = 0.001;

/// Bootstrap normalizer: `Σ_{i=1}^{M} 1/√i`.
static BOOTSTRAP_SCALE_NORM: LazyLock<f64> =
    LazyLock::new(|| (1..=BOOTSTRAP_LEN).map(|i| 1.0 / (i as f64).sqrt()).sum());

/// Block-update normalizer: `Σ_{i=0}^{M-1} 1/√(M+i+1)`.
static BLOCK_SCALE_NORM: LazyLock<f64> = LazyLock::new(|| {
    (0..BOOTSTRAP_LEN).map(|i| 1.0 / ((BOOTSTRAP_LEN + i + 1) as f64).sqrt()).sum()
});

/// Per-counter streaming quantile state.
///
/// The caller owns the admitted-sample count (it is derived from the latency
/// histogram totals) and passes it to [`observe`](Self::observe); the
/// estimator itself is a pure function of that count and the sample stream.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantileEstimator {
    /// Current estimate per tracked quantile, in milliseconds.
    estimates: [f64; QUANTILE_COUNT],
    /// Estimated probability density at each estimate.
    densities: [f64; QUANTILE_COUNT],
    /// Current bandwidth used for density counting.
    scale: f64,
    /// Circular buffer of the most recent raw samples.
    buffer: Vec<f64>,
}

impl QuantileEstimator {
    /// Creates an estimator with zeroed state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            estimates: [0.0; QUANTILE_COUNT],
            densities: [0.0; QUANTILE_COUNT],
            scale: 0.0,
            buffer: Vec::with_capacity(BOOTSTRAP_LEN),
        }
    }

    /// Current quantile estimates, ordered like the configured targets.
    ///
    /// All zeros until the first bootstrap completes.
    #[must_use]
    pub fn estimates(&self) -> &[f64; QUANTILE_COUNT] {
        &self.estimates
    }

    /// Feeds one admitted latency sample.
    ///
    /// `n` is the post-increment count of admitted samples for this counter;
    /// the caller increments its histogram totals first and passes the
    /// result. `targets` are the configured quantile percentages and
    /// `(q25, q75)` their positions within that array.
    pub fn observe(
        &mut self,
        sample: f64,
        n: u64,
        targets: &[u8; QUANTILE_COUNT],
        quartiles: (usize, usize),
    ) {
        let slot = ((n - 1) % BOOTSTRAP_LEN as u64) as usize;
        if self.buffer.len() <= slot {
            self.buffer.push(sample);
        } else {
            self.buffer[slot] = sample;
        }

        // Estimator work happens only when the buffer completes a cycle.
        if slot != BOOTSTRAP_LEN - 1 {
            return;
        }

        if n == BOOTSTRAP_LEN as u64 {
            self.bootstrap(targets);
        } else {
            self.block_update(targets, quartiles);
        }
    }

    /// Seeds estimates, bandwidth, and densities from the first full buffer.
    fn bootstrap(&mut self, targets: &[u8; QUANTILE_COUNT]) {
        let m = BOOTSTRAP_LEN;
        let mut sorted = self.buffer.clone();
        sorted.sort_unstable_by(f64::total_cmp);

        for (estimate, &target) in self.estimates.iter_mut().zip(targets) {
            *estimate = sorted[m * usize::from(target) / 100];
        }

        let range = (sorted[m * 3 / 4] - sorted[m / 4]).max(MIN_SCALE_RANGE);
        self.scale = range / m as f64 * *BOOTSTRAP_SCALE_NORM;

        for (density, &estimate) in self.densities.iter_mut().zip(&self.estimates) {
            let near = self
                .buffer
                .iter()
                .filter(|&&x| (x - estimate).abs() <= self.scale)
                .count()
                .max(1);
            *density = near as f64 / (2.0 * self.scale * m as f64);
        }
    }

    /// One stochastic-approximation step per quantile against the current
    /// buffer contents, then a bandwidth refresh from the interquartile
    /// estimates.
    fn block_update(&mut self, targets: &[u8; QUANTILE_COUNT], quartiles: (usize, usize)) {
        let m = BOOTSTRAP_LEN as f64;

        for j in 0..QUANTILE_COUNT {
            let estimate = self.estimates[j];
            let less = self.buffer.iter().filter(|&&x| x <= estimate).count() as f64;
            let near =
                self.buffer.iter().filter(|&&x| (x - estimate).abs() <= self.scale).count() as f64;

            let target = f64::from(targets[j]) / 100.0;
            self.estimates[j] += LEARN_RATE / self.densities[j] * (target - less / m);
            self.densities[j] =
                (1.0 - LEARN_RATE) * self.densities[j] + LEARN_RATE / (2.0 * self.scale * m) * near;
        }

        let (q25, q75) = quartiles;
        let range = (self.estimates[q75] - self.estimates[q25]).max(MIN_SCALE_RANGE);
        self.scale = range * *BLOCK_SCALE_NORM;
    }
}

impl Default for QuantileEstimator {
    fn default() -> Self {
        Self::new()
    }
}
