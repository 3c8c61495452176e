//! Pool and engine configuration: bucket lists, estimator parameters, alias
//! rules, defaults, and load-time validation.
//!
//! A [`PoolConfig`] is immutable once built — the engine never mutates it at
//! runtime. Validation happens exactly once, in [`EngineConfig::validate`],
//! before any counter table is bound; a rejected configuration activates
//! nothing (fail fast).
//!
//! # Defaults
//!
//! | Field | Default |
//! |-------|---------|
//! | `status_codes` | 200, 301, 302, 304, 400, 401, 403, 404, 499, 500, 502, 503, 504 |
//! | `latency_edges` | 300, 500, 2000 (milliseconds) |
//! | `quantile_targets` | 25, 50, 75, 90, 95, 98, 99 |
//! | `avg_window` | 1600 |
//! | `min_latency` | 0 |

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Maximum counter name length in bytes, exclusive.
pub const MAX_NAME_LEN: usize = 256;

/// Maximum number of status buckets per counter (tracked codes + total).
pub const MAX_STATUS_BUCKETS: usize = 32;

/// Maximum number of latency buckets per counter (edges + overflow).
pub const MAX_LATENCY_BUCKETS: usize = 32;

/// Fixed number of counter slots per pool, including the aggregate slot.
pub const MAX_COUNTERS: usize = 16;

/// Number of tracked quantile targets per counter.
pub const QUANTILE_COUNT: usize = 7;

/// Largest accepted latency edge, in milliseconds (5 minutes).
pub const MAX_LATENCY_MS: u64 = 300_000;

/// Name of the synthetic aggregate counter seeded into slot 0 of every table.
pub const AGGREGATE_COUNTER: &str = "all";

/// Pool name with special meaning to the configuration surface ("tracking
/// disabled"); rejected as an actual pool name.
const RESERVED_POOL_NAME: &str = "off";

fn default_status_codes() -> Vec<u16> {
    vec![200, 301, 302, 304, 400, 401, 403, 404, 499, 500, 502, 503, 504]
}

fn default_latency_edges() -> Vec<u32> {
    vec![300, 500, 2000]
}

fn default_quantile_targets() -> [u8; QUANTILE_COUNT] {
    [25, 50, 75, 90, 95, 98, 99]
}

fn default_avg_window() -> u32 {
    1600
}

fn default_enabled() -> bool {
    true
}

/// One latency bucket of a pool's histogram layout.
///
/// The overflow bucket is an explicit variant, never a sentinel value mixed
/// into the edge list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyBucket {
    /// Samples strictly below `edge` milliseconds (and not claimed by an
    /// earlier bucket).
    UpTo(u32),
    /// Samples at or above the last edge.
    Inf,
}

/// Per-pool bucket configuration.
///
/// Built once from the host's configuration surface and never mutated at
/// runtime. Construct with [`PoolConfig::builder`] or deserialize from any
/// serde format; call [`EngineConfig::validate`] (or [`PoolConfig::validate`])
/// before use.
///
/// # Example
///
/// ```
/// use slastat_engine::PoolConfig;
///
/// let pool = PoolConfig::builder()
///     .name("main")
///     .latency_edges(vec![100, 300, 1000])
///     .avg_window(200)
///     .build();
/// assert!(pool.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bon::Builder)]
#[builder(on(String, into))]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Pool name; used as the first segment of every report line.
    pub name: String,

    /// HTTP status codes tracked individually.
    #[serde(default = "default_status_codes")]
    #[builder(default = default_status_codes())]
    pub status_codes: Vec<u16>,

    /// Strictly ascending latency bucket edges, in milliseconds.
    #[serde(default = "default_latency_edges")]
    #[builder(default = default_latency_edges())]
    pub latency_edges: Vec<u32>,

    /// The seven tracked quantile percentages, strictly ascending, each in
    /// `1..=99`; must contain 25 and 75 (the estimator re-derives its scale
    /// from the interquartile range every block).
    #[serde(default = "default_quantile_targets")]
    #[builder(default = default_quantile_targets())]
    pub quantile_targets: [u8; QUANTILE_COUNT],

    /// Moving-average window size; must be at least 2.
    #[serde(default = "default_avg_window")]
    #[builder(default = default_avg_window())]
    pub avg_window: u32,

    /// Samples below this latency (milliseconds) are excluded from all
    /// latency statistics. Zero-valued samples are always excluded.
    #[serde(default)]
    #[builder(default)]
    pub min_latency: u64,

    /// Whether observations for this pool are recorded at all. A disabled
    /// pool keeps its table but silently ignores `record` calls.
    #[serde(default = "default_enabled")]
    #[builder(default = true)]
    pub enabled: bool,

    /// Marks this pool as the fallback when an observation names no pool.
    /// At most one pool may carry this flag.
    #[serde(default, rename = "default")]
    #[builder(default)]
    pub is_default: bool,
}

impl PoolConfig {
    /// Validates this pool definition in isolation.
    ///
    /// Cross-pool rules (duplicate names, multiple defaults) live in
    /// [`EngineConfig::validate`].
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyPoolName);
        }
        if self.name == RESERVED_POOL_NAME {
            return Err(ConfigError::reserved_pool_name(&self.name));
        }

        if self.status_codes.len() + 1 > MAX_STATUS_BUCKETS {
            return Err(ConfigError::ListTooLong {
                pool: self.name.clone(),
                kind: "status",
                max: MAX_STATUS_BUCKETS,
            });
        }
        for &code in &self.status_codes {
            if !(100..=599).contains(&code) {
                return Err(ConfigError::ValueOutOfRange {
                    pool: self.name.clone(),
                    kind: "status",
                    value: u64::from(code),
                    min: 100,
                    max: 599,
                });
            }
        }

        if self.latency_edges.len() + 1 > MAX_LATENCY_BUCKETS {
            return Err(ConfigError::ListTooLong {
                pool: self.name.clone(),
                kind: "latency",
                max: MAX_LATENCY_BUCKETS,
            });
        }
        if self.latency_edges.is_empty() {
            return Err(ConfigError::EdgesNotAscending { pool: self.name.clone() });
        }
        for &edge in &self.latency_edges {
            if edge == 0 || u64::from(edge) > MAX_LATENCY_MS {
                return Err(ConfigError::ValueOutOfRange {
                    pool: self.name.clone(),
                    kind: "latency",
                    value: u64::from(edge),
                    min: 1,
                    max: MAX_LATENCY_MS,
                });
            }
        }
        if !self.latency_edges.windows(2).all(|w| w[0] < w[1]) {
            return Err(ConfigError::EdgesNotAscending { pool: self.name.clone() });
        }

        for &q in &self.quantile_targets {
            if !(1..=99).contains(&q) {
                return Err(ConfigError::invalid_quantiles(
                    &self.name,
                    "targets must lie strictly between 0 and 100",
                ));
            }
        }
        if !self.quantile_targets.windows(2).all(|w| w[0] < w[1]) {
            return Err(ConfigError::invalid_quantiles(
                &self.name,
                "targets must be strictly ascending",
            ));
        }
        if !self.quantile_targets.contains(&25) || !self.quantile_targets.contains(&75) {
            return Err(ConfigError::invalid_quantiles(&self.name, "targets must include 25 and 75"));
        }

        if self.avg_window < 2 {
            return Err(ConfigError::AvgWindowTooSmall {
                pool: self.name.clone(),
                value: self.avg_window,
            });
        }

        Ok(())
    }

    /// Iterates the latency bucket layout: one [`LatencyBucket::UpTo`] per
    /// edge, then the [`LatencyBucket::Inf`] overflow bucket.
    pub fn latency_buckets(&self) -> impl Iterator<Item = LatencyBucket> + '_ {
        self.latency_edges
            .iter()
            .map(|&edge| LatencyBucket::UpTo(edge))
            .chain(std::iter::once(LatencyBucket::Inf))
    }

    /// Positions of the 25th and 75th percentile targets within
    /// [`quantile_targets`](Self::quantile_targets).
    ///
    /// Only meaningful after [`validate`](Self::validate) has passed (the
    /// targets are then guaranteed to contain both).
    #[must_use]
    pub(crate) fn quartile_indices(&self) -> (usize, usize) {
        let q25 = self.quantile_targets.iter().position(|&q| q == 25).unwrap_or(0);
        let q75 = self.quantile_targets.iter().position(|&q| q == 75).unwrap_or(0);
        (q25, q75)
    }

    /// The layout this pool imposes on its counter table.
    #[must_use]
    pub fn layout(&self) -> TableLayout {
        TableLayout {
            name: self.name.clone(),
            status_codes: self.status_codes.clone(),
            latency_edges: self.latency_edges.clone(),
            quantile_targets: self.quantile_targets,
            avg_window: self.avg_window,
        }
    }
}

/// The subset of a pool configuration that determines the memory layout and
/// semantics of its counter table.
///
/// The reconfiguration guard compares layouts for equality to decide whether
/// a live table can be reused across a configuration reload. `min_latency`
/// and `enabled` are deliberately excluded: changing them is data-compatible
/// and must neither reset the table nor bump its generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    /// Pool name.
    pub name: String,
    /// Tracked status codes.
    pub status_codes: Vec<u16>,
    /// Latency bucket edges.
    pub latency_edges: Vec<u32>,
    /// Tracked quantile percentages.
    pub quantile_targets: [u8; QUANTILE_COUNT],
    /// Moving-average window size.
    pub avg_window: u32,
}

impl TableLayout {
    /// Number of status buckets (tracked codes + total).
    #[must_use]
    pub fn status_bucket_count(&self) -> usize {
        self.status_codes.len() + 1
    }

    /// Number of latency buckets (edges + overflow).
    #[must_use]
    pub fn latency_bucket_count(&self) -> usize {
        self.latency_edges.len() + 1
    }
}

/// One source-name rewrite rule, applied before counter lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AliasRule {
    /// Incoming source name to match.
    pub source: String,
    /// Replacement counter name.
    pub alias: String,
}

/// Complete engine configuration: pool definitions plus alias rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, bon::Builder)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Pool definitions, in report order.
    #[serde(default)]
    #[builder(default)]
    pub pools: Vec<PoolConfig>,

    /// Source-name rewrite rules.
    #[serde(default)]
    #[builder(default)]
    pub aliases: Vec<AliasRule>,
}

impl EngineConfig {
    /// Validates every pool definition and all cross-pool and alias rules.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered; nothing is activated on
    /// failure.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut default_pool: Option<&str> = None;

        for (i, pool) in self.pools.iter().enumerate() {
            pool.validate()?;

            if self.pools[..i].iter().any(|p| p.name == pool.name) {
                return Err(ConfigError::duplicate_pool(&pool.name));
            }

            if pool.is_default {
                if let Some(first) = default_pool {
                    return Err(ConfigError::MultipleDefaultPools {
                        first: first.to_owned(),
                        second: pool.name.clone(),
                    });
                }
                default_pool = Some(&pool.name);
            }
        }

        for (i, rule) in self.aliases.iter().enumerate() {
            if rule.source.is_empty() {
                return Err(ConfigError::EmptyAlias { kind: "source" });
            }
            if rule.alias.is_empty() {
                return Err(ConfigError::EmptyAlias { kind: "alias" });
            }
            if self.aliases[..i].iter().any(|r| r.source == rule.source) {
                return Err(ConfigError::DuplicateAlias { source_name: rule.source.clone() });
            }
        }

        Ok(())
    }
}
