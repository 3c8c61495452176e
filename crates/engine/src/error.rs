//! Error types for configuration loading and the record path.
//!
//! Two disjoint taxonomies exist:
//!
//! - [`ConfigError`] — malformed pool or alias definitions, detected once at
//!   load time and fatal to engine construction. No pool is activated if any
//!   definition is rejected.
//! - [`DropReason`] — why an individual observation was not recorded. These
//!   are soft failures: the observation is dropped, every counter already
//!   present keeps working, and nothing is surfaced to the end user.

use thiserror::Error;

/// Result type alias for configuration validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors detected while validating an [`EngineConfig`](crate::EngineConfig).
///
/// All variants are produced before any counter table is touched, so a
/// rejected configuration never leaves partially-activated state behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A pool name appears more than once.
    #[error("duplicate pool name \"{name}\"")]
    DuplicatePool {
        /// The offending pool name.
        name: String,
    },

    /// A pool has an empty name.
    #[error("pool name must not be empty")]
    EmptyPoolName,

    /// A pool uses a name with special meaning to the configuration surface.
    #[error("pool name \"{name}\" is reserved")]
    ReservedPoolName {
        /// The offending pool name.
        name: String,
    },

    /// More than one pool is marked as the default.
    #[error("multiple default pools: \"{first}\" and \"{second}\"")]
    MultipleDefaultPools {
        /// The pool first marked as default.
        first: String,
        /// The pool that tried to claim the default slot afterwards.
        second: String,
    },

    /// A latency-edge list is not strictly ascending.
    #[error("pool \"{pool}\": latency edges must be strictly ascending")]
    EdgesNotAscending {
        /// The pool whose edge list was rejected.
        pool: String,
    },

    /// A status code or latency edge lies outside its permitted range.
    #[error("pool \"{pool}\": {kind} value {value} out of range {min}..={max}")]
    ValueOutOfRange {
        /// The pool whose list was rejected.
        pool: String,
        /// Which list the value belongs to (`"status"` or `"latency"`).
        kind: &'static str,
        /// The rejected value.
        value: u64,
        /// Lower bound, inclusive.
        min: u64,
        /// Upper bound, inclusive.
        max: u64,
    },

    /// A bucket list exceeds the fixed table layout capacity.
    #[error("pool \"{pool}\": {kind} list exceeds {max} entries")]
    ListTooLong {
        /// The pool whose list was rejected.
        pool: String,
        /// Which list overflowed (`"status"` or `"latency"`).
        kind: &'static str,
        /// Maximum number of entries, including the total/overflow bucket.
        max: usize,
    },

    /// The quantile-target list is malformed.
    #[error("pool \"{pool}\": invalid quantile targets ({reason})")]
    InvalidQuantiles {
        /// The pool whose targets were rejected.
        pool: String,
        /// What the list violated.
        reason: &'static str,
    },

    /// The moving-average window is too small to be meaningful.
    #[error("pool \"{pool}\": avg_window must be at least 2, got {value}")]
    AvgWindowTooSmall {
        /// The pool whose window was rejected.
        pool: String,
        /// The rejected window size.
        value: u32,
    },

    /// An alias rule has an empty source or replacement.
    #[error("alias rule with empty {kind}")]
    EmptyAlias {
        /// Which side of the rule is empty (`"source"` or `"alias"`).
        kind: &'static str,
    },

    /// The same source name is aliased more than once.
    #[error("duplicate alias for source \"{source_name}\"")]
    DuplicateAlias {
        /// The source name mapped twice.
        source_name: String,
    },
}

impl ConfigError {
    /// Creates a `DuplicatePool` error.
    #[must_use]
    pub fn duplicate_pool(name: impl Into<String>) -> Self {
        Self::DuplicatePool { name: name.into() }
    }

    /// Creates a `ReservedPoolName` error.
    #[must_use]
    pub fn reserved_pool_name(name: impl Into<String>) -> Self {
        Self::ReservedPoolName { name: name.into() }
    }

    /// Creates an `InvalidQuantiles` error.
    #[must_use]
    pub fn invalid_quantiles(pool: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidQuantiles { pool: pool.into(), reason }
    }
}

/// Why an individual observation was dropped instead of recorded.
///
/// All of these are expected runtime conditions, not defects in the engine:
/// the record path reports them to the facade, which traces them at debug
/// level and moves on. `StatusOutOfRange` additionally signals a precondition
/// violation in the *caller* — the observation is rejected before any counter
/// is mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DropReason {
    /// No free slot remains and the name did not match an existing counter.
    #[error("counter table full ({capacity} slots)")]
    TableFull {
        /// The table's fixed slot capacity.
        capacity: usize,
    },

    /// The counter name does not fit the fixed slot layout.
    #[error("counter name longer than {max} bytes")]
    NameTooLong {
        /// Maximum name length in bytes, exclusive.
        max: usize,
    },

    /// The status code lies outside `100..=599`.
    #[error("status code {status} outside 100..=599")]
    StatusOutOfRange {
        /// The rejected status code.
        status: u16,
    },

    /// The pool handle was validated against an older table generation.
    ///
    /// Expected during a live reconfiguration: a writer still bound to the
    /// pre-reload layout must not touch the re-seeded table.
    #[error("stale pool generation (bound {bound}, live {live})")]
    StaleGeneration {
        /// Generation the pool handle was validated against.
        bound: u64,
        /// The table's current generation.
        live: u64,
    },
}
