//! Online SLA statistics engine.
//!
//! Observes a stream of `(latency, status code)` events produced by a
//! request-serving pipeline and maintains, per configured pool, a bounded
//! set of per-source counters: status-code histograms, latency histograms
//! with cumulative totals, running and moving averages, and streaming
//! quantile estimates computed without storing the sample stream.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Host process                          │
//! │   (request pipeline, exposition endpoint, reload driver)    │
//! ├─────────────────────────────────────────────────────────────┤
//! │                         Engine                              │
//! │        record / report / purge, alias translation           │
//! ├──────────────────────┬──────────────────────────────────────┤
//! │        Pool          │             Pool                     │
//! │  config + lock +     │   (independent lock, independent     │
//! │  bound generation    │    counter table)                    │
//! ├──────────────────────┴──────────────────────────────────────┤
//! │                      SharedArena                            │
//! │     named table segments, lifetime spans engine rebuilds    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use slastat_engine::{Engine, EngineConfig, PoolConfig, SharedArena};
//!
//! let arena = SharedArena::new();
//! let config = EngineConfig::builder()
//!     .pools(vec![PoolConfig::builder()
//!         .name("main")
//!         .latency_edges(vec![100, 300, 1000])
//!         .is_default(true)
//!         .build()])
//!     .build();
//!
//! let engine = Engine::new(config, &arena)?;
//! engine.record(Some("main"), "backend", 200, 87);
//! engine.record(Some("main"), "backend", 503, 1450);
//!
//! let report = engine.report(None);
//! assert!(report.contains("main.backend.http_5xx = 1"));
//! # Ok::<(), slastat_engine::ConfigError>(())
//! ```
//!
//! # Reloading configuration
//!
//! The arena outlives any one `Engine`. To apply a new configuration, build
//! a new `Engine` over the same arena: pools whose bucket layout is
//! unchanged keep their data; pools whose layout changed get a zeroed,
//! re-seeded table with a bumped generation. An old `Engine` still holding
//! pre-reload pool handles keeps running safely — its writes and reports
//! become no-ops the moment the generation moves on.
//!
//! # Concurrency
//!
//! The engine has no threads of its own; every operation runs on the
//! caller's thread. One mutex per pool serializes all access to that pool's
//! table; distinct pools proceed fully independently. All critical sections
//! are bounded by the fixed table capacity.
//!
//! # Error Handling
//!
//! Configuration errors ([`ConfigError`]) are detected once, at
//! [`Engine::new`], and fatal to construction. Everything that can go wrong
//! per observation (table full, oversized name, out-of-range status, stale
//! generation) is a soft [`DropReason`]: the observation is dropped, traced
//! at debug level, and invisible to the request that produced it.

#![deny(unsafe_code)]

pub mod arena;
pub mod config;
pub mod counter;
pub mod engine;
pub mod error;
pub mod pool;
pub mod quantile;
mod reconfig;
mod report;
pub mod table;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;

// Re-export primary types at crate root for convenience.
pub use arena::SharedArena;
pub use config::{
    AGGREGATE_COUNTER, AliasRule, EngineConfig, LatencyBucket, MAX_COUNTERS,
    MAX_LATENCY_BUCKETS, MAX_NAME_LEN, MAX_STATUS_BUCKETS, PoolConfig, QUANTILE_COUNT,
    TableLayout,
};
pub use counter::Counter;
pub use engine::{Engine, PURGE_ACK};
pub use error::{ConfigError, ConfigResult, DropReason};
pub use pool::{CounterSnapshot, Pool, PoolSnapshot};
pub use quantile::{BOOTSTRAP_LEN, LEARN_RATE, QuantileEstimator};
pub use table::CounterTable;
