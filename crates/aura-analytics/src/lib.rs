//! AURA Analytics - Per-step execution metrics
//!
//! Stores one row per step attempt and derives per-step metrics from them:
//! - `SqliteAnalyticsStore`: persistent store, the default backend
//! - `MemoryAnalyticsStore`: in-process store for tests and demo runs
//! - `AnalyticsBackend`: selects one of the two from configuration

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod memory;
mod metrics;
mod sqlite;

pub use backend::{AnalyticsBackend, AnalyticsBackendConfig};
pub use memory::MemoryAnalyticsStore;
pub use metrics::{RunEntry, StepMetrics, RECENT_RUNS_LIMIT};
pub use sqlite::SqliteAnalyticsStore;
