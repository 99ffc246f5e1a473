//! Analytics contract - one record per step attempt

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Analytics failure
///
/// The sequencer logs these and carries on.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Storage backend failed
    #[error("analytics storage error: {0}")]
    Storage(String),

    /// Record could not be encoded or decoded
    #[error("analytics serialization error: {0}")]
    Serialization(String),
}

/// One dispatch attempt or human resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepAttemptRecord {
    /// Assembly the step belongs to
    pub assembly_id: String,
    /// Step identifier
    pub step_id: String,
    /// Attempt outcome
    pub success: bool,
    /// Attempt duration
    pub duration_ms: f64,
    /// Attempt number, 1-based
    pub attempt: u32,
    /// Whether the attempt was simulated
    #[serde(default)]
    pub demo: bool,
    /// When the attempt was recorded
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl StepAttemptRecord {
    /// Create a record stamped now
    #[must_use]
    pub fn new(
        assembly_id: impl Into<String>,
        step_id: impl Into<String>,
        success: bool,
        duration_ms: f64,
        attempt: u32,
    ) -> Self {
        Self {
            assembly_id: assembly_id.into(),
            step_id: step_id.into(),
            success,
            duration_ms,
            attempt,
            demo: false,
            timestamp: Utc::now(),
        }
    }

    /// Mark the record as coming from demo mode
    #[must_use]
    pub fn with_demo(mut self, demo: bool) -> Self {
        self.demo = demo;
        self
    }
}

/// Sink for per-attempt step outcomes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// Persist one attempt
    async fn record_step_result(&self, record: StepAttemptRecord) -> Result<(), AnalyticsError>;
}
