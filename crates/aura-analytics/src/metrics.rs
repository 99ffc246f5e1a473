//! Per-step metrics derived from attempt records

use aura_core::StepAttemptRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of most recent attempts kept in [`StepMetrics::recent_runs`]
pub const RECENT_RUNS_LIMIT: usize = 10;

/// One attempt as shown in the recent-runs strip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunEntry {
    /// Attempt outcome
    pub success: bool,
    /// Attempt duration
    pub duration_ms: f64,
    /// When the attempt was recorded
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Aggregated outcome of every recorded attempt of one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepMetrics {
    /// Step identifier
    pub step_id: String,
    /// Successful attempts over all attempts, 0 with no attempts
    pub success_rate: f64,
    /// Mean attempt duration
    pub avg_duration_ms: f64,
    /// Number of recorded attempts
    pub total_attempts: usize,
    /// Attempts that came from demo mode
    pub demo_count: usize,
    /// Up to [`RECENT_RUNS_LIMIT`] latest attempts, newest last
    pub recent_runs: Vec<RunEntry>,
}

impl StepMetrics {
    /// Metrics for a step with no recorded attempts
    #[must_use]
    pub fn empty(step_id: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            success_rate: 0.0,
            avg_duration_ms: 0.0,
            total_attempts: 0,
            demo_count: 0,
            recent_runs: Vec::new(),
        }
    }

    /// Aggregate `records`, which must be in recording order
    #[must_use]
    pub fn from_records<'a>(
        step_id: impl Into<String>,
        records: impl IntoIterator<Item = &'a StepAttemptRecord>,
    ) -> Self {
        let records: Vec<&StepAttemptRecord> = records.into_iter().collect();
        let mut metrics = Self::empty(step_id);
        if records.is_empty() {
            return metrics;
        }

        let total = records.len();
        let successes = records.iter().filter(|r| r.success).count();
        let duration: f64 = records.iter().map(|r| r.duration_ms).sum();

        metrics.total_attempts = total;
        metrics.success_rate = successes as f64 / total as f64;
        metrics.avg_duration_ms = duration / total as f64;
        metrics.demo_count = records.iter().filter(|r| r.demo).count();
        metrics.recent_runs = records[total.saturating_sub(RECENT_RUNS_LIMIT)..]
            .iter()
            .map(|r| RunEntry {
                success: r.success,
                duration_ms: r.duration_ms,
                timestamp: r.timestamp,
            })
            .collect();
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(success: bool, duration_ms: f64) -> StepAttemptRecord {
        StepAttemptRecord::new("gearbox", "s1", success, duration_ms, 1)
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = StepMetrics::from_records("s1", std::iter::empty());
        assert_eq!(metrics, StepMetrics::empty("s1"));
        assert_eq!(metrics.success_rate, 0.0);
    }

    #[test]
    fn test_aggregates() {
        let records = vec![
            record(true, 100.0),
            record(false, 300.0),
            record(true, 200.0).with_demo(true),
            record(true, 400.0),
        ];
        let metrics = StepMetrics::from_records("s1", &records);

        assert_eq!(metrics.total_attempts, 4);
        assert!((metrics.success_rate - 0.75).abs() < f64::EPSILON);
        assert!((metrics.avg_duration_ms - 250.0).abs() < f64::EPSILON);
        assert_eq!(metrics.demo_count, 1);
        assert_eq!(metrics.recent_runs.len(), 4);
    }

    #[test]
    fn test_recent_runs_capped_newest_last() {
        let records: Vec<_> = (0..15).map(|i| record(i % 2 == 0, f64::from(i))).collect();
        let metrics = StepMetrics::from_records("s1", &records);

        assert_eq!(metrics.total_attempts, 15);
        assert_eq!(metrics.recent_runs.len(), RECENT_RUNS_LIMIT);
        assert_eq!(metrics.recent_runs[0].duration_ms, 5.0);
        assert_eq!(metrics.recent_runs[9].duration_ms, 14.0);
    }

    #[test]
    fn test_serializes_camel_case() {
        let metrics = StepMetrics::from_records("s1", &[record(true, 12.5)]);
        let json = serde_json::to_value(&metrics).unwrap();

        assert_eq!(json["stepId"], "s1");
        assert_eq!(json["successRate"], 1.0);
        assert_eq!(json["avgDurationMs"], 12.5);
        assert_eq!(json["totalAttempts"], 1);
        assert_eq!(json["demoCount"], 0);
        assert_eq!(json["recentRuns"][0]["durationMs"], 12.5);
        assert!(json["recentRuns"][0]["timestamp"].is_i64());
    }
}
