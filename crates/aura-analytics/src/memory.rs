//! In-memory analytics store
//!
//! Keeps every attempt in process memory; everything is lost on exit.

use crate::metrics::StepMetrics;
use async_trait::async_trait;
use aura_core::{AnalyticsError, AnalyticsStore, StepAttemptRecord};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Analytics store backed by a vector of attempts
#[derive(Clone, Default)]
pub struct MemoryAnalyticsStore {
    records: Arc<RwLock<Vec<StepAttemptRecord>>>,
}

impl MemoryAnalyticsStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every attempt recorded for `assembly_id`, in recording order
    pub async fn records(&self, assembly_id: &str) -> Vec<StepAttemptRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.assembly_id == assembly_id)
            .cloned()
            .collect()
    }

    /// Metrics for one step
    pub async fn get_step_metrics(&self, assembly_id: &str, step_id: &str) -> StepMetrics {
        let records = self.records.read().await;
        StepMetrics::from_records(
            step_id,
            records
                .iter()
                .filter(|r| r.assembly_id == assembly_id && r.step_id == step_id),
        )
    }

    /// Metrics for every step in `step_order`, in that order
    pub async fn get_step_metrics_for(
        &self,
        assembly_id: &str,
        step_order: &[String],
    ) -> Vec<StepMetrics> {
        let mut metrics = Vec::with_capacity(step_order.len());
        for step_id in step_order {
            metrics.push(self.get_step_metrics(assembly_id, step_id).await);
        }
        metrics
    }
}

#[async_trait]
impl AnalyticsStore for MemoryAnalyticsStore {
    async fn record_step_result(&self, record: StepAttemptRecord) -> Result<(), AnalyticsError> {
        debug!(
            assembly_id = %record.assembly_id,
            step_id = %record.step_id,
            success = record.success,
            attempt = record.attempt,
            "Step attempt recorded in memory"
        );
        self.records.write().await.push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_and_query() {
        let store = MemoryAnalyticsStore::new();
        store
            .record_step_result(StepAttemptRecord::new("gearbox", "s1", false, 120.0, 1))
            .await
            .unwrap();
        store
            .record_step_result(StepAttemptRecord::new("gearbox", "s1", true, 80.0, 2))
            .await
            .unwrap();
        store
            .record_step_result(StepAttemptRecord::new("other", "s1", true, 10.0, 1))
            .await
            .unwrap();

        let metrics = store.get_step_metrics("gearbox", "s1").await;
        assert_eq!(metrics.total_attempts, 2);
        assert!((metrics.success_rate - 0.5).abs() < f64::EPSILON);
        assert!((metrics.avg_duration_ms - 100.0).abs() < f64::EPSILON);
        assert_eq!(store.records("gearbox").await.len(), 2);
    }

    #[tokio::test]
    async fn test_metrics_follow_step_order() {
        let store = MemoryAnalyticsStore::new();
        store
            .record_step_result(StepAttemptRecord::new("gearbox", "s2", true, 50.0, 1))
            .await
            .unwrap();

        let order = vec!["s1".to_string(), "s2".to_string()];
        let metrics = store.get_step_metrics_for("gearbox", &order).await;

        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0], StepMetrics::empty("s1"));
        assert_eq!(metrics[1].total_attempts, 1);
    }
}
