//! Backend selection from configuration

use crate::memory::MemoryAnalyticsStore;
use crate::metrics::StepMetrics;
use crate::sqlite::{SqliteAnalyticsStore, DATABASE_FILE};
use async_trait::async_trait;
use aura_core::{AnalyticsError, AnalyticsStore, StepAttemptRecord};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Analytics backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsBackendConfig {
    /// Backend type: "sqlite" (default) or "memory"
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Directory holding the SQLite database
    #[serde(default = "default_dir")]
    pub dir: PathBuf,
}

fn default_backend() -> String {
    "sqlite".to_string()
}

fn default_dir() -> PathBuf {
    PathBuf::from("data").join("analytics")
}

impl Default for AnalyticsBackendConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            dir: default_dir(),
        }
    }
}

/// Analytics store chosen at startup
pub enum AnalyticsBackend {
    /// SQLite storage (default)
    Sqlite(SqliteAnalyticsStore),
    /// In-memory storage
    Memory(MemoryAnalyticsStore),
}

impl AnalyticsBackend {
    /// Create a backend from configuration
    pub async fn from_config(config: &AnalyticsBackendConfig) -> Result<Self, AnalyticsError> {
        match config.backend.as_str() {
            "sqlite" => {
                let store = SqliteAnalyticsStore::new(config.dir.join(DATABASE_FILE)).await?;
                Ok(Self::Sqlite(store))
            }
            "memory" => Ok(Self::Memory(MemoryAnalyticsStore::new())),
            other => Err(AnalyticsError::Storage(format!(
                "Unknown analytics backend: '{}'. Use 'sqlite' or 'memory'.",
                other
            ))),
        }
    }

    /// Backend name
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::Memory(_) => "memory",
        }
    }

    /// Metrics for every step in `step_order`, in that order
    pub async fn get_step_metrics_for(
        &self,
        assembly_id: &str,
        step_order: &[String],
    ) -> Result<Vec<StepMetrics>, AnalyticsError> {
        match self {
            Self::Sqlite(store) => store.get_step_metrics_for(assembly_id, step_order).await,
            Self::Memory(store) => Ok(store.get_step_metrics_for(assembly_id, step_order).await),
        }
    }
}

#[async_trait]
impl AnalyticsStore for AnalyticsBackend {
    async fn record_step_result(&self, record: StepAttemptRecord) -> Result<(), AnalyticsError> {
        match self {
            Self::Sqlite(store) => store.record_step_result(record).await,
            Self::Memory(store) => store.record_step_result(record).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_from_config_sqlite() {
        let dir = TempDir::new().unwrap();
        let config = AnalyticsBackendConfig {
            backend: "sqlite".to_string(),
            dir: dir.path().to_path_buf(),
        };

        let backend = AnalyticsBackend::from_config(&config).await.unwrap();
        assert_eq!(backend.name(), "sqlite");
        assert!(dir.path().join(DATABASE_FILE).exists());
    }

    #[tokio::test]
    async fn test_from_config_memory_round_trip() {
        let config = AnalyticsBackendConfig {
            backend: "memory".to_string(),
            ..Default::default()
        };
        let backend = AnalyticsBackend::from_config(&config).await.unwrap();

        backend
            .record_step_result(StepAttemptRecord::new("gearbox", "s1", true, 10.0, 1))
            .await
            .unwrap();
        let metrics = backend
            .get_step_metrics_for("gearbox", &["s1".to_string()])
            .await
            .unwrap();
        assert_eq!(metrics[0].total_attempts, 1);
    }

    #[tokio::test]
    async fn test_unknown_backend() {
        let config = AnalyticsBackendConfig {
            backend: "redis".to_string(),
            ..Default::default()
        };
        let err = AnalyticsBackend::from_config(&config).await.err().unwrap();
        assert!(err.to_string().contains("Unknown analytics backend"));
    }
}
