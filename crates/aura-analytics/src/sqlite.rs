//! SQLite analytics storage backend
//!
//! One row per step attempt in a `step_attempts` table. Metrics are computed
//! on read.
//!
//! # Usage
//!
//! ```no_run
//! use aura_analytics::SqliteAnalyticsStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Default location: ~/.aura/analytics/analytics.db
//! let store = SqliteAnalyticsStore::new_default().await?;
//!
//! let metrics = store.get_step_metrics("gearbox", "s1").await?;
//! println!("{:.0}% success", metrics.success_rate * 100.0);
//! # Ok(())
//! # }
//! ```

use crate::metrics::StepMetrics;
use async_trait::async_trait;
use aura_core::{AnalyticsError, AnalyticsStore, StepAttemptRecord};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// Database file name inside the analytics directory
pub const DATABASE_FILE: &str = "analytics.db";

type Row = (String, String, bool, f64, i64, bool, i64);

/// SQLite analytics store
pub struct SqliteAnalyticsStore {
    pool: SqlitePool,
}

impl SqliteAnalyticsStore {
    /// Open or create the database at `path`
    ///
    /// # Errors
    ///
    /// Returns error if database creation or schema setup fails.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self, AnalyticsError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AnalyticsError::Storage(format!("Failed to create analytics directory: {}", e))
            })?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| AnalyticsError::Storage(format!("Invalid SQLite path: {}", e)))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| AnalyticsError::Storage(format!("Failed to connect to SQLite: {}", e)))?;

        let store = Self { pool };
        store.init_schema().await?;

        info!(path = %path.display(), "SQLite analytics store initialized");
        Ok(store)
    }

    /// Open the database inside `dir`
    pub async fn in_dir(dir: impl AsRef<Path>) -> Result<Self, AnalyticsError> {
        Self::new(dir.as_ref().join(DATABASE_FILE)).await
    }

    /// Open the store at the default location (~/.aura/analytics/analytics.db)
    pub async fn new_default() -> Result<Self, AnalyticsError> {
        let path = Self::default_path()?;
        Self::new(&path).await
    }

    /// Default database path
    pub fn default_path() -> Result<PathBuf, AnalyticsError> {
        let home = dirs::home_dir().ok_or_else(|| {
            AnalyticsError::Storage("Could not determine home directory".to_string())
        })?;
        Ok(home.join(".aura").join("analytics").join(DATABASE_FILE))
    }

    async fn init_schema(&self) -> Result<(), AnalyticsError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS step_attempts (
                id TEXT PRIMARY KEY,
                assembly_id TEXT NOT NULL,
                step_id TEXT NOT NULL,
                success INTEGER NOT NULL,
                duration_ms REAL NOT NULL,
                attempt INTEGER NOT NULL,
                demo INTEGER NOT NULL DEFAULT 0,
                recorded_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AnalyticsError::Storage(format!("Failed to create step_attempts table: {}", e)))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_step_attempts_step
                ON step_attempts(assembly_id, step_id, recorded_at)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AnalyticsError::Storage(format!("Failed to create index: {}", e)))?;

        debug!("SQLite analytics schema initialized");
        Ok(())
    }

    /// Every attempt of one step, in recording order
    pub async fn step_records(
        &self,
        assembly_id: &str,
        step_id: &str,
    ) -> Result<Vec<StepAttemptRecord>, AnalyticsError> {
        let rows: Vec<Row> = sqlx::query_as(
            r#"
            SELECT assembly_id, step_id, success, duration_ms, attempt, demo, recorded_at
            FROM step_attempts
            WHERE assembly_id = ? AND step_id = ?
            ORDER BY recorded_at ASC, rowid ASC
            "#,
        )
        .bind(assembly_id)
        .bind(step_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AnalyticsError::Storage(format!("Failed to load step attempts: {}", e)))?;

        rows.into_iter().map(into_record).collect()
    }

    /// Metrics for one step
    pub async fn get_step_metrics(
        &self,
        assembly_id: &str,
        step_id: &str,
    ) -> Result<StepMetrics, AnalyticsError> {
        let records = self.step_records(assembly_id, step_id).await?;
        Ok(StepMetrics::from_records(step_id, &records))
    }

    /// Metrics for every step in `step_order`, in that order
    pub async fn get_step_metrics_for(
        &self,
        assembly_id: &str,
        step_order: &[String],
    ) -> Result<Vec<StepMetrics>, AnalyticsError> {
        let mut metrics = Vec::with_capacity(step_order.len());
        for step_id in step_order {
            metrics.push(self.get_step_metrics(assembly_id, step_id).await?);
        }
        Ok(metrics)
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<bool, AnalyticsError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AnalyticsError::Storage(format!("Health check failed: {}", e)))?;
        Ok(true)
    }
}

fn into_record(row: Row) -> Result<StepAttemptRecord, AnalyticsError> {
    let (assembly_id, step_id, success, duration_ms, attempt, demo, recorded_at) = row;

    let attempt = u32::try_from(attempt)
        .map_err(|_| AnalyticsError::Serialization(format!("Invalid attempt number: {}", attempt)))?;
    let timestamp = DateTime::<Utc>::from_timestamp_millis(recorded_at).ok_or_else(|| {
        AnalyticsError::Serialization(format!("Invalid timestamp: {}", recorded_at))
    })?;

    Ok(StepAttemptRecord {
        assembly_id,
        step_id,
        success,
        duration_ms,
        attempt,
        demo,
        timestamp,
    })
}

#[async_trait]
impl AnalyticsStore for SqliteAnalyticsStore {
    async fn record_step_result(&self, record: StepAttemptRecord) -> Result<(), AnalyticsError> {
        sqlx::query(
            r#"
            INSERT INTO step_attempts
                (id, assembly_id, step_id, success, duration_ms, attempt, demo, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&record.assembly_id)
        .bind(&record.step_id)
        .bind(record.success)
        .bind(record.duration_ms)
        .bind(i64::from(record.attempt))
        .bind(record.demo)
        .bind(record.timestamp.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| AnalyticsError::Storage(format!("Failed to record step attempt: {}", e)))?;

        debug!(
            assembly_id = %record.assembly_id,
            step_id = %record.step_id,
            success = record.success,
            attempt = record.attempt,
            "Step attempt saved to SQLite"
        );
        Ok(())
    }
}
