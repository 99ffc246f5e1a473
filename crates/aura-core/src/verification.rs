//! Verification contract - second opinion on a successful dispatch

use crate::types::StepResult;
use async_trait::async_trait;
use aura_assembly::AssemblyStep;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Telemetry handed to the verifier after a successful dispatch
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionData {
    /// Final end-effector position
    pub final_position: Option<Vec<f64>>,
    /// Per-tick force magnitude
    pub force_history: Vec<f64>,
    /// Peak force reported by the handler
    pub peak_force: Option<f64>,
    /// Last force magnitude, 0 when there is no history
    pub final_force: f64,
    /// Attempt duration
    pub duration_ms: f64,
}

impl From<&StepResult> for ExecutionData {
    fn from(result: &StepResult) -> Self {
        let magnitudes = result.force_magnitudes();
        let final_force = magnitudes.last().copied().unwrap_or(0.0);
        Self {
            final_position: result.actual_position.clone(),
            force_history: magnitudes,
            peak_force: result.actual_force,
            final_force,
            duration_ms: result.duration_ms,
        }
    }
}

/// Verifier verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Whether the step is considered done
    pub passed: bool,
    /// Confidence in the verdict, 0..=1
    pub confidence: f64,
    /// Human-readable explanation
    pub detail: String,
}

impl VerificationResult {
    /// Passing verdict
    #[must_use]
    pub fn pass(confidence: f64, detail: impl Into<String>) -> Self {
        Self {
            passed: true,
            confidence,
            detail: detail.into(),
        }
    }

    /// Failing verdict
    #[must_use]
    pub fn fail(confidence: f64, detail: impl Into<String>) -> Self {
        Self {
            passed: false,
            confidence,
            detail: detail.into(),
        }
    }
}

/// The verifier itself broke; the run moves to its error state
#[derive(Debug, Error)]
pub enum VerificationError {
    /// A checker could not evaluate its criteria
    #[error("checker '{checker}' failed: {message}")]
    Checker {
        /// Criteria kind
        checker: String,
        /// Failure detail
        message: String,
    },

    /// Outcome classifier is unavailable
    #[error("classifier unavailable: {0}")]
    Classifier(String),
}

/// Independent check of a step's physical outcome
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StepVerifier: Send + Sync {
    /// Decide whether `step` met its success criteria
    async fn verify(
        &self,
        step: &AssemblyStep,
        data: &ExecutionData,
    ) -> Result<VerificationResult, VerificationError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HandlerUsed;

    #[test]
    fn test_execution_data_from_result() {
        let mut result = StepResult::success(HandlerUsed::Primitive, 120.0);
        result.actual_force = Some(4.2);
        result.actual_position = Some(vec![0.3, 0.0, 0.05]);
        result.force_history = vec![vec![1.0, -3.0], vec![0.5, 0.25]];

        let data = ExecutionData::from(&result);
        assert_eq!(data.force_history, vec![3.0, 0.5]);
        assert_eq!(data.final_force, 0.5);
        assert_eq!(data.peak_force, Some(4.2));
        assert_eq!(data.final_position, Some(vec![0.3, 0.0, 0.05]));
        assert_eq!(data.duration_ms, 120.0);
    }

    #[test]
    fn test_execution_data_without_history() {
        let result = StepResult::success(HandlerUsed::Policy, 5.0);
        let data = ExecutionData::from(&result);

        assert!(data.force_history.is_empty());
        assert_eq!(data.final_force, 0.0);
        assert!(data.peak_force.is_none());
    }
}
