//! Learned outcome classifier seam

use async_trait::async_trait;
use aura_assembly::AssemblyStep;
use aura_core::{ExecutionData, VerificationError};

/// Scores how likely an attempt actually succeeded
///
/// Implementations read the model reference from the step's classifier
/// criteria themselves.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OutcomeClassifier: Send + Sync {
    /// Probability of success in `0.0..=1.0`
    async fn classify(
        &self,
        step: &AssemblyStep,
        data: &ExecutionData,
    ) -> Result<f64, VerificationError>;
}
