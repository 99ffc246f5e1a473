//! Criteria-driven step verifier

use crate::checks::{check_force_signature, check_force_threshold, check_position};
use crate::classifier::OutcomeClassifier;
use crate::config::VerifierConfig;
use async_trait::async_trait;
use aura_assembly::{AssemblyStep, SuccessCriteria};
use aura_core::{ExecutionData, StepVerifier, VerificationError, VerificationResult};
use std::sync::Arc;
use tracing::{debug, info};

/// Confidence of a classifier criteria pass with no classifier installed
const NO_CLASSIFIER_CONFIDENCE: f64 = 0.5;

/// Routes each step's success criteria to its checker
pub struct CriteriaVerifier {
    config: VerifierConfig,
    classifier: Option<Arc<dyn OutcomeClassifier>>,
}

impl CriteriaVerifier {
    /// Create a verifier
    #[must_use]
    pub fn new(config: VerifierConfig) -> Self {
        Self {
            config,
            classifier: None,
        }
    }

    /// Use `classifier` for classifier criteria
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn OutcomeClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    async fn classify(
        &self,
        step: &AssemblyStep,
        data: &ExecutionData,
        min_confidence: f64,
    ) -> Result<VerificationResult, VerificationError> {
        let Some(classifier) = &self.classifier else {
            debug!(step_id = %step.id, "No classifier installed, passing");
            return Ok(VerificationResult::pass(
                NO_CLASSIFIER_CONFIDENCE,
                "No classifier configured",
            ));
        };

        let probability = classifier.classify(step, data).await?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(VerificationError::Classifier(format!(
                "probability {} out of range",
                probability
            )));
        }

        if probability >= min_confidence {
            Ok(VerificationResult::pass(
                probability,
                format!("Classifier success {:.2} >= {:.2}", probability, min_confidence),
            ))
        } else {
            Ok(VerificationResult::fail(
                1.0 - probability,
                format!("Classifier success {:.2} < {:.2}", probability, min_confidence),
            ))
        }
    }
}

impl Default for CriteriaVerifier {
    fn default() -> Self {
        Self::new(VerifierConfig::default())
    }
}

#[async_trait]
impl StepVerifier for CriteriaVerifier {
    async fn verify(
        &self,
        step: &AssemblyStep,
        data: &ExecutionData,
    ) -> Result<VerificationResult, VerificationError> {
        if self.config.disabled {
            return Ok(VerificationResult::pass(1.0, "Verification disabled"));
        }

        let result = match &step.success_criteria {
            SuccessCriteria::Position { target, tolerance } => {
                check_position(data, target.as_deref(), *tolerance)
            }
            SuccessCriteria::ForceThreshold { threshold } => check_force_threshold(data, *threshold),
            SuccessCriteria::ForceSignature { pattern } => {
                check_force_signature(data, pattern, &self.config.signature)
            }
            SuccessCriteria::Classifier { min_confidence, .. } => {
                self.classify(step, data, *min_confidence).await?
            }
        };

        info!(
            step_id = %step.id,
            criteria = step.success_criteria.kind(),
            passed = result.passed,
            confidence = result.confidence,
            detail = %result.detail,
            "Step verified"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests;
