//! AURA Perception - Step outcome verification
//!
//! Re-checks a successful dispatch against the step's success criteria:
//! - Position: final end-effector position against an optional target
//! - Force: peak force thresholds and named force signatures
//! - Classifier: delegated to a pluggable learned model

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod checks;
pub mod classifier;
pub mod config;
pub mod verifier;

pub use classifier::OutcomeClassifier;
pub use config::{SignatureConfig, VerifierConfig};
pub use verifier::CriteriaVerifier;
