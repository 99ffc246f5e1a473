//! Step - A single unit of assembly work
//!
//! Each step is handled either by a parameterized motion primitive or by a
//! learned policy checkpoint. The `handler` field decides which.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Free-form primitive parameters (target pose, force, grasp index, ...).
///
/// Their meaning belongs to the primitive library, not to the engine.
pub type PrimitiveParams = serde_json::Map<String, serde_json::Value>;

/// Execution strategy tag on a step.
///
/// Unknown strings are preserved as [`Handler::Unrecognized`] so that a graph
/// written by a newer planner still loads; dispatching such a step fails.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Handler {
    /// Hand-written motion primitive
    #[default]
    Primitive,
    /// Imitation-learning checkpoint replayed open-loop
    Policy,
    /// RL-finetuned checkpoint run closed-loop
    RlFinetune,
    /// Any other value found in the graph
    Unrecognized(String),
}

impl Handler {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Primitive => "primitive",
            Self::Policy => "policy",
            Self::RlFinetune => "rl_finetune",
            Self::Unrecognized(other) => other,
        }
    }
}

impl From<String> for Handler {
    fn from(value: String) -> Self {
        match value.as_str() {
            "primitive" => Self::Primitive,
            "policy" => Self::Policy,
            "rl_finetune" => Self::RlFinetune,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<&str> for Handler {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Handler> for String {
    fn from(handler: Handler) -> Self {
        match handler {
            Handler::Unrecognized(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_position_tolerance() -> f64 {
    0.005
}

fn default_min_confidence() -> f64 {
    0.5
}

/// How to decide that a step physically succeeded.
///
/// Closed union: an unknown `type` is rejected when the graph is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SuccessCriteria {
    /// End-effector position check
    Position {
        /// Expected final position, if known
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<Vec<f64>>,
        /// Maximum per-axis error in meters
        #[serde(default = "default_position_tolerance")]
        tolerance: f64,
    },
    /// Contact force must reach a threshold
    ForceThreshold {
        /// Minimum force in newtons
        threshold: f64,
    },
    /// Force profile must match a named signature ("snap_fit", "meshing")
    ForceSignature {
        /// Signature name
        pattern: String,
    },
    /// Learned outcome classifier
    Classifier {
        /// Classifier model reference
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
        /// Minimum confidence to accept
        #[serde(rename = "minConfidence", alias = "min_confidence", default = "default_min_confidence")]
        min_confidence: f64,
    },
}

impl SuccessCriteria {
    /// Criteria kind as written in the graph
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Position { .. } => "position",
            Self::ForceThreshold { .. } => "force_threshold",
            Self::ForceSignature { .. } => "force_signature",
            Self::Classifier { .. } => "classifier",
        }
    }
}

impl Default for SuccessCriteria {
    fn default() -> Self {
        Self::Position {
            target: None,
            tolerance: default_position_tolerance(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

/// A single step in an assembly sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyStep {
    /// Unique step identifier (e.g. "step_001")
    pub id: String,
    /// Human-readable description
    pub name: String,
    /// Parts involved in this step
    #[serde(default)]
    pub part_ids: Vec<String>,
    /// Planner-resolved dependencies (informational, never re-checked at runtime)
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Execution strategy
    #[serde(default)]
    pub handler: Handler,
    /// Primitive name when handler is primitive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primitive_type: Option<String>,
    /// Primitive parameters when handler is primitive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primitive_params: Option<PrimitiveParams>,
    /// Checkpoint reference when handler is policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
    /// Verification criteria
    #[serde(default)]
    pub success_criteria: SuccessCriteria,
    /// Retry attempts before escalating to a human
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl AssemblyStep {
    /// Create a step with the given handler and default settings
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, handler: impl Into<Handler>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            part_ids: Vec::new(),
            dependencies: Vec::new(),
            handler: handler.into(),
            primitive_type: None,
            primitive_params: None,
            policy_id: None,
            success_criteria: SuccessCriteria::default(),
            max_retries: default_max_retries(),
        }
    }

    /// Create a primitive step
    #[must_use]
    pub fn primitive(
        id: impl Into<String>,
        name: impl Into<String>,
        primitive_type: impl Into<String>,
    ) -> Self {
        let mut step = Self::new(id, name, Handler::Primitive);
        step.primitive_type = Some(primitive_type.into());
        step
    }

    /// Set the retry budget
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the success criteria
    #[must_use]
    pub fn with_criteria(mut self, criteria: SuccessCriteria) -> Self {
        self.success_criteria = criteria;
        self
    }

    /// Set primitive parameters
    #[must_use]
    pub fn with_params(mut self, params: PrimitiveParams) -> Self {
        self.primitive_params = Some(params);
        self
    }

    /// Add an involved part
    #[must_use]
    pub fn with_part(mut self, part_id: impl Into<String>) -> Self {
        self.part_ids.push(part_id.into());
        self
    }

    /// Total dispatch attempts before escalation
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}
