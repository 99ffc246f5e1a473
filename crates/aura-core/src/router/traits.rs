//! Collaborator contracts used by the router
//!
//! Implementations live outside this crate: hardware drivers, the primitive
//! library and checkpoint loaders.

use async_trait::async_trait;
use aura_assembly::PrimitiveParams;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Joint/sensor name to value
pub type Observation = BTreeMap<String, f64>;

/// Joint name to command value
pub type Action = BTreeMap<String, f64>;

/// Robot communication failure
#[derive(Debug, Error)]
pub enum RobotError {
    /// No hardware attached
    #[error("robot not connected")]
    NotConnected,

    /// Bus or driver error
    #[error("{0}")]
    Communication(String),
}

/// Connected follower arm
///
/// Exclusively used by the active run; calls are short and blocking.
#[cfg_attr(test, mockall::automock)]
pub trait Robot: Send + Sync {
    /// Read the current joint state
    fn get_observation(&self) -> Result<Observation, RobotError>;

    /// Command joint targets
    fn send_action(&self, action: &Action) -> Result<(), RobotError>;
}

/// What a primitive reports back
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PrimitiveOutcome {
    /// Whether the primitive reached its goal
    pub success: bool,
    /// Failure reason
    pub error_message: Option<String>,
    /// Peak contact force
    pub actual_force: Option<f64>,
    /// Final end-effector position
    pub actual_position: Option<Vec<f64>>,
    /// Per-tick, per-joint force samples
    pub force_history: Vec<Vec<f64>>,
}

impl PrimitiveOutcome {
    /// Bare success
    #[must_use]
    pub fn succeeded() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    /// Bare failure
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            ..Default::default()
        }
    }
}

/// Primitive invocation failure
#[derive(Debug, Error)]
pub enum PrimitiveError {
    /// No primitive registered under this name
    #[error("Unknown primitive: {0}")]
    Unknown(String),

    /// Parameters did not fit the primitive
    #[error("Invalid parameters for '{primitive}': {message}")]
    InvalidParams {
        /// Primitive name
        primitive: String,
        /// What was wrong
        message: String,
    },

    /// Robot fault during the motion
    #[error(transparent)]
    Robot(#[from] RobotError),

    /// Any other fault
    #[error("{0}")]
    Failed(String),
}

/// Library of hand-written motion primitives (move_to, pick, place, ...)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PrimitiveLibrary: Send + Sync {
    /// Run the named primitive to completion
    async fn run(
        &self,
        name: &str,
        robot: Arc<dyn Robot>,
        params: Option<PrimitiveParams>,
    ) -> Result<PrimitiveOutcome, PrimitiveError>;
}

/// Policy inference failure
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Robot fault while observing or acting
    #[error(transparent)]
    Robot(#[from] RobotError),

    /// Model failed to produce actions
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Model produced no actions at all
    #[error("Policy produced an empty action chunk")]
    EmptyChunk,
}

/// Imitation-learning checkpoint
#[cfg_attr(test, mockall::automock)]
pub trait Policy: Send + Sync {
    /// Number of ticks one action chunk covers
    fn chunk_size(&self) -> usize;

    /// Joint names matching each action vector, empty to use observation keys
    fn joint_keys(&self) -> Vec<String>;

    /// Predict an action chunk from a single observation
    fn predict(&self, observation: &Observation) -> Result<Vec<Vec<f64>>, PolicyError>;
}

/// Finds a trained checkpoint for a step
#[cfg_attr(test, mockall::automock)]
pub trait PolicyLoader: Send + Sync {
    /// Load the checkpoint for (assembly, step), if one exists
    fn load(&self, assembly_id: &str, step_id: &str) -> Option<Arc<dyn Policy>>;
}

/// RL-finetuned agent run closed-loop
#[cfg_attr(test, mockall::automock)]
pub trait RlAgent: Send + Sync {
    /// Deterministic action for the current observation
    fn select_action(&self, observation: &Observation) -> Result<Action, PolicyError>;
}

/// Finds an RL checkpoint for a step
#[cfg_attr(test, mockall::automock)]
pub trait RlLoader: Send + Sync {
    /// Load the agent for (assembly, step), if one exists
    fn load(&self, assembly_id: &str, step_id: &str) -> Option<Arc<dyn RlAgent>>;
}
