//! Router - Per-step dispatch
//!
//! Routes each assembly step to the strategy its handler names and folds
//! every failure into a [`StepResult`](crate::types::StepResult).
//!
//! # Module Structure
//!
//! - `traits`: Collaborator contracts (robot, primitives, policy and RL loaders)
//! - `config`: Control-loop timing (`RouterConfig`)
//! - `core`: `PolicyRouter` and the three dispatch paths

mod config;
mod core;
mod traits;


pub use config::RouterConfig;
pub use core::PolicyRouter;
pub use traits::{
    Action, Observation, Policy, PolicyError, PolicyLoader, PrimitiveError, PrimitiveLibrary,
    PrimitiveOutcome, RlAgent, RlLoader, Robot, RobotError,
};
