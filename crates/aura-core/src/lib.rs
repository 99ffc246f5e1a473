//! AURA Core - Assembly execution engine
//!
//! This crate drives a robot through an assembly graph, including:
//! - Sequencer: step-by-step state machine with retries, pause and human escalation
//! - Router: per-step dispatch to motion primitives, policies or RL agents
//! - Session: single owner of the active run
//! - Event bus: fan-out of execution state to any number of observers
//! - Collaborator contracts: robot, primitives, policy loaders, verifier, analytics

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod analytics;
pub mod error;
pub mod event_bus;
pub mod router;
pub mod sequencer;
pub mod session;
pub mod types;
pub mod verification;

pub use analytics::{AnalyticsError, AnalyticsStore, StepAttemptRecord};
pub use error::{format_error_for_cli, Error, Result, UserFriendlyError};
pub use event_bus::{EventBus, ExecutionEvent};
pub use router::{
    Action, Observation, Policy, PolicyError, PolicyLoader, PolicyRouter, PrimitiveError,
    PrimitiveLibrary, PrimitiveOutcome, RlAgent, RlLoader, Robot, RobotError, RouterConfig,
};
pub use sequencer::{
    CommandOutcome, HumanFailurePolicy, Sequencer, SequencerConfig, SequencerState, StateCallback,
};
pub use session::{ExecutionSession, SessionError};
pub use types::{
    ExecutionState, HandlerUsed, Phase, StepResult, StepRuntimeState, StepStatus,
};
pub use verification::{ExecutionData, StepVerifier, VerificationError, VerificationResult};
