//! Sequencer - Assembly execution state machine
//!
//! Walks the graph's step order, dispatching each step through the
//! [`PolicyRouter`](crate::router::PolicyRouter), retrying with a fixed
//! backoff and handing the step to a human once retries run out.
//!
//! # Module Structure
//!
//! - `state`: `SequencerState` and its atomic cell
//! - `config`: `SequencerConfig`, `HumanFailurePolicy`
//! - `runtime`: run bookkeeping, pause gate, human channel, snapshots
//! - `core`: `Sequencer` struct and the command surface
//! - `run_loop`: the spawned run task

mod config;
mod core;
mod run_loop;
mod runtime;
mod state;


use crate::types::ExecutionState;
use std::sync::Arc;

pub use config::{HumanFailurePolicy, SequencerConfig};
pub use core::{CommandOutcome, Sequencer};
pub use state::SequencerState;

/// Observer invoked with a fresh snapshot on every transition.
///
/// Called synchronously on the transition path, sometimes while a command
/// holds the sequencer's control lock, so it must not call back into the
/// sequencer's commands. Errors are logged and dropped.
pub type StateCallback = Arc<dyn Fn(&ExecutionState) -> anyhow::Result<()> + Send + Sync>;
