//! Shared execution types: step results and the observable execution state

use aura_assembly::Handler;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Which strategy actually produced a [`StepResult`]
///
/// Differs from the step's [`Handler`] when the RL path falls back to the
/// plain policy, or when demo mode short-circuits dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HandlerUsed {
    /// Motion primitive
    Primitive,
    /// Open-loop policy replay
    Policy,
    /// Closed-loop RL agent
    RlFinetune,
    /// Simulated success in demo mode
    Demo,
    /// Handler string the router did not understand
    Unrecognized(String),
}

impl HandlerUsed {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Primitive => "primitive",
            Self::Policy => "policy",
            Self::RlFinetune => "rl_finetune",
            Self::Demo => "demo",
            Self::Unrecognized(other) => other,
        }
    }
}

impl From<&Handler> for HandlerUsed {
    fn from(handler: &Handler) -> Self {
        match handler {
            Handler::Primitive => Self::Primitive,
            Handler::Policy => Self::Policy,
            Handler::RlFinetune => Self::RlFinetune,
            Handler::Unrecognized(other) => Self::Unrecognized(other.clone()),
        }
    }
}

impl From<String> for HandlerUsed {
    fn from(value: String) -> Self {
        match value.as_str() {
            "primitive" => Self::Primitive,
            "policy" => Self::Policy,
            "rl_finetune" => Self::RlFinetune,
            "demo" => Self::Demo,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<HandlerUsed> for String {
    fn from(handler: HandlerUsed) -> Self {
        match handler {
            HandlerUsed::Unrecognized(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for HandlerUsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one dispatch attempt
///
/// Built fresh for every attempt and never mutated afterwards; a
/// verification override produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    /// Whether the step succeeded
    pub success: bool,
    /// Wall time of the attempt
    pub duration_ms: f64,
    /// Strategy that ran
    pub handler_used: HandlerUsed,
    /// Failure reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Peak contact force
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_force: Option<f64>,
    /// Final end-effector position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_position: Option<Vec<f64>>,
    /// Per-tick, per-joint force samples
    #[serde(default)]
    pub force_history: Vec<Vec<f64>>,
}

impl StepResult {
    /// Successful result with no telemetry
    #[must_use]
    pub fn success(handler_used: HandlerUsed, duration_ms: f64) -> Self {
        Self {
            success: true,
            duration_ms,
            handler_used,
            error_message: None,
            actual_force: None,
            actual_position: None,
            force_history: Vec::new(),
        }
    }

    /// Failed result carrying a reason
    #[must_use]
    pub fn failure(handler_used: HandlerUsed, duration_ms: f64, message: impl Into<String>) -> Self {
        Self {
            success: false,
            duration_ms,
            handler_used,
            error_message: Some(message.into()),
            actual_force: None,
            actual_position: None,
            force_history: Vec::new(),
        }
    }

    /// Per-tick force magnitude: the largest absolute joint value in each tick
    #[must_use]
    pub fn force_magnitudes(&self) -> Vec<f64> {
        self.force_history
            .iter()
            .map(|tick| tick.iter().fold(0.0_f64, |peak, v| peak.max(v.abs())))
            .collect()
    }
}

/// Per-step status as shown to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Not reached yet
    #[default]
    Pending,
    /// First attempt in flight
    Running,
    /// A later attempt is scheduled or in flight
    Retrying,
    /// Finished successfully
    Success,
    /// Marked failed by a human
    Failed,
    /// Waiting on a human operator
    Human,
}

/// Runtime record for one step in the current run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRuntimeState {
    /// Step identifier
    pub step_id: String,
    /// Current status
    pub status: StepStatus,
    /// Attempt number, 1-based
    pub attempt: u32,
    /// When the step (or current retry) started
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub start_time: Option<DateTime<Utc>>,
    /// When the step finished
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub end_time: Option<DateTime<Utc>>,
    /// Duration of the finishing attempt
    #[serde(default)]
    pub duration_ms: Option<f64>,
}

impl StepRuntimeState {
    /// Fresh pending record
    #[must_use]
    pub fn pending(step_id: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            status: StepStatus::Pending,
            attempt: 1,
            start_time: None,
            end_time: None,
            duration_ms: None,
        }
    }
}

/// Coarse phase exposed to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Nothing running
    #[default]
    Idle,
    /// Walking the graph
    Running,
    /// Paused between attempts
    Paused,
    /// Waiting for a human to finish a step
    Teaching,
    /// All steps done
    Complete,
    /// Run aborted by a fault
    Error,
}

impl Phase {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Teaching => "teaching",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a run, recomputed on every transition
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionState {
    /// Coarse phase
    pub phase: Phase,
    /// Assembly being executed
    #[serde(default)]
    pub assembly_id: Option<String>,
    /// Step the engine is on
    #[serde(default)]
    pub current_step_id: Option<String>,
    /// Per-step runtime records
    #[serde(default)]
    pub step_states: HashMap<String, StepRuntimeState>,
    /// Runs started by this sequencer
    #[serde(default)]
    pub run_number: u64,
    /// When the current run started
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub start_time: Option<DateTime<Utc>>,
    /// Time since the run started
    #[serde(default)]
    pub elapsed_ms: f64,
    /// Succeeded steps over finished steps
    #[serde(default)]
    pub overall_success_rate: f64,
}

impl ExecutionState {
    /// Number of steps with the given status
    #[must_use]
    pub fn count(&self, status: StepStatus) -> usize {
        self.step_states
            .values()
            .filter(|s| s.status == status)
            .count()
    }
}

/// Steps with status success over steps with status success or failed
#[must_use]
pub fn overall_success_rate<'a>(states: impl IntoIterator<Item = &'a StepRuntimeState>) -> f64 {
    let (completed, attempted) = states.into_iter().fold((0u32, 0u32), |(ok, done), s| {
        match s.status {
            StepStatus::Success => (ok + 1, done + 1),
            StepStatus::Failed => (ok, done + 1),
            _ => (ok, done),
        }
    });

    if attempted == 0 {
        0.0
    } else {
        f64::from(completed) / f64::from(attempted)
    }
}
