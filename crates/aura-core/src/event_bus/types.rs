use crate::types::ExecutionState;
use serde::{Deserialize, Serialize};

/// Events pushed to observers.
///
/// Serialized with a `type` tag next to the payload fields, so an execution
/// state arrives as `{"type": "execution_state", "phase": ..., ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEvent {
    /// Fresh snapshot after a transition
    ExecutionState(ExecutionState),
}

impl ExecutionEvent {
    /// Assembly the event belongs to
    #[must_use]
    pub fn assembly_id(&self) -> Option<&str> {
        match self {
            Self::ExecutionState(state) => state.assembly_id.as_deref(),
        }
    }
}
