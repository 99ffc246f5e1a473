//! Sequencer states and the atomic cell that holds the current one

use crate::types::Phase;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Internal sequencer state
///
/// Several states share one observable [`Phase`]; see [`SequencerState::phase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SequencerState {
    /// Nothing running
    Idle = 0,
    /// Run started, first step not entered yet
    Running = 1,
    /// A step is being attempted
    StepActive = 2,
    /// A step just finished
    StepComplete = 3,
    /// Held at the gate between attempts
    Paused = 4,
    /// Retries exhausted, a human is finishing the step
    WaitingForHuman = 5,
    /// Every step finished
    Complete = 6,
    /// Run aborted by a fault
    Error = 7,
}

impl SequencerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::StepActive,
            3 => Self::StepComplete,
            4 => Self::Paused,
            5 => Self::WaitingForHuman,
            6 => Self::Complete,
            _ => Self::Error,
        }
    }

    /// Observable phase for this state
    #[must_use]
    pub fn phase(self) -> Phase {
        match self {
            Self::Idle => Phase::Idle,
            Self::Running | Self::StepActive | Self::StepComplete => Phase::Running,
            Self::Paused => Phase::Paused,
            Self::WaitingForHuman => Phase::Teaching,
            Self::Complete => Phase::Complete,
            Self::Error => Phase::Error,
        }
    }

    /// RUNNING, STEP_ACTIVE or STEP_COMPLETE
    #[must_use]
    pub fn is_advancing(self) -> bool {
        matches!(self, Self::Running | Self::StepActive | Self::StepComplete)
    }

    /// Whether `start()` may begin a new run from here
    #[must_use]
    pub fn can_start(self) -> bool {
        matches!(self, Self::Idle | Self::Complete | Self::Error)
    }

    /// Whether a run task may still be alive
    #[must_use]
    pub fn is_active(self) -> bool {
        !self.can_start()
    }
}

impl fmt::Display for SequencerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::StepActive => "step_active",
            Self::StepComplete => "step_complete",
            Self::Paused => "paused",
            Self::WaitingForHuman => "waiting_for_human",
            Self::Complete => "complete",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Lock-free holder of the authoritative state
#[derive(Debug)]
pub(super) struct StateCell(AtomicU8);

impl StateCell {
    pub(super) fn new(state: SequencerState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub(super) fn load(&self) -> SequencerState {
        SequencerState::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub(super) fn store(&self, state: SequencerState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    /// Apply `f` atomically; `None` leaves the state alone.
    ///
    /// Returns the previous state on success and the current one on refusal.
    pub(super) fn update(
        &self,
        mut f: impl FnMut(SequencerState) -> Option<SequencerState>,
    ) -> Result<SequencerState, SequencerState> {
        self.0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |raw| {
                f(SequencerState::from_u8(raw)).map(|next| next as u8)
            })
            .map(SequencerState::from_u8)
            .map_err(SequencerState::from_u8)
    }

    /// Move the run forward unless an operator paused it.
    pub(super) fn advance(&self, next: SequencerState) -> bool {
        self.update(|current| (current != SequencerState::Paused).then_some(next))
            .is_ok()
    }
}
