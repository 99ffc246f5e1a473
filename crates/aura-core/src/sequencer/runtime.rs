//! Run bookkeeping and the signals shared by commands and the run task

use super::state::{SequencerState, StateCell};
use super::StateCallback;
use crate::types::{overall_success_rate, ExecutionState, StepRuntimeState, StepStatus};
use aura_assembly::AssemblyGraph;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::{oneshot, watch};
use tracing::error;

/// Mutable per-run data. Guarded by a plain mutex that is never held across
/// an await.
#[derive(Debug, Default)]
pub(super) struct RunBook {
    pub(super) step_index: usize,
    pub(super) attempt: u32,
    pub(super) run_number: u64,
    pub(super) start_time: Option<DateTime<Utc>>,
    pub(super) step_states: HashMap<String, StepRuntimeState>,
}

impl RunBook {
    fn reset(&mut self, graph: &AssemblyGraph) {
        self.step_index = 0;
        self.attempt = 1;
        self.run_number += 1;
        self.start_time = Some(Utc::now());
        self.step_states = graph
            .step_order
            .iter()
            .map(|id| (id.clone(), StepRuntimeState::pending(id.as_str())))
            .collect();
    }

    pub(super) fn step_start(&self, step_id: &str) -> Option<DateTime<Utc>> {
        self.step_states.get(step_id).and_then(|s| s.start_time)
    }

    pub(super) fn set(&mut self, state: StepRuntimeState) {
        self.step_states.insert(state.step_id.clone(), state);
    }
}

/// State shared between the [`Sequencer`](super::Sequencer) handle and its run task
pub(super) struct Runtime {
    state: StateCell,
    book: Mutex<RunBook>,
    pause: watch::Sender<bool>,
    human: Mutex<Option<oneshot::Sender<bool>>>,
}

impl Runtime {
    pub(super) fn new() -> Self {
        let (pause, _) = watch::channel(false);
        Self {
            state: StateCell::new(SequencerState::Idle),
            book: Mutex::new(RunBook::default()),
            pause,
            human: Mutex::new(None),
        }
    }

    pub(super) fn state(&self) -> SequencerState {
        self.state.load()
    }

    pub(super) fn cell(&self) -> &StateCell {
        &self.state
    }

    pub(super) fn book(&self) -> MutexGuard<'_, RunBook> {
        self.book.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Claim the engine for a new run and reset all bookkeeping.
    ///
    /// Returns the state that blocked the claim when the engine is busy.
    pub(super) fn begin_run(&self, graph: &AssemblyGraph) -> Result<(), SequencerState> {
        let mut book = self.book();
        self.state
            .update(|s| s.can_start().then_some(SequencerState::Running))?;
        book.reset(graph);
        drop(book);

        self.pause.send_replace(false);
        self.take_human();
        Ok(())
    }

    /// Gate receiver for the run task
    pub(super) fn pause_gate(&self) -> watch::Receiver<bool> {
        self.pause.subscribe()
    }

    pub(super) fn set_paused(&self, paused: bool) {
        self.pause.send_replace(paused);
    }

    /// Block while the state cell says PAUSED.
    ///
    /// The watch value only wakes the waiter; the state cell decides, so a
    /// stale gate value can never strand the run.
    pub(super) async fn wait_while_paused(&self, gate: &mut watch::Receiver<bool>) {
        // the sender lives as long as the runtime, so an error means teardown
        let _ = gate
            .wait_for(|_| self.state.load() != SequencerState::Paused)
            .await;
    }

    pub(super) fn install_human(&self, sender: oneshot::Sender<bool>) {
        *self.human.lock().unwrap_or_else(|e| e.into_inner()) = Some(sender);
    }

    pub(super) fn take_human(&self) -> Option<oneshot::Sender<bool>> {
        self.human.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    /// Pure projection of the current run
    pub(super) fn snapshot(&self, graph: &AssemblyGraph) -> ExecutionState {
        let book = self.book();
        let state = self.state.load();

        let current_step_id = match state {
            SequencerState::Idle | SequencerState::Complete => None,
            _ => graph.step_order.get(book.step_index).cloned(),
        };

        let elapsed_ms = book
            .start_time
            .and_then(|start| (Utc::now() - start).to_std().ok())
            .map_or(0.0, |d| d.as_secs_f64() * 1000.0);

        ExecutionState {
            phase: state.phase(),
            assembly_id: Some(graph.id.clone()),
            current_step_id,
            overall_success_rate: overall_success_rate(book.step_states.values()),
            step_states: book.step_states.clone(),
            run_number: book.run_number,
            start_time: book.start_time,
            elapsed_ms,
        }
    }

    /// Push a fresh snapshot to the observer; failures are only logged
    pub(super) fn emit(&self, graph: &AssemblyGraph, callback: &StateCallback) {
        let snapshot = self.snapshot(graph);
        if let Err(e) = callback(&snapshot) {
            error!(error = %e, "State change callback failed");
        }
    }
}

/// Build a step record that keeps the step's original start time
pub(super) fn finished(
    step_id: &str,
    status: StepStatus,
    attempt: u32,
    start_time: Option<DateTime<Utc>>,
    duration_ms: Option<f64>,
) -> StepRuntimeState {
    StepRuntimeState {
        step_id: step_id.to_string(),
        status,
        attempt,
        start_time,
        end_time: Some(Utc::now()),
        duration_ms,
    }
}

/// Build a record for a step handed to a human
pub(super) fn waiting(
    step_id: &str,
    attempt: u32,
    start_time: Option<DateTime<Utc>>,
) -> StepRuntimeState {
    StepRuntimeState {
        step_id: step_id.to_string(),
        status: StepStatus::Human,
        attempt,
        start_time,
        end_time: None,
        duration_ms: None,
    }
}

/// Build a record for an attempt that is starting now
pub(super) fn starting(step_id: &str, status: StepStatus, attempt: u32) -> StepRuntimeState {
    StepRuntimeState {
        step_id: step_id.to_string(),
        status,
        attempt,
        start_time: Some(Utc::now()),
        end_time: None,
        duration_ms: None,
    }
}
