//! Sequencer struct, builder methods and the command surface

use super::config::SequencerConfig;
use super::run_loop::RunContext;
use super::runtime::Runtime;
use super::state::SequencerState;
use super::StateCallback;
use crate::analytics::AnalyticsStore;
use crate::error::{Error, Result};
use crate::router::PolicyRouter;
use crate::types::ExecutionState;
use crate::verification::StepVerifier;
use aura_assembly::{AssemblyGraph, AssemblyStep};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Whether a command changed anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The command took effect
    Applied,
    /// The command was not valid in the current state and was logged
    Ignored,
}

impl CommandOutcome {
    /// Returns true if the command took effect
    #[must_use]
    pub fn is_applied(self) -> bool {
        self == Self::Applied
    }
}

/// Handle to the active run task
#[derive(Default)]
struct Control {
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

/// State machine that walks an assembly graph step by step
///
/// Commands never block on the run: they flip the state cell and signal the
/// run task through a cancellation token, a pause gate and a one-shot human
/// channel. Only [`stop`](Self::stop) waits, for the task to wind down.
pub struct Sequencer {
    graph: Arc<AssemblyGraph>,
    router: Arc<PolicyRouter>,
    callback: StateCallback,
    analytics: Option<Arc<dyn AnalyticsStore>>,
    verifier: Option<Arc<dyn StepVerifier>>,
    config: SequencerConfig,
    shutdown: Option<CancellationToken>,
    runtime: Arc<Runtime>,
    control: Mutex<Control>,
}

impl Sequencer {
    /// Create a sequencer for `graph`
    ///
    /// Fails when the graph has no steps or its step order is inconsistent.
    pub fn new(
        graph: AssemblyGraph,
        on_state_change: StateCallback,
        router: PolicyRouter,
    ) -> Result<Self> {
        if graph.step_order.is_empty() {
            return Err(Error::EmptyStepOrder(graph.id));
        }
        graph.validate()?;

        Ok(Self {
            graph: Arc::new(graph),
            router: Arc::new(router),
            callback: on_state_change,
            analytics: None,
            verifier: None,
            config: SequencerConfig::default(),
            shutdown: None,
            runtime: Arc::new(Runtime::new()),
            control: Mutex::new(Control::default()),
        })
    }

    /// Record every attempt in `store`
    #[must_use]
    pub fn with_analytics(mut self, store: Arc<dyn AnalyticsStore>) -> Self {
        self.analytics = Some(store);
        self
    }

    /// Re-check successful dispatches with `verifier`
    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn StepVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Set the configuration
    #[must_use]
    pub fn with_config(mut self, config: SequencerConfig) -> Self {
        self.config = config;
        self
    }

    /// Tie every run to a parent token; cancelling it cancels the run
    #[must_use]
    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    /// The graph being executed
    #[must_use]
    pub fn graph(&self) -> &AssemblyGraph {
        &self.graph
    }

    /// Current internal state
    #[must_use]
    pub fn state(&self) -> SequencerState {
        self.runtime.state()
    }

    /// Whether a run is in progress (including paused and waiting for a human)
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.runtime.state().is_active()
    }

    /// Step the engine is on; `None` when idle or complete
    #[must_use]
    pub fn current_step(&self) -> Option<&AssemblyStep> {
        match self.runtime.state() {
            SequencerState::Idle | SequencerState::Complete => None,
            _ => {
                let index = self.runtime.book().step_index;
                self.graph
                    .step_order
                    .get(index)
                    .and_then(|id| self.graph.step(id))
            }
        }
    }

    /// Snapshot of the current run
    #[must_use]
    pub fn get_execution_state(&self) -> ExecutionState {
        self.runtime.snapshot(&self.graph)
    }

    /// Begin executing from the first step
    ///
    /// Valid from IDLE, COMPLETE and ERROR. Concurrent callers race on an
    /// atomic transition; exactly one wins. Must be called within a tokio
    /// runtime.
    pub fn start(&self) -> CommandOutcome {
        let mut control = self.control.lock().unwrap_or_else(|e| e.into_inner());

        if let Err(current) = self.runtime.begin_run(&self.graph) {
            warn!(state = %current, "Cannot start: sequencer is busy");
            return CommandOutcome::Ignored;
        }

        let cancel = match &self.shutdown {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };

        self.emit();

        let context = RunContext {
            graph: Arc::clone(&self.graph),
            router: Arc::clone(&self.router),
            callback: Arc::clone(&self.callback),
            analytics: self.analytics.clone(),
            verifier: self.verifier.clone(),
            config: self.config.clone(),
            runtime: Arc::clone(&self.runtime),
            cancel: cancel.clone(),
            shutdown: self.shutdown.clone(),
        };

        // a finished previous task has nothing left to do
        if let Some(previous) = control.task.take() {
            previous.abort();
        }
        control.cancel = Some(cancel);
        control.task = Some(tokio::spawn(context.run()));

        info!(
            assembly_id = %self.graph.id,
            run = self.runtime.book().run_number,
            steps = self.graph.step_order.len(),
            demo_mode = self.config.demo_mode,
            "Sequencer started"
        );
        CommandOutcome::Applied
    }

    /// Hold the run at the next gate; the attempt in flight finishes first
    pub fn pause(&self) -> CommandOutcome {
        let applied = self
            .runtime
            .cell()
            .update(|s| s.is_advancing().then_some(SequencerState::Paused));

        match applied {
            Ok(_) => {
                self.runtime.set_paused(true);
                self.emit();
                info!(step_index = self.runtime.book().step_index, "Sequencer paused");
                CommandOutcome::Applied
            }
            Err(current) => {
                warn!(state = %current, "Cannot pause: sequencer is not running");
                CommandOutcome::Ignored
            }
        }
    }

    /// Release a paused run
    pub fn resume(&self) -> CommandOutcome {
        let applied = self.runtime.cell().update(|s| {
            (s == SequencerState::Paused).then_some(SequencerState::StepActive)
        });

        match applied {
            Ok(_) => {
                self.runtime.set_paused(false);
                self.emit();
                info!(step_index = self.runtime.book().step_index, "Sequencer resumed");
                CommandOutcome::Applied
            }
            Err(current) => {
                warn!(state = %current, "Cannot resume: sequencer is not paused");
                CommandOutcome::Ignored
            }
        }
    }

    /// Cancel the run and return to IDLE
    ///
    /// Releases pause and human waits, then waits for the run task to end.
    /// An in-flight primitive call may finish before cancellation lands.
    pub async fn stop(&self) -> CommandOutcome {
        let current = self.runtime.state();
        if current == SequencerState::Idle {
            warn!("Cannot stop: sequencer is already idle");
            return CommandOutcome::Ignored;
        }

        let (cancel, task) = {
            let mut control = self.control.lock().unwrap_or_else(|e| e.into_inner());
            (control.cancel.take(), control.task.take())
        };

        if let Some(cancel) = cancel {
            cancel.cancel();
        }
        self.runtime.set_paused(false);
        drop(self.runtime.take_human());

        if let Some(task) = task {
            if let Err(e) = task.await {
                if e.is_panic() {
                    error!(error = %e, "Sequencer task panicked during stop");
                }
            }
        }

        self.runtime.cell().store(SequencerState::Idle);
        self.emit();
        info!(assembly_id = %self.graph.id, from = %current, "Sequencer stopped");
        CommandOutcome::Applied
    }

    /// Report the outcome of a step a human finished by hand
    ///
    /// Only meaningful while waiting for a human; the run task records the
    /// result and continues.
    pub fn complete_human_step(&self, success: bool) -> CommandOutcome {
        let Some(sender) = self.runtime.take_human() else {
            warn!(state = %self.runtime.state(), "Not waiting for human");
            return CommandOutcome::Ignored;
        };

        if sender.send(success).is_err() {
            warn!("Run ended before the human result arrived");
            return CommandOutcome::Ignored;
        }

        info!(success, "Human step result received");
        CommandOutcome::Applied
    }

    fn emit(&self) {
        self.runtime.emit(&self.graph, &self.callback);
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        let control = self.control.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(cancel) = control.cancel.take() {
            cancel.cancel();
        }
    }
}
