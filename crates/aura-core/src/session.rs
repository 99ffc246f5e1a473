//! Execution session - single owner of the active run
//!
//! Callers hold one [`ExecutionSession`] and route every command through it.
//! The session builds a fresh [`Sequencer`] per launch and refuses to replace
//! one that is still running.

use crate::analytics::AnalyticsStore;
use crate::error::Error;
use crate::router::PolicyRouter;
use crate::sequencer::{CommandOutcome, Sequencer, SequencerConfig, SequencerState, StateCallback};
use crate::types::ExecutionState;
use crate::verification::StepVerifier;
use aura_assembly::AssemblyGraph;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Session command errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// No sequencer has been launched yet
    #[error("No active execution")]
    NoActiveExecution,

    /// The engine ignored the command in its current state
    #[error("Cannot {command} while {state}")]
    Conflict {
        /// Command that was refused
        command: &'static str,
        /// Engine state at the time
        state: SequencerState,
    },

    /// The sequencer could not be built
    #[error(transparent)]
    Core(#[from] Error),
}

/// Result alias for session commands
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Owner of at most one active [`Sequencer`]
pub struct ExecutionSession {
    current: RwLock<Option<Arc<Sequencer>>>,
    callback: StateCallback,
    analytics: Option<Arc<dyn AnalyticsStore>>,
    verifier: Option<Arc<dyn StepVerifier>>,
    config: SequencerConfig,
    shutdown: Option<CancellationToken>,
}

impl ExecutionSession {
    /// Create a session whose runs report to `on_state_change`
    pub fn new(on_state_change: StateCallback) -> Self {
        Self {
            current: RwLock::new(None),
            callback: on_state_change,
            analytics: None,
            verifier: None,
            config: SequencerConfig::default(),
            shutdown: None,
        }
    }

    /// Analytics store handed to every launched sequencer
    #[must_use]
    pub fn with_analytics(mut self, store: Arc<dyn AnalyticsStore>) -> Self {
        self.analytics = Some(store);
        self
    }

    /// Verifier handed to every launched sequencer
    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn StepVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Sequencer configuration for every launch
    #[must_use]
    pub fn with_config(mut self, config: SequencerConfig) -> Self {
        self.config = config;
        self
    }

    /// Parent token for every launched run
    #[must_use]
    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    /// Build a sequencer for `graph` and start it
    ///
    /// Refused while the current sequencer is still running. A finished,
    /// failed or stopped sequencer is replaced.
    pub async fn launch(
        &self,
        graph: AssemblyGraph,
        router: PolicyRouter,
    ) -> SessionResult<Arc<Sequencer>> {
        let mut current = self.current.write().await;

        if let Some(active) = current.as_ref().filter(|s| s.is_running()) {
            let state = active.state();
            warn!(assembly_id = %active.graph().id, %state, "Launch refused: execution in progress");
            return Err(SessionError::Conflict {
                command: "launch",
                state,
            });
        }

        let mut sequencer =
            Sequencer::new(graph, Arc::clone(&self.callback), router)?.with_config(self.config.clone());
        if let Some(store) = &self.analytics {
            sequencer = sequencer.with_analytics(Arc::clone(store));
        }
        if let Some(verifier) = &self.verifier {
            sequencer = sequencer.with_verifier(Arc::clone(verifier));
        }
        if let Some(token) = &self.shutdown {
            sequencer = sequencer.with_shutdown_token(token.clone());
        }

        let sequencer = Arc::new(sequencer);
        let outcome = sequencer.start();
        if !outcome.is_applied() {
            return Err(SessionError::Conflict {
                command: "launch",
                state: sequencer.state(),
            });
        }

        info!(assembly_id = %sequencer.graph().id, "Execution launched");
        *current = Some(Arc::clone(&sequencer));
        Ok(sequencer)
    }

    /// The current sequencer, if any
    pub async fn sequencer(&self) -> Option<Arc<Sequencer>> {
        self.current.read().await.clone()
    }

    /// Pause the active run
    pub async fn pause(&self) -> SessionResult<()> {
        let sequencer = self.require().await?;
        check("pause", &sequencer, sequencer.pause())
    }

    /// Resume a paused run
    pub async fn resume(&self) -> SessionResult<()> {
        let sequencer = self.require().await?;
        check("resume", &sequencer, sequencer.resume())
    }

    /// Report the outcome of a step finished by hand
    pub async fn complete_human_step(&self, success: bool) -> SessionResult<()> {
        let sequencer = self.require().await?;
        check(
            "complete human step",
            &sequencer,
            sequencer.complete_human_step(success),
        )
    }

    /// Stop the active run
    pub async fn stop(&self) -> SessionResult<()> {
        let sequencer = self.require().await?;
        let outcome = sequencer.stop().await;
        check("stop", &sequencer, outcome)
    }

    /// Snapshot of the current run, or the idle default when nothing has run
    pub async fn state(&self) -> ExecutionState {
        match self.current.read().await.as_ref() {
            Some(sequencer) => sequencer.get_execution_state(),
            None => ExecutionState::default(),
        }
    }

    async fn require(&self) -> SessionResult<Arc<Sequencer>> {
        self.current
            .read()
            .await
            .clone()
            .ok_or(SessionError::NoActiveExecution)
    }
}

fn check(command: &'static str, sequencer: &Sequencer, outcome: CommandOutcome) -> SessionResult<()> {
    match outcome {
        CommandOutcome::Applied => Ok(()),
        CommandOutcome::Ignored => Err(SessionError::Conflict {
            command,
            state: sequencer.state(),
        }),
    }
}

#[cfg(test)]
mod tests;
