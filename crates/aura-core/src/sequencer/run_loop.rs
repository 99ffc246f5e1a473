//! The run task: walks the step order, retries, escalates

use super::config::{HumanFailurePolicy, SequencerConfig};
use super::runtime::{finished, starting, waiting, Runtime};
use super::state::SequencerState;
use super::StateCallback;
use crate::analytics::{AnalyticsStore, StepAttemptRecord};
use crate::router::PolicyRouter;
use crate::types::{HandlerUsed, StepResult, StepStatus};
use crate::verification::{ExecutionData, StepVerifier, VerificationError};
use aura_assembly::{AssemblyGraph, AssemblyStep};
use chrono::Utc;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Faults that end a run in ERROR
#[derive(Debug, Error)]
enum RunFault {
    #[error("verifier failed on step {step_id}: {source}")]
    Verification {
        step_id: String,
        #[source]
        source: VerificationError,
    },

    #[error("human resolution channel closed on step {0}")]
    HumanChannelClosed(String),

    #[error("human marked step {0} as failed")]
    HumanRejected(String),
}

/// How the run continues after a human resolved a step
enum Resolution {
    Advance,
    Retry,
}

/// Everything the run task owns
pub(super) struct RunContext {
    pub(super) graph: Arc<AssemblyGraph>,
    pub(super) router: Arc<PolicyRouter>,
    pub(super) callback: StateCallback,
    pub(super) analytics: Option<Arc<dyn AnalyticsStore>>,
    pub(super) verifier: Option<Arc<dyn StepVerifier>>,
    pub(super) config: SequencerConfig,
    pub(super) runtime: Arc<Runtime>,
    pub(super) cancel: CancellationToken,
    pub(super) shutdown: Option<CancellationToken>,
}

impl RunContext {
    pub(super) async fn run(self) {
        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                info!(assembly_id = %self.graph.id, "Sequencer task cancelled");
                // stop() settles the state itself; a parent shutdown does not
                if self.shutdown.as_ref().is_some_and(CancellationToken::is_cancelled) {
                    drop(self.runtime.take_human());
                    self.runtime.cell().store(SequencerState::Idle);
                    self.emit();
                }
                return;
            }
            outcome = AssertUnwindSafe(self.walk()).catch_unwind() => outcome,
        };

        match outcome {
            Ok(Ok(())) => {
                self.runtime.cell().store(SequencerState::Complete);
                self.emit();
                info!(assembly_id = %self.graph.id, "Assembly execution complete");
            }
            Ok(Err(fault)) => {
                error!(assembly_id = %self.graph.id, error = %fault, "Sequencer error");
                self.fail();
            }
            Err(_) => {
                error!(assembly_id = %self.graph.id, "Sequencer task panicked");
                self.fail();
            }
        }
    }

    async fn walk(&self) -> Result<(), RunFault> {
        let mut gate = self.runtime.pause_gate();

        for (index, step_id) in self.graph.step_order.iter().enumerate() {
            self.runtime.wait_while_paused(&mut gate).await;

            let Some(step) = self.graph.step(step_id) else {
                error!(step_id = %step_id, "Step not found in assembly graph");
                continue;
            };
            self.run_step(index, step, &mut gate).await?;
        }

        // a pause after the last step holds completion too
        self.runtime.wait_while_paused(&mut gate).await;
        Ok(())
    }

    async fn run_step(
        &self,
        index: usize,
        step: &AssemblyStep,
        gate: &mut watch::Receiver<bool>,
    ) -> Result<(), RunFault> {
        let max_attempts = step.max_attempts();
        self.enter_step(index, step);

        let mut attempt = 1;
        loop {
            self.runtime.wait_while_paused(gate).await;

            let result = self.dispatch(step).await;
            let result = self.verify(step, result).await?;
            self.record(step, result.success, result.duration_ms, attempt)
                .await;

            if result.success {
                {
                    let mut book = self.runtime.book();
                    let start = book.step_start(&step.id);
                    book.set(finished(
                        &step.id,
                        StepStatus::Success,
                        attempt,
                        start,
                        Some(result.duration_ms),
                    ));
                }
                self.runtime.cell().advance(SequencerState::StepComplete);
                self.emit();
                info!(
                    step_id = %step.id,
                    attempt,
                    duration_ms = result.duration_ms,
                    handler = %result.handler_used,
                    "Step succeeded"
                );
                return Ok(());
            }

            if attempt < max_attempts {
                attempt += 1;
                {
                    let mut book = self.runtime.book();
                    book.attempt = attempt;
                    book.set(starting(&step.id, StepStatus::Retrying, attempt));
                }
                self.emit();
                warn!(
                    step_id = %step.id,
                    attempt = attempt - 1,
                    max_attempts,
                    error = result.error_message.as_deref().unwrap_or("unknown"),
                    "Step failed, retrying"
                );
                tokio::time::sleep(self.config.retry_backoff()).await;
                continue;
            }

            warn!(
                step_id = %step.id,
                max_attempts,
                error = result.error_message.as_deref().unwrap_or("unknown"),
                "Step exhausted retries, waiting for human"
            );
            match self.wait_for_human(step, attempt).await? {
                Resolution::Advance => return Ok(()),
                Resolution::Retry => {
                    info!(step_id = %step.id, "Restarting step after human failure");
                    self.enter_step(index, step);
                    attempt = 1;
                }
            }
        }
    }

    fn enter_step(&self, index: usize, step: &AssemblyStep) {
        {
            let mut book = self.runtime.book();
            book.step_index = index;
            book.attempt = 1;
            book.set(starting(&step.id, StepStatus::Running, 1));
        }
        self.runtime.cell().advance(SequencerState::StepActive);
        self.emit();
        debug!(step_id = %step.id, index, handler = %step.handler, "Entered step");
    }

    async fn dispatch(&self, step: &AssemblyStep) -> StepResult {
        if self.config.demo_mode {
            let delay = self.config.demo_delay();
            tokio::time::sleep(delay).await;
            return StepResult::success(HandlerUsed::Demo, delay.as_secs_f64() * 1000.0);
        }
        self.router.dispatch(step).await
    }

    /// Second opinion on a successful dispatch. Demo results carry no
    /// telemetry and are taken as is.
    async fn verify(&self, step: &AssemblyStep, result: StepResult) -> Result<StepResult, RunFault> {
        let Some(verifier) = &self.verifier else {
            return Ok(result);
        };
        if !result.success || result.handler_used == HandlerUsed::Demo {
            return Ok(result);
        }

        let data = ExecutionData::from(&result);
        let verdict = verifier
            .verify(step, &data)
            .await
            .map_err(|source| RunFault::Verification {
                step_id: step.id.clone(),
                source,
            })?;

        if verdict.passed {
            return Ok(result);
        }

        Ok(StepResult::failure(
            result.handler_used,
            result.duration_ms,
            format!("Verification failed: {}", verdict.detail),
        ))
    }

    async fn record(&self, step: &AssemblyStep, success: bool, duration_ms: f64, attempt: u32) {
        let Some(store) = &self.analytics else {
            return;
        };

        let record = StepAttemptRecord::new(&self.graph.id, &step.id, success, duration_ms, attempt)
            .with_demo(self.config.demo_mode);
        if let Err(e) = store.record_step_result(record).await {
            warn!(step_id = %step.id, attempt, error = %e, "Failed to record step result");
        }
    }

    async fn wait_for_human(&self, step: &AssemblyStep, attempt: u32) -> Result<Resolution, RunFault> {
        let (sender, receiver) = oneshot::channel();
        {
            let mut book = self.runtime.book();
            let start = book.step_start(&step.id);
            book.set(waiting(&step.id, attempt, start));
        }
        self.runtime.install_human(sender);
        self.runtime.cell().store(SequencerState::WaitingForHuman);
        self.runtime.set_paused(false);
        self.emit();

        let success = receiver
            .await
            .map_err(|_| RunFault::HumanChannelClosed(step.id.clone()))?;

        let duration_ms = {
            let mut book = self.runtime.book();
            let start = book.step_start(&step.id);
            let (status, duration_ms) = if success {
                let elapsed = start
                    .and_then(|s| (Utc::now() - s).to_std().ok())
                    .map_or(0.0, |d| d.as_secs_f64() * 1000.0);
                (StepStatus::Success, elapsed)
            } else {
                (StepStatus::Failed, 0.0)
            };
            book.set(finished(&step.id, status, attempt, start, Some(duration_ms)));
            duration_ms
        };
        self.record(step, success, duration_ms, attempt).await;

        if success {
            info!(step_id = %step.id, "Human completed step successfully");
            self.runtime.cell().advance(SequencerState::StepComplete);
            self.emit();
            return Ok(Resolution::Advance);
        }

        warn!(
            step_id = %step.id,
            policy = %self.config.human_failure_policy,
            "Human marked step as failed"
        );
        match self.config.human_failure_policy {
            HumanFailurePolicy::Advance => {
                self.runtime.cell().advance(SequencerState::StepComplete);
                self.emit();
                Ok(Resolution::Advance)
            }
            HumanFailurePolicy::Retry => Ok(Resolution::Retry),
            HumanFailurePolicy::Halt => Err(RunFault::HumanRejected(step.id.clone())),
        }
    }

    fn fail(&self) {
        self.runtime.cell().store(SequencerState::Error);
        self.emit();
    }

    fn emit(&self) {
        self.runtime.emit(&self.graph, &self.callback);
    }
}
