//! PolicyRouter - dispatch an assembly step to its handler

use super::config::RouterConfig;
use super::traits::{
    Action, Policy, PolicyError, PolicyLoader, PrimitiveLibrary, RlLoader, Robot,
};
use crate::types::{HandlerUsed, StepResult};
use aura_assembly::{AssemblyStep, Handler};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Routes assembly steps to primitives, policies or RL agents
///
/// [`dispatch`](Self::dispatch) never fails: every fault becomes a failed
/// [`StepResult`] so the sequencer can retry or escalate.
pub struct PolicyRouter {
    primitives: Arc<dyn PrimitiveLibrary>,
    robot: Arc<dyn Robot>,
    policies: Arc<dyn PolicyLoader>,
    rl_agents: Option<Arc<dyn RlLoader>>,
    assembly_id: String,
    config: RouterConfig,
}

impl PolicyRouter {
    /// Create a router for one assembly
    #[must_use]
    pub fn new(
        primitives: Arc<dyn PrimitiveLibrary>,
        robot: Arc<dyn Robot>,
        policies: Arc<dyn PolicyLoader>,
        assembly_id: impl Into<String>,
    ) -> Self {
        Self {
            primitives,
            robot,
            policies,
            rl_agents: None,
            assembly_id: assembly_id.into(),
            config: RouterConfig::default(),
        }
    }

    /// Attach an RL checkpoint loader
    #[must_use]
    pub fn with_rl_loader(mut self, loader: Arc<dyn RlLoader>) -> Self {
        self.rl_agents = Some(loader);
        self
    }

    /// Override control-loop timing
    #[must_use]
    pub fn with_config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Assembly this router serves
    #[must_use]
    pub fn assembly_id(&self) -> &str {
        &self.assembly_id
    }

    /// Execute one attempt of `step`
    pub async fn dispatch(&self, step: &AssemblyStep) -> StepResult {
        let started = Instant::now();

        match &step.handler {
            Handler::Primitive => self.run_primitive(step, started).await,
            Handler::Policy => self.run_policy(step, started).await,
            Handler::RlFinetune => self.run_rl_agent(step, started).await,
            Handler::Unrecognized(other) => {
                error!(step_id = %step.id, handler = %other, "Unknown handler type");
                StepResult::failure(
                    HandlerUsed::Unrecognized(other.clone()),
                    elapsed_ms(started),
                    format!("Unknown handler: {}", other),
                )
            }
        }
    }

    async fn run_primitive(&self, step: &AssemblyStep, started: Instant) -> StepResult {
        let primitive = match step.primitive_type.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => {
                return StepResult::failure(
                    HandlerUsed::Primitive,
                    elapsed_ms(started),
                    format!("Step {} has no primitive_type set", step.id),
                );
            }
        };

        debug!(step_id = %step.id, primitive, "Running primitive");

        match self
            .primitives
            .run(primitive, Arc::clone(&self.robot), step.primitive_params.clone())
            .await
        {
            Ok(outcome) => StepResult {
                success: outcome.success,
                duration_ms: elapsed_ms(started),
                handler_used: HandlerUsed::Primitive,
                error_message: outcome.error_message,
                actual_force: outcome.actual_force,
                actual_position: outcome.actual_position,
                force_history: outcome.force_history,
            },
            Err(e) => {
                error!(step_id = %step.id, primitive, error = %e, "Primitive failed");
                StepResult::failure(HandlerUsed::Primitive, elapsed_ms(started), e.to_string())
            }
        }
    }

    async fn run_policy(&self, step: &AssemblyStep, started: Instant) -> StepResult {
        let Some(policy) = self.policies.load(&self.assembly_id, &step.id) else {
            warn!(
                step_id = %step.id,
                assembly_id = %self.assembly_id,
                "No trained policy for step"
            );
            return StepResult::failure(
                HandlerUsed::Policy,
                elapsed_ms(started),
                format!("No trained policy for step {}", step.id),
            );
        };

        info!(step_id = %step.id, chunk_size = policy.chunk_size(), "Running policy inference");

        match self.replay_chunk(policy.as_ref()).await {
            Ok(()) => StepResult::success(HandlerUsed::Policy, elapsed_ms(started)),
            Err(e) => {
                error!(step_id = %step.id, error = %e, "Policy inference failed");
                StepResult::failure(HandlerUsed::Policy, elapsed_ms(started), e.to_string())
            }
        }
    }

    /// Observe once, predict a chunk, then play it open-loop.
    async fn replay_chunk(&self, policy: &dyn Policy) -> Result<(), PolicyError> {
        let observation = self.robot.get_observation()?;
        let actions = policy.predict(&observation)?;
        let Some(last) = actions.len().checked_sub(1) else {
            return Err(PolicyError::EmptyChunk);
        };

        let mut keys = policy.joint_keys();
        if keys.is_empty() {
            // BTreeMap keys are already sorted
            keys = observation.keys().cloned().collect();
        }

        let tick = self.config.tick_interval();
        for i in 0..policy.chunk_size() {
            let values = &actions[i.min(last)];
            let action: Action = keys.iter().cloned().zip(values.iter().copied()).collect();
            self.robot.send_action(&action)?;
            tokio::time::sleep(tick).await;
        }

        Ok(())
    }

    async fn run_rl_agent(&self, step: &AssemblyStep, started: Instant) -> StepResult {
        let agent = self
            .rl_agents
            .as_ref()
            .and_then(|loader| loader.load(&self.assembly_id, &step.id));

        let Some(agent) = agent else {
            info!(step_id = %step.id, "No RL checkpoint for step, falling back to policy");
            return self.run_policy(step, started).await;
        };

        info!(step_id = %step.id, horizon = self.config.rl_horizon, "Running RL policy inference");

        let tick = self.config.tick_interval();
        let run = async {
            for _ in 0..self.config.rl_horizon {
                let observation = self.robot.get_observation()?;
                let action = agent.select_action(&observation)?;
                self.robot.send_action(&action)?;
                tokio::time::sleep(tick).await;
            }
            Ok::<(), PolicyError>(())
        };

        match run.await {
            Ok(()) => StepResult::success(HandlerUsed::RlFinetune, elapsed_ms(started)),
            Err(e) => {
                error!(step_id = %step.id, error = %e, "RL policy inference failed");
                StepResult::failure(HandlerUsed::RlFinetune, elapsed_ms(started), e.to_string())
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
