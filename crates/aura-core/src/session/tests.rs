use super::*;
use crate::router::{
    Action, Observation, Policy, PolicyLoader, PrimitiveError, PrimitiveLibrary, PrimitiveOutcome,
    Robot, RobotError,
};
use crate::types::Phase;
use async_trait::async_trait;
use aura_assembly::{AssemblyStep, PrimitiveParams};
use std::time::Duration;
use tokio::sync::Semaphore;

struct NullRobot;

impl Robot for NullRobot {
    fn get_observation(&self) -> Result<Observation, RobotError> {
        Ok(Observation::new())
    }

    fn send_action(&self, _action: &Action) -> Result<(), RobotError> {
        Ok(())
    }
}

struct NoPolicies;

impl PolicyLoader for NoPolicies {
    fn load(&self, _assembly_id: &str, _step_id: &str) -> Option<Arc<dyn Policy>> {
        None
    }
}

/// Each call waits for one permit, then succeeds
struct GatedPrimitives(Arc<Semaphore>);

#[async_trait]
impl PrimitiveLibrary for GatedPrimitives {
    async fn run(
        &self,
        _name: &str,
        _robot: Arc<dyn Robot>,
        _params: Option<PrimitiveParams>,
    ) -> Result<PrimitiveOutcome, PrimitiveError> {
        self.0.acquire().await.unwrap().forget();
        Ok(PrimitiveOutcome::succeeded())
    }
}

fn graph() -> AssemblyGraph {
    AssemblyGraph::new("gearbox", "Gearbox")
        .with_step(AssemblyStep::primitive("s1", "Pick", "pick"))
        .with_step(AssemblyStep::primitive("s2", "Place", "place"))
}

fn router(gate: &Arc<Semaphore>) -> PolicyRouter {
    PolicyRouter::new(
        Arc::new(GatedPrimitives(Arc::clone(gate))),
        Arc::new(NullRobot),
        Arc::new(NoPolicies),
        "gearbox",
    )
}

fn session() -> ExecutionSession {
    let callback: StateCallback = Arc::new(|_: &ExecutionState| -> anyhow::Result<()> { Ok(()) });
    ExecutionSession::new(callback)
        .with_config(SequencerConfig::new().with_retry_backoff(Duration::from_millis(1)))
}

async fn wait_for_phase(session: &ExecutionSession, phase: Phase) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while session.state().await.phase != phase {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("timed out waiting for phase");
}

#[tokio::test]
async fn test_state_defaults_to_idle() {
    let session = session();
    let state = session.state().await;

    assert_eq!(state.phase, Phase::Idle);
    assert!(state.assembly_id.is_none());
    assert!(state.step_states.is_empty());
    assert!(session.sequencer().await.is_none());
}

#[tokio::test]
async fn test_commands_without_execution() {
    let session = session();

    assert!(matches!(session.pause().await, Err(SessionError::NoActiveExecution)));
    assert!(matches!(session.resume().await, Err(SessionError::NoActiveExecution)));
    assert!(matches!(session.stop().await, Err(SessionError::NoActiveExecution)));
    assert!(matches!(
        session.complete_human_step(true).await,
        Err(SessionError::NoActiveExecution)
    ));
}

#[tokio::test]
async fn test_launch_rejects_empty_graph() {
    let session = session();
    let gate = Arc::new(Semaphore::new(0));

    let result = session
        .launch(AssemblyGraph::new("empty", "Empty"), router(&gate))
        .await;
    assert!(matches!(
        result,
        Err(SessionError::Core(Error::EmptyStepOrder(_)))
    ));
    assert!(session.sequencer().await.is_none());
}

#[tokio::test]
async fn test_second_launch_conflicts_while_active() {
    let session = session();
    let gate = Arc::new(Semaphore::new(0));

    let first = session.launch(graph(), router(&gate)).await.unwrap();
    let second = session.launch(graph(), router(&gate)).await;

    assert!(matches!(
        second,
        Err(SessionError::Conflict { command: "launch", .. })
    ));
    let current = session.sequencer().await.unwrap();
    assert!(Arc::ptr_eq(&first, &current));

    session.stop().await.unwrap();
}

#[tokio::test]
async fn test_launch_replaces_finished_run() {
    let session = session();
    let gate = Arc::new(Semaphore::new(10));

    let first = session.launch(graph(), router(&gate)).await.unwrap();
    wait_for_phase(&session, Phase::Complete).await;

    let second = session.launch(graph(), router(&gate)).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    wait_for_phase(&session, Phase::Complete).await;
}

#[tokio::test]
async fn test_ignored_commands_map_to_conflict() {
    let session = session();
    let gate = Arc::new(Semaphore::new(0));
    session.launch(graph(), router(&gate)).await.unwrap();

    let err = session.resume().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Conflict { command: "resume", .. }
    ));
    assert!(err.to_string().starts_with("Cannot resume while"));

    assert!(matches!(
        session.complete_human_step(true).await,
        Err(SessionError::Conflict { .. })
    ));

    session.pause().await.unwrap();
    assert_eq!(session.state().await.phase, Phase::Paused);
    assert!(matches!(
        session.pause().await,
        Err(SessionError::Conflict { command: "pause", state: SequencerState::Paused })
    ));

    session.stop().await.unwrap();
    assert_eq!(session.state().await.phase, Phase::Idle);
    assert!(matches!(
        session.stop().await,
        Err(SessionError::Conflict { command: "stop", state: SequencerState::Idle })
    ));
}
