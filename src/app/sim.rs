//! Simulated hardware and file-backed checkpoints
//!
//! Lets the engine run end to end without an arm attached. Primitives move
//! a simulated robot and report synthetic force profiles shaped like the
//! real contact they stand in for.

use async_trait::async_trait;
use aura_assembly::PrimitiveParams;
use aura_core::{
    Action, Observation, Policy, PolicyError, PolicyLoader, PrimitiveError, PrimitiveLibrary,
    PrimitiveOutcome, RlAgent, RlLoader, Robot, RobotError,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Joint names of the simulated arm
pub const JOINTS: [&str; 6] = [
    "shoulder_pan",
    "shoulder_lift",
    "elbow_flex",
    "wrist_flex",
    "wrist_roll",
    "gripper",
];

/// Primitives the simulator knows
pub const PRIMITIVES: [&str; 7] = [
    "move_to",
    "pick",
    "place",
    "guarded_move",
    "linear_insert",
    "screw",
    "press_fit",
];

/// Checkpoint file for imitation policies
pub const POLICY_FILE: &str = "policy.json";

/// Checkpoint file for RL agents
pub const RL_POLICY_FILE: &str = "policy_rl.json";

/// Arm whose state is whatever it was last told
pub struct SimulatedRobot {
    state: Mutex<Observation>,
}

impl SimulatedRobot {
    /// Arm at rest with every joint at zero
    pub fn new() -> Self {
        let state = JOINTS.iter().map(|j| (j.to_string(), 0.0)).collect();
        Self {
            state: Mutex::new(state),
        }
    }
}

impl Default for SimulatedRobot {
    fn default() -> Self {
        Self::new()
    }
}

impl Robot for SimulatedRobot {
    fn get_observation(&self) -> Result<Observation, RobotError> {
        Ok(self.state.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn send_action(&self, action: &Action) -> Result<(), RobotError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.extend(action.iter().map(|(k, v)| (k.clone(), *v)));
        Ok(())
    }
}

/// Primitive library that succeeds after an optional number of failures
pub struct SimulatedPrimitives {
    delay: Duration,
    fail_first: u32,
    calls: Mutex<HashMap<String, u32>>,
}

impl SimulatedPrimitives {
    /// Each call takes `delay`
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            fail_first: 0,
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// The first `count` calls of every primitive fail
    pub fn with_failures(mut self, count: u32) -> Self {
        self.fail_first = count;
        self
    }

    fn next_call(&self, name: &str) -> u32 {
        let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        let count = calls.entry(name.to_string()).or_insert(0);
        *count += 1;
        *count
    }
}

fn target_position(name: &str, params: Option<&PrimitiveParams>) -> Result<Option<Vec<f64>>, PrimitiveError> {
    let Some(value) = params.and_then(|p| p.get("target")) else {
        return Ok(None);
    };

    let invalid = || PrimitiveError::InvalidParams {
        primitive: name.to_string(),
        message: "target must be an array of numbers".to_string(),
    };
    let Value::Array(items) = value else {
        return Err(invalid());
    };
    items
        .iter()
        .map(|v| v.as_f64().ok_or_else(invalid))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// Per-tick force magnitudes for a primitive
fn force_profile(name: &str, params: Option<&PrimitiveParams>) -> Vec<f64> {
    match name {
        "press_fit" | "linear_insert" => vec![0.8, 1.0, 1.2, 1.1, 6.5, 1.0, 0.9],
        "screw" => vec![1.5; 12],
        "guarded_move" => {
            let limit = params
                .and_then(|p| p.get("force"))
                .and_then(Value::as_f64)
                .unwrap_or(5.0);
            vec![0.2, limit * 0.5, limit]
        }
        _ => vec![0.2],
    }
}

#[async_trait]
impl PrimitiveLibrary for SimulatedPrimitives {
    async fn run(
        &self,
        name: &str,
        robot: Arc<dyn Robot>,
        params: Option<PrimitiveParams>,
    ) -> Result<PrimitiveOutcome, PrimitiveError> {
        if !PRIMITIVES.iter().any(|p| *p == name) {
            return Err(PrimitiveError::Unknown(name.to_string()));
        }
        let target = target_position(name, params.as_ref())?;

        let mut action = Action::new();
        match name {
            "pick" => {
                action.insert("gripper".to_string(), 1.0);
            }
            "place" => {
                action.insert("gripper".to_string(), 0.0);
            }
            _ => {}
        }
        robot.send_action(&action)?;

        tokio::time::sleep(self.delay).await;

        let call = self.next_call(name);
        if call <= self.fail_first {
            debug!(primitive = name, call, "Simulated primitive failure");
            return Ok(PrimitiveOutcome::failed(format!(
                "Simulated {} failure ({}/{})",
                name, call, self.fail_first
            )));
        }

        let forces = force_profile(name, params.as_ref());
        let peak = forces.iter().copied().fold(0.0, f64::max);
        Ok(PrimitiveOutcome {
            success: true,
            error_message: None,
            actual_force: Some(peak),
            actual_position: Some(target.unwrap_or_else(|| vec![0.0, 0.0, 0.0])),
            force_history: forces.into_iter().map(|f| vec![0.0, 0.0, f]).collect(),
        })
    }
}

/// Recorded action chunk replayed as a policy
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayCheckpoint {
    /// Ticks per chunk
    pub chunk_size: usize,
    /// Joint name of each action column
    #[serde(default)]
    pub joint_keys: Vec<String>,
    /// Recorded actions
    pub actions: Vec<Vec<f64>>,
}

impl Policy for ReplayCheckpoint {
    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn joint_keys(&self) -> Vec<String> {
        self.joint_keys.clone()
    }

    fn predict(&self, _observation: &Observation) -> Result<Vec<Vec<f64>>, PolicyError> {
        Ok(self.actions.clone())
    }
}

/// Proportional controller toward a fixed joint target
#[derive(Debug, Clone, Deserialize)]
pub struct ProportionalAgent {
    /// Joint targets
    pub target: BTreeMap<String, f64>,
    /// Fraction of the remaining error closed per tick
    #[serde(default = "default_gain")]
    pub gain: f64,
}

fn default_gain() -> f64 {
    0.2
}

impl RlAgent for ProportionalAgent {
    fn select_action(&self, observation: &Observation) -> Result<Action, PolicyError> {
        Ok(self
            .target
            .iter()
            .map(|(joint, goal)| {
                let current = observation.get(joint).copied().unwrap_or(0.0);
                (joint.clone(), current + self.gain * (goal - current))
            })
            .collect())
    }
}

fn read_checkpoint<T: for<'de> Deserialize<'de>>(path: &Path) -> Option<T> {
    if !path.is_file() {
        return None;
    }
    let loaded = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|s| serde_json::from_str(&s).map_err(|e| e.to_string()));
    match loaded {
        Ok(checkpoint) => Some(checkpoint),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to load checkpoint");
            None
        }
    }
}

/// Loads checkpoints from `<root>/<assembly_id>/<step_id>/`
pub struct FilePolicyLoader {
    root: PathBuf,
    cache: Mutex<HashMap<(String, String), Arc<ReplayCheckpoint>>>,
}

impl FilePolicyLoader {
    /// Loader rooted at the policies directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn step_dir(&self, assembly_id: &str, step_id: &str) -> PathBuf {
        self.root.join(assembly_id).join(step_id)
    }
}

impl PolicyLoader for FilePolicyLoader {
    fn load(&self, assembly_id: &str, step_id: &str) -> Option<Arc<dyn Policy>> {
        let key = (assembly_id.to_string(), step_id.to_string());
        if let Some(hit) = self.cache.lock().unwrap_or_else(|e| e.into_inner()).get(&key) {
            return Some(Arc::clone(hit) as Arc<dyn Policy>);
        }

        let path = self.step_dir(assembly_id, step_id).join(POLICY_FILE);
        let checkpoint: ReplayCheckpoint = read_checkpoint(&path)?;
        debug!(path = %path.display(), chunk_size = checkpoint.chunk_size, "Policy loaded");

        let checkpoint = Arc::new(checkpoint);
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, Arc::clone(&checkpoint));
        Some(checkpoint)
    }
}

impl RlLoader for FilePolicyLoader {
    fn load(&self, assembly_id: &str, step_id: &str) -> Option<Arc<dyn RlAgent>> {
        let path = self.step_dir(assembly_id, step_id).join(RL_POLICY_FILE);
        let agent: ProportionalAgent = read_checkpoint(&path)?;
        Some(Arc::new(agent))
    }
}
