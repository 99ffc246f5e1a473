//! Application configuration types

use aura_analytics::AnalyticsBackendConfig;
use aura_core::{RouterConfig, SequencerConfig};
use aura_perception::VerifierConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub sequencer: SequencerConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub verifier: VerifierConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Filesystem layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Assembly graph JSON files, one per assembly id
    #[serde(default = "default_assemblies_dir")]
    pub assemblies_dir: PathBuf,
    /// Policy checkpoints, `<assembly_id>/<step_id>/` per step
    #[serde(default = "default_policies_dir")]
    pub policies_dir: PathBuf,
    /// Analytics database directory
    #[serde(default = "default_analytics_dir")]
    pub analytics_dir: PathBuf,
    /// "sqlite" or "memory"
    #[serde(default = "default_analytics_backend")]
    pub analytics_backend: String,
}

fn default_assemblies_dir() -> PathBuf {
    PathBuf::from("configs/assemblies")
}

fn default_policies_dir() -> PathBuf {
    PathBuf::from("data/policies")
}

fn default_analytics_dir() -> PathBuf {
    PathBuf::from("data/analytics")
}

fn default_analytics_backend() -> String {
    "sqlite".to_string()
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            assemblies_dir: default_assemblies_dir(),
            policies_dir: default_policies_dir(),
            analytics_dir: default_analytics_dir(),
            analytics_backend: default_analytics_backend(),
        }
    }
}

impl DataConfig {
    /// Analytics backend settings derived from the data layout
    pub fn analytics(&self) -> AnalyticsBackendConfig {
        AnalyticsBackendConfig {
            backend: self.analytics_backend.clone(),
            dir: self.analytics_dir.clone(),
        }
    }

    /// Resolve a graph argument: an existing file path, or an assembly id
    /// looked up in the assemblies directory
    pub fn graph_path(&self, graph: &str) -> PathBuf {
        let direct = Path::new(graph);
        if direct.is_file() {
            return direct.to_path_buf();
        }
        self.assemblies_dir.join(format!("{}.json", graph))
    }
}

/// Simulated hardware
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Time one simulated primitive takes
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    /// Primitive calls that fail per step before one succeeds
    #[serde(default)]
    pub fail_first_attempts: u32,
}

fn default_step_delay_ms() -> u64 {
    50
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            step_delay_ms: default_step_delay_ms(),
            fail_first_attempts: 0,
        }
    }
}

/// Log output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_filter() -> String {
    "aura=info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    /// Whether to emit JSON lines
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}
