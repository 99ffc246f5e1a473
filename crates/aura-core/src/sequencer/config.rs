//! Sequencer configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// What happens when a human reports that they could not finish a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HumanFailurePolicy {
    /// Mark the step failed and move on
    #[default]
    Advance,
    /// Mark the step failed and end the run in error
    Halt,
    /// Restart the step from attempt 1
    Retry,
}

impl fmt::Display for HumanFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Advance => write!(f, "advance"),
            Self::Halt => write!(f, "halt"),
            Self::Retry => write!(f, "retry"),
        }
    }
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_demo_delay_ms() -> u64 {
    300
}

/// Configuration for the sequencer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencerConfig {
    /// Pause between a failed attempt and the next one
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Replace dispatch with a simulated success
    #[serde(default)]
    pub demo_mode: bool,
    /// Simulated step duration in demo mode
    #[serde(default = "default_demo_delay_ms")]
    pub demo_delay_ms: u64,
    /// Reaction to `complete_human_step(false)`
    #[serde(default)]
    pub human_failure_policy: HumanFailurePolicy,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            retry_backoff_ms: default_retry_backoff_ms(),
            demo_mode: false,
            demo_delay_ms: default_demo_delay_ms(),
            human_failure_policy: HumanFailurePolicy::default(),
        }
    }
}

impl SequencerConfig {
    /// Create a new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retry backoff
    #[must_use]
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Enable or disable demo mode
    #[must_use]
    pub fn with_demo_mode(mut self, enabled: bool) -> Self {
        self.demo_mode = enabled;
        self
    }

    /// Set the simulated step duration
    #[must_use]
    pub fn with_demo_delay(mut self, delay: Duration) -> Self {
        self.demo_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the human failure policy
    #[must_use]
    pub fn with_human_failure_policy(mut self, policy: HumanFailurePolicy) -> Self {
        self.human_failure_policy = policy;
        self
    }

    /// Retry backoff as a duration
    #[must_use]
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Demo delay as a duration
    #[must_use]
    pub fn demo_delay(&self) -> Duration {
        Duration::from_millis(self.demo_delay_ms)
    }
}
