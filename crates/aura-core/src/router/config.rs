//! Router configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_control_rate_hz() -> f64 {
    50.0
}

fn default_rl_horizon() -> u32 {
    100
}

/// Control-loop timing for policy and RL dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Ticks per second while replaying or running an agent
    #[serde(default = "default_control_rate_hz")]
    pub control_rate_hz: f64,
    /// Ticks an RL agent runs for
    #[serde(default = "default_rl_horizon")]
    pub rl_horizon: u32,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            control_rate_hz: default_control_rate_hz(),
            rl_horizon: default_rl_horizon(),
        }
    }
}

impl RouterConfig {
    /// Create a config with default timing
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the control rate
    #[must_use]
    pub fn with_control_rate_hz(mut self, hz: f64) -> Self {
        self.control_rate_hz = hz;
        self
    }

    /// Set the RL tick budget
    #[must_use]
    pub fn with_rl_horizon(mut self, ticks: u32) -> Self {
        self.rl_horizon = ticks;
        self
    }

    /// Sleep between ticks; zero when the rate is not positive
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        if self.control_rate_hz.is_finite() && self.control_rate_hz > 0.0 {
            Duration::from_secs_f64(1.0 / self.control_rate_hz)
        } else {
            Duration::ZERO
        }
    }
}
