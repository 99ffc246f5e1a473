//! Verifier tuning

use serde::{Deserialize, Serialize};

/// Force signature detection thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureConfig {
    /// Snap fit: a spike must reach this multiple of the median force
    #[serde(default = "default_spike_ratio")]
    pub spike_ratio: f64,
    /// Snap fit: after the spike, force must fall to this fraction of it
    #[serde(default = "default_drop_ratio")]
    pub drop_ratio: f64,
    /// Meshing: force in newtons that counts as contact
    #[serde(default = "default_contact_force")]
    pub contact_force: f64,
    /// Meshing: ticks of contact required
    #[serde(default = "default_min_contact_ticks")]
    pub min_contact_ticks: usize,
}

fn default_spike_ratio() -> f64 {
    2.0
}

fn default_drop_ratio() -> f64 {
    0.5
}

fn default_contact_force() -> f64 {
    1.0
}

fn default_min_contact_ticks() -> usize {
    10
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            spike_ratio: default_spike_ratio(),
            drop_ratio: default_drop_ratio(),
            contact_force: default_contact_force(),
            min_contact_ticks: default_min_contact_ticks(),
        }
    }
}

/// Verifier configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Skip verification entirely
    #[serde(default)]
    pub disabled: bool,
    /// Force signature thresholds
    #[serde(default)]
    pub signature: SignatureConfig,
}
