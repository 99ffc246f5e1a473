//! Builds engine components from configuration

use super::config::AppConfig;
use super::sim::{FilePolicyLoader, SimulatedPrimitives, SimulatedRobot};
use aura_core::{
    AnalyticsStore, Error, ExecutionSession, PolicyRouter, Result, SequencerConfig, StateCallback,
};
use aura_perception::CriteriaVerifier;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Reject settings the engine cannot run with
pub fn validate(config: &AppConfig) -> Result<()> {
    if !config.router.control_rate_hz.is_finite() || config.router.control_rate_hz <= 0.0 {
        return Err(Error::Configuration(format!(
            "router.control_rate_hz must be positive, got {}",
            config.router.control_rate_hz
        )));
    }
    if config.verifier.signature.drop_ratio <= 0.0 || config.verifier.signature.drop_ratio >= 1.0 {
        return Err(Error::Configuration(format!(
            "verifier.signature.drop_ratio must be between 0 and 1, got {}",
            config.verifier.signature.drop_ratio
        )));
    }
    Ok(())
}

/// Router over the simulated arm for one assembly
pub fn build_router(config: &AppConfig, assembly_id: &str, fail_first: u32) -> PolicyRouter {
    let primitives = SimulatedPrimitives::new(Duration::from_millis(config.simulation.step_delay_ms))
        .with_failures(fail_first);
    let checkpoints = Arc::new(FilePolicyLoader::new(&config.data.policies_dir));

    debug!(
        assembly_id,
        policies_dir = %config.data.policies_dir.display(),
        fail_first,
        "Building policy router"
    );

    PolicyRouter::new(
        Arc::new(primitives),
        Arc::new(SimulatedRobot::new()),
        Arc::clone(&checkpoints) as Arc<dyn aura_core::PolicyLoader>,
        assembly_id,
    )
    .with_rl_loader(checkpoints)
    .with_config(config.router.clone())
}

/// Session wired to analytics, the verifier and a shutdown token
pub fn build_session(
    config: &AppConfig,
    sequencer: SequencerConfig,
    callback: StateCallback,
    analytics: Arc<dyn AnalyticsStore>,
    shutdown: CancellationToken,
) -> ExecutionSession {
    info!(
        demo_mode = sequencer.demo_mode,
        human_failure_policy = %sequencer.human_failure_policy,
        verifier_disabled = config.verifier.disabled,
        "Building execution session"
    );

    ExecutionSession::new(callback)
        .with_config(sequencer)
        .with_analytics(analytics)
        .with_verifier(Arc::new(CriteriaVerifier::new(config.verifier.clone())))
        .with_shutdown_token(shutdown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_control_rate_rejected() {
        let mut config = AppConfig::default();
        config.router.control_rate_hz = 0.0;

        let err = validate(&config).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("control_rate_hz"));
    }

    #[test]
    fn test_drop_ratio_bounds() {
        let mut config = AppConfig::default();
        config.verifier.signature.drop_ratio = 1.5;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_router_keeps_assembly_id() {
        let router = build_router(&AppConfig::default(), "gearbox", 0);
        assert_eq!(router.assembly_id(), "gearbox");
    }
}
