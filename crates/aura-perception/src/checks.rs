//! Criteria checkers
//!
//! Each checker is a pure function of the attempt's telemetry.

use crate::config::SignatureConfig;
use aura_core::{ExecutionData, VerificationResult};

/// Confidence reported by direct measurements
const MEASURED_CONFIDENCE: f64 = 0.9;

/// Confidence of a pass with nothing to compare against
const UNCHECKED_CONFIDENCE: f64 = 0.5;

/// Confidence of a pass on an unrecognized force pattern
const UNKNOWN_PATTERN_CONFIDENCE: f64 = 0.3;

/// Fewest samples a signature can be read from
const MIN_SIGNATURE_SAMPLES: usize = 3;

/// Final position within `tolerance` (max per-axis error) of `target`
pub fn check_position(
    data: &ExecutionData,
    target: Option<&[f64]>,
    tolerance: f64,
) -> VerificationResult {
    let Some(actual) = data.final_position.as_deref() else {
        return VerificationResult::fail(MEASURED_CONFIDENCE, "No final position reported");
    };

    let Some(target) = target else {
        return VerificationResult::pass(
            UNCHECKED_CONFIDENCE,
            "Final position reported, no target to compare",
        );
    };

    if actual.len() != target.len() {
        return VerificationResult::fail(
            MEASURED_CONFIDENCE,
            format!(
                "Position has {} axes, target has {}",
                actual.len(),
                target.len()
            ),
        );
    }

    let error = actual
        .iter()
        .zip(target)
        .map(|(a, t)| (a - t).abs())
        .fold(0.0, f64::max);

    if error <= tolerance {
        VerificationResult::pass(
            MEASURED_CONFIDENCE,
            format!("Position error {:.4} within {:.4}", error, tolerance),
        )
    } else {
        VerificationResult::fail(
            MEASURED_CONFIDENCE,
            format!("Position error {:.4} exceeds {:.4}", error, tolerance),
        )
    }
}

/// Peak force (or the final force when no peak was reported) reaches `threshold`
pub fn check_force_threshold(data: &ExecutionData, threshold: f64) -> VerificationResult {
    let observed = match data.peak_force {
        Some(peak) => peak,
        None if data.force_history.is_empty() => {
            return VerificationResult::fail(MEASURED_CONFIDENCE, "No force telemetry");
        }
        None => data
            .force_history
            .iter()
            .copied()
            .fold(data.final_force, f64::max),
    };

    if observed >= threshold {
        VerificationResult::pass(
            MEASURED_CONFIDENCE,
            format!("Force {:.2} N reached {:.2} N", observed, threshold),
        )
    } else {
        VerificationResult::fail(
            MEASURED_CONFIDENCE,
            format!("Force {:.2} N below {:.2} N", observed, threshold),
        )
    }
}

/// Force profile matches the named signature
pub fn check_force_signature(
    data: &ExecutionData,
    pattern: &str,
    config: &SignatureConfig,
) -> VerificationResult {
    match pattern {
        "snap_fit" => check_snap_fit(&data.force_history, config),
        "meshing" => check_meshing(&data.force_history, config),
        other => VerificationResult::pass(
            UNKNOWN_PATTERN_CONFIDENCE,
            format!("No signature check for pattern '{}'", other),
        ),
    }
}

/// A spike well above the median followed by a drop
fn check_snap_fit(history: &[f64], config: &SignatureConfig) -> VerificationResult {
    if history.len() < MIN_SIGNATURE_SAMPLES {
        return VerificationResult::fail(
            UNCHECKED_CONFIDENCE,
            format!("Only {} force samples", history.len()),
        );
    }

    let baseline = median(history).max(f64::EPSILON);
    let spike_floor = baseline * config.spike_ratio;

    let snapped = history.iter().enumerate().any(|(i, &spike)| {
        spike >= spike_floor
            && history[i + 1..]
                .iter()
                .any(|&after| after <= spike * config.drop_ratio)
    });

    if snapped {
        VerificationResult::pass(
            MEASURED_CONFIDENCE,
            format!("Snap detected above {:.2} N", spike_floor),
        )
    } else {
        VerificationResult::fail(
            MEASURED_CONFIDENCE,
            format!("No snap: no spike above {:.2} N followed by a drop", spike_floor),
        )
    }
}

/// Sustained contact force
fn check_meshing(history: &[f64], config: &SignatureConfig) -> VerificationResult {
    let contact_ticks = history
        .iter()
        .filter(|&&f| f >= config.contact_force)
        .count();

    if contact_ticks >= config.min_contact_ticks {
        VerificationResult::pass(
            MEASURED_CONFIDENCE,
            format!("{} ticks in contact", contact_ticks),
        )
    } else {
        VerificationResult::fail(
            MEASURED_CONFIDENCE,
            format!(
                "{} ticks in contact, need {}",
                contact_ticks, config.min_contact_ticks
            ),
        )
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_position(position: Vec<f64>) -> ExecutionData {
        ExecutionData {
            final_position: Some(position),
            ..Default::default()
        }
    }

    fn with_forces(history: Vec<f64>) -> ExecutionData {
        ExecutionData {
            final_force: history.last().copied().unwrap_or(0.0),
            force_history: history,
            ..Default::default()
        }
    }

    #[test]
    fn test_position_within_tolerance() {
        let data = with_position(vec![0.301, 0.0, 0.049]);
        let result = check_position(&data, Some(&[0.3, 0.0, 0.05]), 0.005);
        assert!(result.passed);
    }

    #[test]
    fn test_position_uses_max_axis_error() {
        let data = with_position(vec![0.3, 0.0, 0.06]);
        let result = check_position(&data, Some(&[0.3, 0.0, 0.05]), 0.005);
        assert!(!result.passed);
        assert!(result.detail.contains("exceeds"));
    }

    #[test]
    fn test_position_missing() {
        let result = check_position(&ExecutionData::default(), Some(&[0.0]), 0.005);
        assert!(!result.passed);
        assert_eq!(result.detail, "No final position reported");
    }

    #[test]
    fn test_position_without_target() {
        let result = check_position(&with_position(vec![1.0, 2.0, 3.0]), None, 0.005);
        assert!(result.passed);
        assert_eq!(result.confidence, UNCHECKED_CONFIDENCE);
    }

    #[test]
    fn test_position_axis_mismatch() {
        let result = check_position(&with_position(vec![1.0, 2.0]), Some(&[1.0, 2.0, 3.0]), 0.1);
        assert!(!result.passed);
    }

    #[test]
    fn test_force_threshold_prefers_peak() {
        let data = ExecutionData {
            peak_force: Some(12.0),
            final_force: 1.0,
            force_history: vec![1.0],
            ..Default::default()
        };
        assert!(check_force_threshold(&data, 10.0).passed);
    }

    #[test]
    fn test_force_threshold_from_history() {
        let data = with_forces(vec![2.0, 8.0, 3.0]);
        assert!(check_force_threshold(&data, 8.0).passed);
        assert!(!check_force_threshold(&data, 8.5).passed);
    }

    #[test]
    fn test_force_threshold_no_telemetry() {
        let result = check_force_threshold(&ExecutionData::default(), 1.0);
        assert!(!result.passed);
        assert_eq!(result.detail, "No force telemetry");
    }

    #[test]
    fn test_snap_fit_detected() {
        let data = with_forces(vec![1.0, 1.2, 1.1, 6.0, 1.0, 0.9]);
        let result = check_force_signature(&data, "snap_fit", &SignatureConfig::default());
        assert!(result.passed, "{}", result.detail);
    }

    #[test]
    fn test_snap_fit_spike_without_drop() {
        let data = with_forces(vec![1.0, 1.1, 1.0, 6.0, 6.5]);
        let result = check_force_signature(&data, "snap_fit", &SignatureConfig::default());
        assert!(!result.passed);
    }

    #[test]
    fn test_snap_fit_flat_profile() {
        let data = with_forces(vec![2.0; 8]);
        let result = check_force_signature(&data, "snap_fit", &SignatureConfig::default());
        assert!(!result.passed);
    }

    #[test]
    fn test_snap_fit_too_few_samples() {
        let data = with_forces(vec![1.0, 9.0]);
        let result = check_force_signature(&data, "snap_fit", &SignatureConfig::default());
        assert!(!result.passed);
    }

    #[test]
    fn test_meshing_sustained_contact() {
        let config = SignatureConfig {
            min_contact_ticks: 3,
            ..Default::default()
        };
        let meshed = with_forces(vec![0.2, 1.5, 1.8, 2.0, 0.4]);
        let slipped = with_forces(vec![0.2, 1.5, 0.3, 0.1, 0.4]);

        assert!(check_force_signature(&meshed, "meshing", &config).passed);
        assert!(!check_force_signature(&slipped, "meshing", &config).passed);
    }

    #[test]
    fn test_unknown_pattern_passes_low_confidence() {
        let result = check_force_signature(&ExecutionData::default(), "twist_lock", &SignatureConfig::default());
        assert!(result.passed);
        assert_eq!(result.confidence, UNKNOWN_PATTERN_CONFIDENCE);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
    }
}
