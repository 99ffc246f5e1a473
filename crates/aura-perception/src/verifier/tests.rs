use super::*;
use crate::classifier::MockOutcomeClassifier;

fn step(criteria: SuccessCriteria) -> AssemblyStep {
    AssemblyStep::primitive("s1", "Insert gear", "insert").with_criteria(criteria)
}

fn data() -> ExecutionData {
    ExecutionData {
        final_position: Some(vec![0.3, 0.0, 0.05]),
        force_history: vec![0.5, 0.6, 4.0, 0.4],
        peak_force: Some(4.0),
        final_force: 0.4,
        duration_ms: 250.0,
    }
}

fn classifier_criteria(min_confidence: f64) -> SuccessCriteria {
    SuccessCriteria::Classifier {
        model: Some("gear_seated_v2".to_string()),
        min_confidence,
    }
}

#[tokio::test]
async fn test_position_routed() {
    let verifier = CriteriaVerifier::default();
    let criteria = SuccessCriteria::Position {
        target: Some(vec![0.3, 0.0, 0.05]),
        tolerance: 0.001,
    };

    let result = verifier.verify(&step(criteria), &data()).await.unwrap();
    assert!(result.passed);
}

#[tokio::test]
async fn test_force_threshold_routed() {
    let verifier = CriteriaVerifier::default();
    let result = verifier
        .verify(&step(SuccessCriteria::ForceThreshold { threshold: 5.0 }), &data())
        .await
        .unwrap();
    assert!(!result.passed);
}

#[tokio::test]
async fn test_force_signature_routed() {
    let verifier = CriteriaVerifier::default();
    let criteria = SuccessCriteria::ForceSignature {
        pattern: "snap_fit".to_string(),
    };
    let result = verifier.verify(&step(criteria), &data()).await.unwrap();
    assert!(result.passed, "{}", result.detail);
}

#[tokio::test]
async fn test_disabled_passes_everything() {
    let verifier = CriteriaVerifier::new(VerifierConfig {
        disabled: true,
        ..Default::default()
    });
    let result = verifier
        .verify(
            &step(SuccessCriteria::ForceThreshold { threshold: 100.0 }),
            &ExecutionData::default(),
        )
        .await
        .unwrap();
    assert!(result.passed);
}

#[tokio::test]
async fn test_classifier_absent_passes_half_confidence() {
    let verifier = CriteriaVerifier::default();
    let result = verifier
        .verify(&step(classifier_criteria(0.8)), &data())
        .await
        .unwrap();

    assert!(result.passed);
    assert_eq!(result.confidence, 0.5);
}

#[tokio::test]
async fn test_classifier_threshold() {
    let mut classifier = MockOutcomeClassifier::new();
    classifier
        .expect_classify()
        .withf(|step, data| step.id == "s1" && data.duration_ms == 250.0)
        .times(2)
        .returning(|_, _| Ok(0.7));
    let verifier = CriteriaVerifier::default().with_classifier(Arc::new(classifier));

    let lenient = verifier
        .verify(&step(classifier_criteria(0.6)), &data())
        .await
        .unwrap();
    assert!(lenient.passed);
    assert_eq!(lenient.confidence, 0.7);

    let strict = verifier
        .verify(&step(classifier_criteria(0.9)), &data())
        .await
        .unwrap();
    assert!(!strict.passed);
    assert!((strict.confidence - 0.3).abs() < 1e-9);
}

#[tokio::test]
async fn test_classifier_error_propagates() {
    let mut classifier = MockOutcomeClassifier::new();
    classifier
        .expect_classify()
        .returning(|_, _| Err(VerificationError::Classifier("model not loaded".to_string())));
    let verifier = CriteriaVerifier::default().with_classifier(Arc::new(classifier));

    let result = verifier.verify(&step(classifier_criteria(0.5)), &data()).await;
    assert!(matches!(result, Err(VerificationError::Classifier(_))));
}

#[tokio::test]
async fn test_classifier_out_of_range() {
    let mut classifier = MockOutcomeClassifier::new();
    classifier.expect_classify().returning(|_, _| Ok(1.5));
    let verifier = CriteriaVerifier::default().with_classifier(Arc::new(classifier));

    let result = verifier.verify(&step(classifier_criteria(0.5)), &data()).await;
    assert!(result.is_err());
}
