use super::*;
use crate::step::{Handler, SuccessCriteria};

const GEARBOX_JSON: &str = r#"{
    "id": "gearbox_v2",
    "name": "Planetary gearbox",
    "parts": {
        "housing": {"id": "housing", "cadFile": "housing.step", "graspPoints": [{"pose": [0, 0, 0.02]}]},
        "sun_gear": {"id": "sun_gear"}
    },
    "steps": {
        "step_001": {
            "id": "step_001",
            "name": "Place housing",
            "partIds": ["housing"],
            "handler": "primitive",
            "primitiveType": "place",
            "primitiveParams": {"part_id": "housing"},
            "successCriteria": {"type": "position", "target": [0.3, 0.0, 0.05], "tolerance": 0.002}
        },
        "step_002": {
            "id": "step_002",
            "name": "Insert sun gear",
            "partIds": ["sun_gear"],
            "dependencies": ["step_001"],
            "handler": "policy",
            "policyId": "gearbox_v2/step_002",
            "successCriteria": {"type": "force_signature", "pattern": "meshing"},
            "maxRetries": 2
        }
    },
    "stepOrder": ["step_001", "step_002"]
}"#;

#[test]
fn test_load_from_str() {
    let graph = AssemblyGraph::from_json_str(GEARBOX_JSON).unwrap();

    assert_eq!(graph.id, "gearbox_v2");
    assert_eq!(graph.parts.len(), 2);
    assert_eq!(graph.parts["housing"].cad_file.as_deref(), Some("housing.step"));

    let ids: Vec<&str> = graph.ordered_steps().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["step_001", "step_002"]);

    let insert = graph.step("step_002").unwrap();
    assert_eq!(insert.handler, Handler::Policy);
    assert_eq!(insert.max_retries, 2);
    assert_eq!(
        insert.success_criteria,
        SuccessCriteria::ForceSignature {
            pattern: "meshing".to_string()
        }
    );
}

#[test]
fn test_empty_step_order_rejected() {
    let graph = AssemblyGraph::new("empty", "Nothing");
    assert!(matches!(graph.validate(), Err(Error::EmptyStepOrder(id)) if id == "empty"));
}

#[test]
fn test_unknown_step_in_order_rejected() {
    let mut graph = AssemblyGraph::new("a", "A").with_step(AssemblyStep::primitive("s1", "one", "pick"));
    graph.step_order.push("ghost".to_string());

    assert!(matches!(graph.validate(), Err(Error::UnknownStep(id)) if id == "ghost"));
}

#[test]
fn test_duplicate_step_rejected() {
    let mut graph = AssemblyGraph::new("a", "A").with_step(AssemblyStep::primitive("s1", "one", "pick"));
    graph.step_order.push("s1".to_string());

    assert!(matches!(graph.validate(), Err(Error::DuplicateStep(_))));
}

#[test]
fn test_unscheduled_step_rejected() {
    let mut graph = AssemblyGraph::new("a", "A")
        .with_step(AssemblyStep::primitive("s1", "one", "pick"))
        .with_step(AssemblyStep::primitive("s2", "two", "place"));
    graph.step_order.retain(|id| id != "s2");

    assert!(matches!(graph.validate(), Err(Error::UnscheduledStep(id)) if id == "s2"));
}

#[test]
fn test_mismatched_key_rejected() {
    let mut graph = AssemblyGraph::new("a", "A");
    graph
        .steps
        .insert("s1".to_string(), AssemblyStep::primitive("other", "one", "pick"));
    graph.step_order.push("s1".to_string());

    assert!(matches!(graph.validate(), Err(Error::MismatchedStepId { .. })));
}

#[test]
fn test_unknown_criteria_rejected_at_load() {
    let json = GEARBOX_JSON.replace("force_signature", "smell_test");
    assert!(matches!(
        AssemblyGraph::from_json_str(&json),
        Err(Error::Parse(_))
    ));
}

#[test]
fn test_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gearbox.json");

    let graph = AssemblyGraph::from_json_str(GEARBOX_JSON).unwrap();
    graph.to_json_file(&path).unwrap();

    let loaded = AssemblyGraph::from_json_file(&path).unwrap();
    assert_eq!(loaded, graph);
}

#[test]
fn test_missing_file_reports_path() {
    let err = AssemblyGraph::from_json_file("/nonexistent/graph.json").unwrap_err();
    assert!(err.to_string().contains("/nonexistent/graph.json"));
}
