use super::*;
use crate::types::{ExecutionState, Phase};

fn snapshot(phase: Phase) -> ExecutionState {
    ExecutionState {
        phase,
        assembly_id: Some("gearbox".to_string()),
        run_number: 1,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_publish_subscribe() {
    let bus = EventBus::new(16);
    let mut rx = bus.subscribe();

    bus.publish(ExecutionEvent::ExecutionState(snapshot(Phase::Running)));

    let event = rx.recv().await.unwrap();
    assert_eq!(event.assembly_id(), Some("gearbox"));
    let ExecutionEvent::ExecutionState(state) = event;
    assert_eq!(state.phase, Phase::Running);
}

#[tokio::test]
async fn test_multiple_subscribers() {
    let bus = EventBus::new(16);
    let mut rx1 = bus.subscribe();
    let mut rx2 = bus.subscribe();

    assert_eq!(bus.subscriber_count(), 2);

    let count = bus.publish(ExecutionEvent::ExecutionState(snapshot(Phase::Paused)));
    assert_eq!(count, 2);

    assert_eq!(rx1.recv().await.unwrap(), rx2.recv().await.unwrap());
}

#[test]
fn test_publish_without_subscribers() {
    let bus = EventBus::default();
    assert_eq!(
        bus.publish(ExecutionEvent::ExecutionState(snapshot(Phase::Idle))),
        0
    );
}

#[tokio::test]
async fn test_callback_republishes() {
    let bus = EventBus::new(4);
    let mut rx = bus.subscribe();

    let callback = bus.callback();
    callback(&snapshot(Phase::Teaching)).unwrap();

    let ExecutionEvent::ExecutionState(state) = rx.recv().await.unwrap();
    assert_eq!(state.phase, Phase::Teaching);
}

#[test]
fn test_event_serialization() {
    let event = ExecutionEvent::ExecutionState(snapshot(Phase::Complete));
    let json = serde_json::to_value(&event).unwrap();

    assert_eq!(json["type"], "execution_state");
    assert_eq!(json["phase"], "complete");
    assert_eq!(json["assemblyId"], "gearbox");
    assert_eq!(json["runNumber"], 1);
}
