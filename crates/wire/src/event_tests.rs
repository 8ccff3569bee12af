// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event packet serialisation tests.

use super::*;
use lattice_core::{ExecutionState, StatusLevel, TargetType};

#[test]
fn execution_state_events_round_trip() {
    let event = Event::UpdateExecutionState {
        node_id: "n1".to_string(),
        execution_state: ExecutionState::Failed,
        exn: Some("input value 1 is invalid (< 2)".to_string()),
        is_manual: false,
        at_time: 1234.5,
    };
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["action"], "update_execution_state");
    assert_eq!(value["execution_state"], "failed");

    let back: Event = serde_json::from_value(value).unwrap();
    assert_eq!(back, event);
}

#[test]
fn clear_status_serialises_as_empty_string() {
    let event = Event::Status {
        origin_id: "n2".to_string(),
        origin_type: TargetType::Node,
        status: StatusLevel::Clear,
        message: String::new(),
    };
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["status"], "");
}

#[test]
fn execution_complete_carries_failure_count() {
    let value = serde_json::to_value(Event::ExecutionComplete { count_failed: 2 }).unwrap();
    assert_eq!(value["action"], "execution_complete");
    assert_eq!(value["count_failed"], 2);
}
