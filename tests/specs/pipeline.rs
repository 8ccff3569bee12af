// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline execution specs: straight-line runs, re-execution after
//! property changes, aggregation and failure blocking.

use crate::specs::prelude::*;

/// source -> doubler -> collector, values flowing end to end.
#[test]
fn straight_line_run_produces_expected_outputs() {
    let (_dir, t) = test_topology();
    t.add_node("n0", "numbergraph:integer_value", props(json!(99))).unwrap();
    t.add_node("n1", "numbergraph:doubler", Properties::new()).unwrap();
    t.add_node("n2", "numbergraph:integer_sum", Properties::new()).unwrap();
    t.add_link("l0", "n0", None, "n1", None).unwrap();
    t.add_link("l1", "n1", None, "n2", None).unwrap();

    assert!(t.run().unwrap(), "run reports success");

    assert_eq!(t.node_outputs("n0").unwrap().get("data_out"), Some(&json!(99)));
    assert_eq!(t.node_outputs("n1").unwrap().get("data_out"), Some(&json!(198)));
    assert_eq!(t.node_outputs("n2").unwrap().get("data_out"), Some(&json!(198)));
}

/// Changing a source property re-executes the whole downstream chain on
/// the next run, including the terminal node.
#[test]
fn property_change_triggers_reexecution() {
    let (_dir, t) = test_topology();
    t.add_node("n0", "numbergraph:integer_value", props(json!(99))).unwrap();
    t.add_node("n1", "numbergraph:doubler", Properties::new()).unwrap();
    t.add_node("n2", "numbergraph:integer_sum", Properties::new()).unwrap();
    t.add_link("l0", "n0", None, "n1", None).unwrap();
    t.add_link("l1", "n1", None, "n2", None).unwrap();
    assert!(t.run().unwrap());

    t.set_node_property("n0", "value", Some(json!(100))).unwrap();

    let states = record_states(&t);
    assert!(t.run().unwrap());

    assert_eq!(t.node_outputs("n0").unwrap().get("data_out"), Some(&json!(100)));
    assert_eq!(t.node_outputs("n1").unwrap().get("data_out"), Some(&json!(200)));

    // n2 went through the full state machine in the second run
    let n2_states: Vec<ExecutionState> = states
        .lock()
        .iter()
        .filter(|(id, _)| id == "n2")
        .map(|(_, s)| *s)
        .collect();
    assert!(n2_states.contains(&ExecutionState::Pending));
    assert!(n2_states.contains(&ExecutionState::Executing));
    assert!(n2_states.contains(&ExecutionState::Executed));
}

/// Two sources feeding the same multi-connection input port aggregate.
#[test]
fn multi_source_aggregation_sums_all_inputs() {
    let (_dir, t) = test_topology();
    t.add_node("n0a", "numbergraph:integer_value", props(json!(99))).unwrap();
    t.add_node("n0b", "numbergraph:integer_value", props(json!(100))).unwrap();
    t.add_node("n1", "numbergraph:integer_sum", Properties::new()).unwrap();
    t.add_link("l0", "n0a", None, "n1", None).unwrap();
    t.add_link("l1", "n0b", None, "n1", None).unwrap();

    assert!(t.run().unwrap());
    assert_eq!(t.node_outputs("n1").unwrap().get("data_out"), Some(&json!(199)));
}

/// A failing node blocks its dependents: they stay pending and the run
/// reports failure.
#[test]
fn failing_predecessor_blocks_successor() {
    let (_dir, t) = test_topology();
    // prime_factors rejects inputs below 2
    t.add_node("n0", "numbergraph:integer_value", props(json!(1))).unwrap();
    t.add_node("n1", "numbergraph:prime_factors", Properties::new()).unwrap();
    t.add_node("n2", "numbergraph:integer_display", Properties::new()).unwrap();
    t.add_link("l0", "n0", None, "n1", None).unwrap();
    t.add_link("l1", "n1", None, "n2", Some("integerlist_data_in")).unwrap();

    let states = record_states(&t);
    assert!(!t.run().unwrap(), "run reports failure");

    let log = states.lock();
    let last_state = |id: &str| log.iter().rev().find(|(n, _)| n == id).map(|(_, s)| *s);
    assert_eq!(last_state("n0"), Some(ExecutionState::Executed));
    assert_eq!(last_state("n1"), Some(ExecutionState::Failed));
    // the display never advanced past pending
    assert_eq!(last_state("n2"), Some(ExecutionState::Pending));
    assert!(!log.contains(&("n2".to_string(), ExecutionState::Executing)));
}

/// The failure error text reaches the host's execution handler.
#[test]
fn failure_reason_is_reported() {
    let (_dir, t) = test_topology();
    t.add_node("n1", "numbergraph:prime_factors", Properties::new()).unwrap();

    let errors: Arc<parking_lot::Mutex<Vec<String>>> = Arc::default();
    let sink = Arc::clone(&errors);
    t.set_execution_handler(move |_at, _node, state, exn, _manual| {
        if state == ExecutionState::Failed {
            sink.lock().push(exn.unwrap_or("").to_string());
        }
    });

    let ok = t
        .run_with(vec![("n1:data_in".parse().unwrap(), json!(1))], Vec::new())
        .unwrap();
    assert!(!ok);
    let errors = errors.lock();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("invalid"), "{}", errors[0]);
}

/// Injected inputs take part in execution without any links.
#[test]
fn injected_inputs_drive_unlinked_nodes() {
    let (_dir, t) = test_topology();
    t.add_node("n1", "numbergraph:prime_factors", Properties::new()).unwrap();

    let seen: Arc<parking_lot::Mutex<Vec<serde_json::Value>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let ok = t
        .run_with(
            vec![("n1:data_in".parse().unwrap(), json!(99))],
            vec![(
                "n1:data_out".parse().unwrap(),
                Box::new(move |value| sink.lock().push(value)),
            )],
        )
        .unwrap();

    assert!(ok);
    assert_eq!(*seen.lock(), vec![json!([3, 3, 11])]);
    // the listener observed exactly what was cached
    assert_eq!(t.node_outputs("n1").unwrap().get("data_out"), Some(&json!([3, 3, 11])));
}
