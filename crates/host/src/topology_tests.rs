// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Topology facade tests against the in-process worker and the built-in
//! numbergraph package.

use super::*;
use crate::manager::RegisterFn;
use serde_json::json;
use std::sync::Arc;

fn register_fn() -> RegisterFn {
    Arc::new(|class_map| lattice_packages::register_builtin(class_map))
}

fn topology() -> (tempfile::TempDir, Topology) {
    let dir = tempfile::tempdir().unwrap();
    let package_dir = dir.path().join("packages/numbergraph");
    lattice_packages::numbergraph::materialize(&package_dir).unwrap();
    let topology = Topology::new(
        dir.path().join("execution"),
        &[package_dir],
        register_fn(),
    )
    .unwrap();
    (dir, topology)
}

fn props(value: serde_json::Value) -> lattice_store::Properties {
    let mut properties = lattice_store::Properties::new();
    properties.insert("value".to_string(), value);
    properties
}

#[test]
fn empty_topology_runs_successfully() {
    let (_dir, topology) = topology();
    assert!(topology.run().unwrap());
}

#[test]
fn pipeline_run_produces_outputs() {
    let (_dir, topology) = topology();
    topology.add_node("n0", "numbergraph:integer_value", props(json!(99))).unwrap();
    topology.add_node("n1", "numbergraph:doubler", Default::default()).unwrap();
    topology.add_link("l0", "n0", None, "n1", None).unwrap();

    assert!(topology.run().unwrap());
    assert_eq!(topology.node_outputs("n0").unwrap().get("data_out"), Some(&json!(99)));
    assert_eq!(topology.node_outputs("n1").unwrap().get("data_out"), Some(&json!(198)));
}

#[test]
fn property_change_is_visible_on_the_next_run() {
    let (_dir, topology) = topology();
    topology.add_node("n0", "numbergraph:integer_value", props(json!(99))).unwrap();
    topology.add_node("n1", "numbergraph:doubler", Default::default()).unwrap();
    topology.add_link("l0", "n0", None, "n1", None).unwrap();

    assert!(topology.run().unwrap());
    topology.set_node_property("n0", "value", Some(json!(100))).unwrap();
    assert!(topology.run().unwrap());

    assert_eq!(topology.node_outputs("n0").unwrap().get("data_out"), Some(&json!(100)));
    assert_eq!(topology.node_outputs("n1").unwrap().get("data_out"), Some(&json!(200)));
}

#[test]
fn failing_node_fails_the_run() {
    let (_dir, topology) = topology();
    // prime_factors raises on inputs below 2
    topology.add_node("n0", "numbergraph:integer_value", props(json!(1))).unwrap();
    topology.add_node("n1", "numbergraph:prime_factors", Default::default()).unwrap();
    topology.add_link("l0", "n0", None, "n1", None).unwrap();

    assert!(!topology.run().unwrap());
    assert!(topology.node_outputs("n1").is_none());
}

#[test]
fn run_with_injected_inputs_and_listeners() {
    let (_dir, topology) = topology();
    topology.add_node("n1", "numbergraph:prime_factors", Default::default()).unwrap();

    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let ok = topology
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
}

#[test]
fn invalid_links_are_rejected_before_mutation() {
    let (_dir, topology) = topology();
    topology.add_node("n0", "numbergraph:integer_value", props(json!(1))).unwrap();
    topology.add_node("n1", "numbergraph:prime_factors", Default::default()).unwrap();

    // wrong direction: prime_factors has no output port data_in
    let err = topology.add_link("l0", "n1", Some("data_in"), "n0", None).unwrap_err();
    assert!(matches!(err, HostError::Graph(_)));
    assert!(topology.link_ids().is_empty());
}

#[test]
fn configuration_cache_survives_across_runs() {
    let (_dir, topology) = topology();
    topology.add_node("n0", "numbergraph:integer_value", props(json!(99))).unwrap();
    topology.add_node("n1", "numbergraph:prime_factors", Default::default()).unwrap();
    topology.add_link("l0", "n0", None, "n1", None).unwrap();

    assert!(topology.run().unwrap());
    // the configuration wrote its factor cache on close
    let cached = topology
        .get_package_property("numbergraph", "missing")
        .unwrap();
    assert!(cached.is_none());
    let blob = {
        let store = lattice_store::DataStore::new(topology.execution_folder());
        store.data(&lattice_store::Owner::package("numbergraph"), "prime_factors").unwrap()
    };
    match blob {
        Some(lattice_store::Blob::Text(text)) => assert!(text.contains("99"), "{}", text),
        other => panic!("expected cached factors, got {:?}", other),
    }
}
