// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the end-to-end specs.

pub use serde_json::json;
pub use std::sync::Arc;

pub use lattice_core::ExecutionState;
pub use lattice_host::Topology;
pub use lattice_store::Properties;

/// A topology over a fresh execution folder with the numbergraph package
/// loaded and registered.
pub fn test_topology() -> (tempfile::TempDir, Topology) {
    let dir = tempfile::tempdir().expect("tempdir");
    let topology = topology_in(dir.path(), "execution");
    (dir, topology)
}

/// A second (or later) topology rooted in the same tempdir.
pub fn topology_in(root: &std::path::Path, name: &str) -> Topology {
    let package_dir = root.join("packages/numbergraph");
    lattice_packages::numbergraph::materialize(&package_dir).expect("write package");
    Topology::new(
        root.join(name),
        &[package_dir],
        Arc::new(|class_map| lattice_packages::register_builtin(class_map)),
    )
    .expect("create topology")
}

pub fn props(value: serde_json::Value) -> Properties {
    let mut properties = Properties::new();
    properties.insert("value".to_string(), value);
    properties
}

/// Record of `(node_id, state)` transitions reported by the host.
pub type StateLog = Arc<parking_lot::Mutex<Vec<(String, ExecutionState)>>>;

pub fn record_states(topology: &Topology) -> StateLog {
    let log: StateLog = Arc::default();
    let sink = Arc::clone(&log);
    topology.set_execution_handler(move |_at, node_id, state, _exn, _manual| {
        sink.lock().push((node_id.to_string(), state));
    });
    log
}
