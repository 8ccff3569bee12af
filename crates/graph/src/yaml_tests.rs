// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! YAML import/export tests.

use super::*;
use crate::network::Network;
use crate::testutil::pipeline_schema;
use lattice_store::{DataStore, Owner};
use serde_json::json;

const PIPELINE_YAML: &str = r#"
metadata:
  name: pipeline
configuration:
  numbers:
    precision: 2
nodes:
  n0:
    type: numbers:source
    properties:
      value: 99
  n1:
    type: numbers:transform
links:
  - n0 => n1
"#;

fn setup() -> (tempfile::TempDir, Network, DataStore) {
    let dir = tempfile::tempdir().unwrap();
    let network = Network::new(pipeline_schema(), dir.path());
    let store = DataStore::new(dir.path());
    (dir, network, store)
}

#[test]
fn imports_nodes_links_and_properties() {
    let (_dir, mut network, store) = setup();
    import_yaml(&mut network, &store, PIPELINE_YAML.as_bytes()).unwrap();

    assert_eq!(network.node_ids(), vec!["n0", "n1"]);
    let link = network.get_link("link0").unwrap();
    assert_eq!(link.from_port, "data_out");
    assert_eq!(link.to_port, "data_in");

    assert_eq!(store.property(&Owner::node("n0"), "value").unwrap(), Some(json!(99)));
    assert_eq!(
        store.property(&Owner::package("numbers"), "precision").unwrap(),
        Some(json!(2))
    );
    assert_eq!(network.metadata().get("name"), Some(&json!("pipeline")));
}

#[test]
fn import_rejects_malformed_links() {
    let (_dir, mut network, store) = setup();
    let bad = "nodes:\n  n0:\n    type: numbers:source\nlinks:\n  - n0 -> n0\n";
    let err = import_yaml(&mut network, &store, bad.as_bytes()).unwrap_err();
    assert!(matches!(err, GraphError::InvalidLink(_)));
}

#[test]
fn export_elides_unambiguous_ports() {
    let (_dir, mut network, store) = setup();
    import_yaml(&mut network, &store, PIPELINE_YAML.as_bytes()).unwrap();

    let mut out = Vec::new();
    export_yaml(&network, &store, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    // source and transform both have a single port on the relevant side
    assert!(text.contains("- n0 => n1"), "{}", text);
    assert!(text.contains("value: 99"), "{}", text);
    assert!(text.contains("precision: 2"), "{}", text);
}

#[test]
fn export_import_round_trips() {
    let (_dir, mut network, store) = setup();
    import_yaml(&mut network, &store, PIPELINE_YAML.as_bytes()).unwrap();

    let mut out = Vec::new();
    export_yaml(&network, &store, &mut out).unwrap();

    let (_dir2, mut network2, store2) = setup();
    import_yaml(&mut network2, &store2, out.as_slice()).unwrap();

    assert_eq!(network2.node_ids(), network.node_ids());
    assert_eq!(network2.link_ids().len(), network.link_ids().len());
    assert_eq!(store2.property(&Owner::node("n0"), "value").unwrap(), Some(json!(99)));
}
