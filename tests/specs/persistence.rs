// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence specs: zip round-trips and merging loads.

use crate::specs::prelude::*;
use lattice_store::Blob;
use std::io::Cursor;

fn pipeline(t: &Topology) {
    t.add_node("n0", "numbergraph:integer_value", props(json!(99))).unwrap();
    t.add_node("n1", "numbergraph:doubler", Properties::new()).unwrap();
    t.add_link("l0", "n0", None, "n1", None).unwrap();
}

#[test]
fn zip_round_trip_preserves_graph_properties_and_data() {
    let (dir, t) = test_topology();
    pipeline(&t);
    let mut metadata = serde_json::Map::new();
    metadata.insert("name".to_string(), json!("roundtrip"));
    t.set_metadata(metadata).unwrap();
    t.set_node_data("n0", "notes", Some(Blob::Text("kept".to_string()))).unwrap();
    t.set_package_property("numbergraph", "precision", Some(json!(3))).unwrap();

    let mut archive = Vec::new();
    t.save_zip(Cursor::new(&mut archive)).unwrap();

    let restored = topology_in(dir.path(), "restored");
    let renamings = restored.load_zip(Cursor::new(&archive)).unwrap();
    assert!(renamings.is_empty());

    assert_eq!(restored.node_ids(), t.node_ids());
    assert_eq!(restored.link_ids(), t.link_ids());
    assert_eq!(restored.metadata().get("name"), Some(&json!("roundtrip")));
    assert_eq!(restored.get_node_property("n0", "value").unwrap(), Some(json!(99)));
    assert_eq!(
        restored.get_node_data("n0", "notes").unwrap(),
        Some(Blob::Text("kept".to_string()))
    );
    assert_eq!(
        restored.get_package_property("numbergraph", "precision").unwrap(),
        Some(json!(3))
    );

    // and the restored copy executes identically
    assert!(restored.run().unwrap());
    assert_eq!(restored.node_outputs("n1").unwrap().get("data_out"), Some(&json!(198)));
}

/// Merge-loading a topology into a host that already contains one of its
/// node ids renames the incoming node; both copies execute independently.
#[test]
fn merge_load_renames_colliding_ids() {
    let (dir, t) = test_topology();
    t.add_node("n0", "numbergraph:integer_value", props(json!(99))).unwrap();

    let mut archive = Vec::new();
    t.save_zip(Cursor::new(&mut archive)).unwrap();

    let merged = topology_in(dir.path(), "merged");
    let renamings1 = merged.load_zip(Cursor::new(&archive)).unwrap();
    let renamings2 = merged.load_zip(Cursor::new(&archive)).unwrap();

    assert_eq!(renamings1.len(), 0);
    assert_eq!(renamings2.len(), 1);
    let renamed = renamings2.get("n0").unwrap();
    assert!(renamed.starts_with('n') && renamed.len() > 8, "fresh id: {}", renamed);

    assert!(merged.run().unwrap());
    assert_eq!(merged.node_outputs("n0").unwrap().get("data_out"), Some(&json!(99)));
    assert_eq!(
        merged.node_outputs(renamed).unwrap().get("data_out"),
        Some(&json!(99)),
        "both copies produce identical outputs"
    );
}

#[test]
fn yaml_import_builds_a_runnable_topology() {
    let yaml = r#"
metadata:
  name: from-yaml
nodes:
  n0:
    type: numbergraph:integer_value
    properties:
      value: 21
  n1:
    type: numbergraph:doubler
links:
  - n0 => n1
"#;
    let (_dir, t) = test_topology();
    t.import_yaml(yaml.as_bytes()).unwrap();

    assert_eq!(t.metadata().get("name"), Some(&json!("from-yaml")));
    assert!(t.run().unwrap());
    assert_eq!(t.node_outputs("n1").unwrap().get("data_out"), Some(&json!(42)));
}

#[test]
fn yaml_export_import_round_trips() {
    let (dir, t) = test_topology();
    pipeline(&t);

    let mut yaml = Vec::new();
    t.export_yaml(&mut yaml).unwrap();

    let restored = topology_in(dir.path(), "from-yaml");
    restored.import_yaml(yaml.as_slice()).unwrap();

    assert_eq!(restored.node_ids(), t.node_ids());
    assert_eq!(restored.get_node_property("n0", "value").unwrap(), Some(json!(99)));
    assert!(restored.run().unwrap());
    assert_eq!(restored.node_outputs("n1").unwrap().get("data_out"), Some(&json!(198)));
}

/// Removing a node removes its persisted state and its links.
#[test]
fn remove_node_cleans_links_and_storage() {
    let (_dir, t) = test_topology();
    pipeline(&t);
    let folder = t.execution_folder();
    assert!(folder.join("node/n0/properties.json").exists());

    t.remove_node("n0").unwrap();
    assert!(!folder.join("node/n0").exists());
    assert!(t.link_ids().is_empty(), "attached link removed with the node");

    // the remaining doubler runs with no inputs and produces nothing
    assert!(t.run().unwrap());
    assert!(t.node_outputs("n1").map_or(true, |o| o.is_empty()));
}
