// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence tests: topology.json round-trips, zip archives, merge-load.

use super::*;
use crate::network::Network;
use crate::testutil::pipeline_schema;
use serde_json::Map;
use std::io::Cursor;

fn network() -> (tempfile::TempDir, Network) {
    let dir = tempfile::tempdir().unwrap();
    let network = Network::new(pipeline_schema(), dir.path());
    (dir, network)
}

fn pipeline(network: &mut Network) {
    network.add_node("n0", "numbers:source", 10.0, 20.0, Map::new()).unwrap();
    network.add_node("n1", "numbers:transform", 0.0, 0.0, Map::new()).unwrap();
    network.add_link("l0", "n0", None, "n1", None).unwrap();
}

#[test]
fn topology_json_round_trips() {
    let (_dir, mut network) = network();
    pipeline(&mut network);
    let mut metadata = Map::new();
    metadata.insert("name".to_string(), serde_json::json!("pipeline"));
    network.set_metadata(metadata).unwrap();

    let saved = network.save().unwrap();

    let (_dir2, mut restored) = self::network();
    let outcome = restored.load_value(&saved).unwrap();
    assert!(outcome.renamings.is_empty());
    assert_eq!(outcome.added_nodes, vec!["n0", "n1"]);
    assert_eq!(outcome.added_links, vec!["l0"]);
    assert_eq!(restored.get_node("n0").unwrap().x, 10.0);
    let link = restored.get_link("l0").unwrap();
    assert_eq!(link.from_node_id, "n0");
    assert_eq!(link.to_port, "data_in");
    assert_eq!(restored.metadata().get("name"), Some(&serde_json::json!("pipeline")));
}

#[test]
fn save_dir_writes_topology_json_after_each_mutation() {
    let (dir, mut network) = network();
    pipeline(&mut network);
    let content = std::fs::read_to_string(dir.path().join("topology.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert!(value["nodes"]["n0"].is_object());
    assert_eq!(value["links"]["l0"]["from_port"], "n0:data_out");
}

#[test]
fn merge_load_renames_colliding_nodes() {
    let (_dir, mut network) = network();
    pipeline(&mut network);
    let saved = network.save().unwrap();

    let outcome = network.load_value(&saved).unwrap();
    assert_eq!(outcome.renamings.len(), 2, "both incoming node ids collide");

    let renamed_n0 = outcome.renamings.get("n0").unwrap();
    let renamed_n1 = outcome.renamings.get("n1").unwrap();
    assert!(renamed_n0.starts_with('n') && renamed_n0.len() > 8);

    // the incoming link now connects the renamed copies
    let incoming_link = outcome.added_links.first().unwrap();
    let link = network.get_link(incoming_link).unwrap();
    assert_eq!(&link.from_node_id, renamed_n0);
    assert_eq!(&link.to_node_id, renamed_n1);

    assert_eq!(network.node_ids().len(), 4);
    assert_eq!(network.link_ids().len(), 2);
}

#[test]
fn zip_round_trip_preserves_owner_trees() {
    let (dir, mut network) = network();
    pipeline(&mut network);

    // stored state alongside the graph
    std::fs::create_dir_all(dir.path().join("node/n0")).unwrap();
    std::fs::write(dir.path().join("node/n0/properties.json"), r#"{"value":99}"#).unwrap();
    std::fs::create_dir_all(dir.path().join("package/numbers/data")).unwrap();
    std::fs::write(dir.path().join("package/numbers/data/cache.text"), "hello").unwrap();

    let mut archive = Vec::new();
    network.save_zip(Cursor::new(&mut archive)).unwrap();

    let (dir2, mut restored) = self::network();
    let outcome = restored.load_zip(Cursor::new(&archive)).unwrap();
    assert!(outcome.renamings.is_empty());
    assert_eq!(restored.node_ids(), vec!["n0", "n1"]);
    assert_eq!(
        std::fs::read_to_string(dir2.path().join("node/n0/properties.json")).unwrap(),
        r#"{"value":99}"#
    );
    assert_eq!(
        std::fs::read_to_string(dir2.path().join("package/numbers/data/cache.text")).unwrap(),
        "hello"
    );
}

#[test]
fn zip_merge_relocates_renamed_node_storage() {
    let (dir, mut network) = network();
    network.add_node("n0", "numbers:source", 0.0, 0.0, Map::new()).unwrap();
    std::fs::create_dir_all(dir.path().join("node/n0")).unwrap();
    std::fs::write(dir.path().join("node/n0/properties.json"), r#"{"value":7}"#).unwrap();

    let mut archive = Vec::new();
    network.save_zip(Cursor::new(&mut archive)).unwrap();

    // loading into the same network collides on n0
    let outcome = network.load_zip(Cursor::new(&archive)).unwrap();
    let renamed = outcome.renamings.get("n0").unwrap();
    assert_eq!(
        std::fs::read_to_string(dir.path().join(format!("node/{}/properties.json", renamed)))
            .unwrap(),
        r#"{"value":7}"#
    );
}

#[test]
fn load_dir_on_empty_folder_is_empty() {
    let (_dir, mut network) = network();
    let outcome = network.load_dir().unwrap();
    assert!(outcome.added_nodes.is_empty());
    assert!(outcome.added_links.is_empty());
}
