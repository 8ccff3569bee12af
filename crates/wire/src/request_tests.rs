// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request packet serialisation tests.

use super::*;
use serde_json::json;

#[test]
fn actions_serialise_snake_case_tagged() {
    let request = Request::AddNode {
        node_id: "n0".to_string(),
        node_type: "numbers:source".to_string(),
        loading: true,
    };
    let value = serde_json::to_value(&request).unwrap();
    assert_eq!(value["action"], "add_node");
    assert_eq!(value["node_id"], "n0");
    assert_eq!(value["loading"], true);
}

#[test]
fn init_packet_round_trips() {
    let request = Request::Init {
        execution_folder: "/tmp/run".into(),
        packages: vec!["/pkg/numbers".into()],
        injected_inputs: vec![InjectedInput {
            node_id: "n1".to_string(),
            port: "data_in".to_string(),
            value: json!(99),
        }],
        output_listeners: vec!["n1:data_out".parse().unwrap()],
    };
    let value = serde_json::to_value(&request).unwrap();
    assert_eq!(value["action"], "init");
    assert_eq!(value["output_listeners"][0], "n1:data_out");

    let back: Request = serde_json::from_value(value).unwrap();
    assert_eq!(back, request);
}

#[test]
fn client_ids_accept_both_shapes() {
    let single: Request = serde_json::from_value(json!({
        "action": "close_client",
        "target_id": "n0",
        "target_type": "node",
        "client_id": "viewer"
    }))
    .unwrap();
    let pair: Request = serde_json::from_value(json!({
        "action": "close_client",
        "target_id": "numbers",
        "target_type": "configuration",
        "client_id": ["session", "kind"]
    }))
    .unwrap();

    match (single, pair) {
        (
            Request::CloseClient { client_id: a, .. },
            Request::CloseClient { client_id: b, target_type, .. },
        ) => {
            assert_eq!(a, lattice_core::ClientId::from("viewer"));
            assert_eq!(b, lattice_core::ClientId::pair("session", "kind"));
            assert_eq!(target_type, lattice_core::TargetType::Configuration);
        }
        other => panic!("unexpected: {:?}", other),
    }
}
