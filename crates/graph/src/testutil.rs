// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for graph tests.

use lattice_schema::{Package, Schema};

pub(crate) const PIPELINE_SCHEMA: &str = r#"{
    "id": "numbers",
    "node_types": {
        "source": {
            "classname": "nodes.source.Source",
            "output_ports": {"data_out": {"link_type": "integer", "allow_multiple_connections": true}}
        },
        "transform": {
            "classname": "nodes.transform.Transform",
            "input_ports": {"data_in": {"link_type": "integer"}},
            "output_ports": {"data_out": {"link_type": "integer", "allow_multiple_connections": true}}
        },
        "sum": {
            "classname": "nodes.sum.Sum",
            "input_ports": {"data_in": {"link_type": "integer", "allow_multiple_connections": true}},
            "output_ports": {"data_out": {"link_type": "integer", "allow_multiple_connections": true}}
        },
        "display": {
            "classname": "nodes.display.Display",
            "input_ports": {"data_in": {"link_type": "integer"}, "text_in": {"link_type": "text"}}
        }
    },
    "link_types": {"integer": {}, "text": {}}
}"#;

pub(crate) fn pipeline_schema() -> Schema {
    let mut schema = Schema::new();
    #[allow(clippy::unwrap_used)]
    schema.add_package(Package::from_json(PIPELINE_SCHEMA).unwrap()).unwrap();
    schema
}
