// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Package-level tests: schema validity and factorisation.

use super::configuration::factorise;
use super::*;
use lattice_engine::ClassMap;

#[test]
fn schema_parses_and_matches_registered_factories() {
    let package = lattice_schema::Package::from_json(SCHEMA_JSON).unwrap();
    assert_eq!(package.id, PACKAGE_ID);
    assert!(package.configuration.is_declared());

    for node_type in ["integer_value", "doubler", "integer_sum", "prime_factors", "integer_display"]
    {
        assert!(package.node_type(node_type).is_some(), "missing {}", node_type);
    }

    // the aggregation port accepts multiple connections
    let sum = package.node_type("integer_sum").unwrap();
    assert!(sum.input_ports.get("data_in").unwrap().allow_multiple_connections);
}

#[test]
fn register_installs_the_package() {
    let mut class_map = ClassMap::new();
    register(&mut class_map);
    assert!(class_map.has_package(PACKAGE_ID));
}

#[test]
fn factorisation_is_correct() {
    assert_eq!(factorise(2), vec![2]);
    assert_eq!(factorise(4), vec![2, 2]);
    assert_eq!(factorise(99), vec![3, 3, 11]);
    assert_eq!(factorise(100), vec![2, 2, 5, 5]);
    assert_eq!(factorise(999), vec![3, 3, 3, 37]);
    assert_eq!(factorise(13), vec![13]);
}

#[test]
fn materialize_writes_schema_json() {
    let dir = tempfile::tempdir().unwrap();
    let package_dir = dir.path().join("numbergraph");
    materialize(&package_dir).unwrap();
    let content = std::fs::read_to_string(package_dir.join("schema.json")).unwrap();
    assert!(content.contains("\"id\": \"numbergraph\""));
}
