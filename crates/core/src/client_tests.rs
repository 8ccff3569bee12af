// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client id normalisation tests.

use super::*;

#[test]
fn single_id_serialises_as_string() {
    let id = ClientId::from("viewer");
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"viewer\"");
}

#[test]
fn pair_id_serialises_as_array() {
    let id = ClientId::pair("session9", "editor");
    assert_eq!(serde_json::to_string(&id).unwrap(), "[\"session9\",\"editor\"]");
}

#[test]
fn pair_id_deserialises_from_array() {
    let id: ClientId = serde_json::from_str("[\"s\",\"k\"]").unwrap();
    assert_eq!(id, ClientId::pair("s", "k"));
}

#[test]
fn ids_with_same_content_compare_equal() {
    assert_eq!(ClientId::from("a"), ClientId::Single("a".to_string()));
    assert_ne!(ClientId::from("a"), ClientId::pair("a", "a"));
}
