// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Data store behavior tests.

use super::*;
use serde_json::json;

fn store() -> (tempfile::TempDir, DataStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = DataStore::new(dir.path());
    (dir, store)
}

#[test]
fn absent_properties_read_as_empty() {
    let (_dir, store) = store();
    let props = store.properties(&Owner::node("n0")).unwrap();
    assert!(props.is_empty());
    assert!(store.property(&Owner::node("n0"), "value").unwrap().is_none());
}

#[test]
fn set_property_merges_into_document() {
    let (_dir, store) = store();
    let owner = Owner::node("n0");
    store.set_property(&owner, "value", Some(json!(99))).unwrap();
    store.set_property(&owner, "label", Some(json!("source"))).unwrap();

    let props = store.properties(&owner).unwrap();
    assert_eq!(props.get("value"), Some(&json!(99)));
    assert_eq!(props.get("label"), Some(&json!("source")));
}

#[test]
fn unset_property_removes_key() {
    let (_dir, store) = store();
    let owner = Owner::package("numbergraph");
    store.set_property(&owner, "threshold", Some(json!(5))).unwrap();
    store.set_property(&owner, "threshold", None).unwrap();
    assert!(store.property(&owner, "threshold").unwrap().is_none());
}

#[test]
fn data_suffix_tracks_payload_kind() {
    let (dir, store) = store();
    let owner = Owner::node("n1");

    store.set_data(&owner, "cache", Some(Blob::Binary(vec![1, 2, 3]))).unwrap();
    assert!(dir.path().join("node/n1/data/cache.binary").exists());

    // switching to text removes the binary file
    store.set_data(&owner, "cache", Some(Blob::Text("hello".into()))).unwrap();
    assert!(!dir.path().join("node/n1/data/cache.binary").exists());
    assert!(dir.path().join("node/n1/data/cache.text").exists());

    assert_eq!(store.data(&owner, "cache").unwrap(), Some(Blob::Text("hello".into())));
}

#[test]
fn unset_data_removes_both_files() {
    let (dir, store) = store();
    let owner = Owner::node("n1");
    store.set_data(&owner, "cache", Some(Blob::Binary(vec![7]))).unwrap();
    store.set_data(&owner, "cache", None).unwrap();
    assert!(!dir.path().join("node/n1/data/cache.binary").exists());
    assert!(store.data(&owner, "cache").unwrap().is_none());
}

#[test]
fn invalid_keys_are_rejected() {
    let (_dir, store) = store();
    let owner = Owner::node("n0");
    for key in ["", "a-b", "a.b", "a b", "../escape"] {
        let err = store.set_data(&owner, key, None).unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)), "key {:?}", key);
        assert!(store.data(&owner, key).is_err());
    }
}

#[test]
fn remove_owner_deletes_directory() {
    let (dir, store) = store();
    let owner = Owner::node("gone");
    store.set_property(&owner, "value", Some(json!(1))).unwrap();
    store.set_data(&owner, "blob", Some(Blob::Text("x".into()))).unwrap();

    store.remove_owner(&owner).unwrap();
    assert!(!dir.path().join("node/gone").exists());

    // reads after removal are empty, not errors
    assert!(store.properties(&owner).unwrap().is_empty());
}

#[test]
fn node_and_package_owners_do_not_collide() {
    let (_dir, store) = store();
    store.set_property(&Owner::node("x"), "value", Some(json!(1))).unwrap();
    store.set_property(&Owner::package("x"), "value", Some(json!(2))).unwrap();

    assert_eq!(store.property(&Owner::node("x"), "value").unwrap(), Some(json!(1)));
    assert_eq!(store.property(&Owner::package("x"), "value").unwrap(), Some(json!(2)));
}
