// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive client specs: attach/detach semantics and message flow
//! through a live session.

use crate::specs::prelude::*;
use lattice_core::{Message, MessagePart};

fn collect_json(messages: &[Message]) -> Vec<serde_json::Value> {
    messages
        .iter()
        .filter_map(|m| m.first())
        .filter_map(|p| p.as_json())
        .cloned()
        .collect()
}

/// Scenario: attach clients, drive a source from another thread, observe
/// the display's notification at the attached client.
#[test]
fn interactive_session_routes_messages_both_ways() {
    let (_dir, t) = test_topology();
    t.add_node("n0", "numbergraph:integer_value", props(json!(10))).unwrap();
    t.add_node("n1", "numbergraph:doubler", Properties::new()).unwrap();
    t.add_node("n2", "numbergraph:integer_display", Properties::new()).unwrap();
    t.add_link("l0", "n0", None, "n1", None).unwrap();
    t.add_link("l1", "n1", None, "n2", Some("integer_data_in")).unwrap();

    let session = t.interactive_session();
    let input = session.attach_node_client("n0", "spec", json!({}));
    let display = session.attach_node_client("n2", "spec", json!({}));

    let received: Arc<parking_lot::Mutex<Vec<Message>>> = Arc::default();
    let sink = Arc::clone(&received);
    display.set_message_handler(move |message| sink.lock().push(message));

    // drive the source from another thread before the session starts;
    // the message is queued and delivered during the handshake
    let sender = std::thread::spawn(move || {
        input.send_message(vec![MessagePart::Json(json!(100))]);
    });
    sender.join().expect("sender thread");

    let controller = session.controller();
    let ok = session
        .run(Some(Box::new(move || controller.stop())))
        .unwrap();
    assert!(ok);

    let messages = received.lock();
    let values = collect_json(&messages);
    assert_eq!(values, vec![json!([200])], "one notification with the aggregated result");
}

/// Attaching a second client with the same id replaces the first;
/// detaching leaves no residue.
#[test]
fn reattach_with_same_id_replaces_previous_client() {
    let (_dir, t) = test_topology();
    t.add_node("n0", "numbergraph:integer_value", props(json!(5))).unwrap();
    t.add_node("n2", "numbergraph:integer_display", Properties::new()).unwrap();
    t.add_link("l0", "n0", None, "n2", Some("integer_data_in")).unwrap();

    let session = t.interactive_session();

    let first = session.attach_node_client("n2", "watcher", json!({}));
    let first_log: Arc<parking_lot::Mutex<Vec<Message>>> = Arc::default();
    let sink = Arc::clone(&first_log);
    first.set_message_handler(move |m| sink.lock().push(m));

    // same id: the first client is detached and its service closed
    let second = session.attach_node_client("n2", "watcher", json!({}));
    let second_log: Arc<parking_lot::Mutex<Vec<Message>>> = Arc::default();
    let sink = Arc::clone(&second_log);
    second.set_message_handler(move |m| sink.lock().push(m));

    assert!(!first.send_message(vec![MessagePart::Null]), "replaced client is closed");

    let controller = session.controller();
    session.run(Some(Box::new(move || controller.stop()))).unwrap();

    assert!(first_log.lock().is_empty(), "replaced client saw nothing");
    assert!(!collect_json(&second_log.lock()).is_empty());
}

#[test]
fn detach_then_attach_starts_fresh() {
    let (_dir, t) = test_topology();
    t.add_node("n2", "numbergraph:integer_display", Properties::new()).unwrap();

    let session = t.interactive_session();
    let stale = session.attach_node_client("n2", "viewer", json!({}));
    session.detach_node_client("n2", "viewer");
    assert!(!stale.send_message(vec![MessagePart::Null]), "detached client is closed");

    let fresh = session.attach_node_client("n2", "viewer", json!({}));
    let log: Arc<parking_lot::Mutex<Vec<Message>>> = Arc::default();
    let sink = Arc::clone(&log);
    fresh.set_message_handler(move |m| sink.lock().push(m));

    let controller = session.controller();
    session.run(Some(Box::new(move || controller.stop()))).unwrap();

    assert!(!collect_json(&log.lock()).is_empty(), "fresh client receives the display output");
}

/// Configuration clients reach the package's shared instance.
#[test]
fn configuration_clients_queue_until_the_package_is_live() {
    let (_dir, t) = test_topology();
    t.add_node("n0", "numbergraph:integer_value", props(json!(7))).unwrap();

    let session = t.interactive_session();
    // attached before the session exists; opened during the handshake
    let _config_client = session.attach_configuration_client("numbergraph", "tuner", json!({}));

    let controller = session.controller();
    let ok = session.run(Some(Box::new(move || controller.stop()))).unwrap();
    assert!(ok);
}
