// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control packets sent from the host to the worker.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use lattice_core::{ClientId, PortRef, TargetType};

/// An input value presented at a node port in addition to linked values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InjectedInput {
    pub node_id: String,
    pub port: String,
    pub value: Value,
}

/// Request from host to worker.
///
/// `client_message` packets are followed by the message parts themselves;
/// every other action is a bare control packet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    /// First packet of every connection.
    Init {
        execution_folder: PathBuf,
        /// Package directories; the worker resolves implementations from
        /// its registry and loads each package's schema.
        packages: Vec<PathBuf>,
        #[serde(default)]
        injected_inputs: Vec<InjectedInput>,
        #[serde(default)]
        output_listeners: Vec<PortRef>,
    },

    AddPackage {
        package_id: String,
    },

    AddNode {
        node_id: String,
        node_type: String,
        #[serde(default)]
        loading: bool,
    },

    AddLink {
        link_id: String,
        from_node_id: String,
        from_port: String,
        to_node_id: String,
        to_port: String,
        #[serde(default)]
        link_type: String,
        #[serde(default)]
        loading: bool,
    },

    RemoveNode {
        node_id: String,
    },

    RemoveLink {
        link_id: String,
    },

    /// Drop every wrapper and empty all scheduler state.
    Clear,

    Pause,

    Resume,

    OpenClient {
        target_id: String,
        target_type: TargetType,
        client_id: ClientId,
        #[serde(default)]
        client_options: Value,
    },

    /// Deliver the trailing message parts to an attached client's target.
    ClientMessage {
        target_id: String,
        target_type: TargetType,
        client_id: ClientId,
    },

    CloseClient {
        target_id: String,
        target_type: TargetType,
        client_id: ClientId,
    },

    /// Drain the engine, close every wrapper and exit.
    CloseWorker,
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
