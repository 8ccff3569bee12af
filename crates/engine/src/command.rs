// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The command channel: the only way into the engine's runtime.
//!
//! Handles are `Send + Clone`; any thread may post commands, and the
//! engine applies them in arrival order on its own runtime.

use serde_json::Value;
use tokio::sync::mpsc;

use lattice_core::{ClientId, Message, TargetType};

/// A link as the engine sees it: endpoints only.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkSpec {
    pub link_id: String,
    pub from_node_id: String,
    pub from_port: String,
    pub to_node_id: String,
    pub to_port: String,
}

/// Commands applied serially on the engine runtime.
#[derive(Debug)]
pub enum EngineCommand {
    AddPackage {
        package_id: String,
    },
    AddNode {
        node_id: String,
        node_type: String,
        loading: bool,
    },
    RemoveNode {
        node_id: String,
    },
    AddLink {
        link: LinkSpec,
        loading: bool,
    },
    RemoveLink {
        link_id: String,
    },
    RequestExecution {
        node_id: String,
    },
    OpenClient {
        target_type: TargetType,
        target_id: String,
        client_id: ClientId,
        client_options: Value,
    },
    RecvMessage {
        target_type: TargetType,
        target_id: String,
        client_id: ClientId,
        message: Message,
    },
    CloseClient {
        target_type: TargetType,
        target_id: String,
        client_id: ClientId,
    },
    Pause,
    Resume,
    Clear,
    Stop,
}

/// Cloneable submission handle for [`EngineCommand`]s.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineCommand>,
}

impl EngineHandle {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EngineCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, command: EngineCommand) {
        let _ = self.tx.send(command);
    }

    pub fn request_execution(&self, node_id: &str) {
        self.send(EngineCommand::RequestExecution { node_id: node_id.to_string() });
    }

    pub fn stop(&self) {
        self.send(EngineCommand::Stop);
    }
}
