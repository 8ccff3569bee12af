// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events emitted by the engine, in emission order.

use serde_json::Value;
use tokio::sync::mpsc;

use lattice_core::{ClientId, ExecutionState, Message, StatusLevel, TargetType};

/// A notification from the engine to its host.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    ExecutionStateChanged {
        node_id: String,
        state: ExecutionState,
        exn: Option<String>,
        is_manual: bool,
        at_time: f64,
    },
    Status {
        origin_id: String,
        origin_type: TargetType,
        status: StatusLevel,
        message: String,
    },
    OutputNotification {
        node_id: String,
        output_port: String,
        value: Value,
    },
    ClientMessage {
        origin_id: String,
        origin_type: TargetType,
        client_id: ClientId,
        message: Message,
    },
    ExecutionComplete {
        count_failed: usize,
    },
}

/// Sender half for engine events. Sends after the receiver is gone are
/// dropped silently (shutdown races are expected).
#[derive(Debug, Clone)]
pub(crate) struct EventSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self { tx }
    }

    pub(crate) fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }

    pub(crate) fn status(
        &self,
        origin_id: &str,
        origin_type: TargetType,
        status: StatusLevel,
        message: &str,
    ) {
        self.emit(EngineEvent::Status {
            origin_id: origin_id.to_string(),
            origin_type,
            status,
            message: message.to_string(),
        });
    }

    pub(crate) fn execution_state(
        &self,
        node_id: &str,
        state: ExecutionState,
        exn: Option<String>,
        is_manual: bool,
    ) {
        self.emit(EngineEvent::ExecutionStateChanged {
            node_id: node_id.to_string(),
            state,
            exn,
            is_manual,
            at_time: now_epoch_seconds(),
        });
    }

    pub(crate) fn client_message(
        &self,
        origin_id: &str,
        origin_type: TargetType,
        client_id: &ClientId,
        message: Message,
    ) {
        self.emit(EngineEvent::ClientMessage {
            origin_id: origin_id.to_string(),
            origin_type,
            client_id: client_id.clone(),
            message,
        });
    }
}

pub(crate) fn now_epoch_seconds() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
