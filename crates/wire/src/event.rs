// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event packets sent from the worker back to the host.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use lattice_core::{ClientId, ExecutionState, StatusLevel, TargetType};

/// Event from worker to host.
///
/// Events from a single node arrive in the order the engine emitted them;
/// no ordering is promised across nodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Event {
    UpdateExecutionState {
        node_id: String,
        execution_state: ExecutionState,
        #[serde(default)]
        exn: Option<String>,
        #[serde(default)]
        is_manual: bool,
        /// Seconds since the epoch at emission time.
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

    /// A message from a node/configuration to an attached client; the
    /// message parts follow the control packet.
    ClientMessage {
        origin_id: String,
        origin_type: TargetType,
        client_id: ClientId,
    },

    ExecutionComplete {
        count_failed: usize,
    },
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
