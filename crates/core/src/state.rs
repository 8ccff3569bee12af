// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution states and status levels published by nodes and configurations.

use serde::{Deserialize, Serialize};

/// Per-node execution state, as published to hosts.
///
/// `Executed` and `Failed` are terminal for a run; marking a node dirty
/// returns it to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    Pending,
    Executing,
    Executed,
    Failed,
}

impl std::fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExecutionState::Pending => "pending",
            ExecutionState::Executing => "executing",
            ExecutionState::Executed => "executed",
            ExecutionState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Status level attached to a node or configuration status message.
///
/// `Clear` serialises to the empty string and means "remove any displayed
/// status".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
    #[serde(rename = "")]
    Clear,
}

impl std::fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StatusLevel::Info => "info",
            StatusLevel::Warning => "warning",
            StatusLevel::Error => "error",
            StatusLevel::Clear => "",
        };
        f.write_str(s)
    }
}

/// What kind of object a client or status message targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Node,
    Configuration,
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TargetType::Node => "node",
            TargetType::Configuration => "configuration",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
