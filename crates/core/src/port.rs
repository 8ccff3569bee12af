// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `node:port` references, used for link endpoints, injected inputs and
//! output listeners.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A `(node_id, port_name)` pair with a `"node:port"` textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PortRef {
    pub node_id: String,
    pub port: String,
}

#[derive(Debug, Error)]
pub enum PortRefError {
    #[error("port reference '{0}' is not of the form node:port")]
    Malformed(String),
}

impl PortRef {
    pub fn new(node_id: impl Into<String>, port: impl Into<String>) -> Self {
        Self { node_id: node_id.into(), port: port.into() }
    }
}

impl std::str::FromStr for PortRef {
    type Err = PortRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((node_id, port)) if !node_id.is_empty() && !port.is_empty() => {
                Ok(PortRef::new(node_id, port))
            }
            _ => Err(PortRefError::Malformed(s.to_string())),
        }
    }
}

impl TryFrom<String> for PortRef {
    type Error = PortRefError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PortRef> for String {
    fn from(p: PortRef) -> String {
        p.to_string()
    }
}

impl std::fmt::Display for PortRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.node_id, self.port)
    }
}

#[cfg(test)]
#[path = "port_tests.rs"]
mod tests;
