// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client identifiers.
//!
//! Interactive clients identify themselves with either a bare string or a
//! two-element compound (typically `(session, kind)`). Both forms are
//! normalised into this enum so they can be compared and hashed uniformly
//! and round-trip through JSON as either a string or a two-element array.

use serde::{Deserialize, Serialize};

/// Identifier for a client attached to a node or configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientId {
    Single(String),
    Pair(String, String),
}

impl ClientId {
    pub fn pair(a: impl Into<String>, b: impl Into<String>) -> Self {
        ClientId::Pair(a.into(), b.into())
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        ClientId::Single(s.to_string())
    }
}

impl From<String> for ClientId {
    fn from(s: String) -> Self {
        ClientId::Single(s)
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientId::Single(s) => f.write_str(s),
            ClientId::Pair(a, b) => write!(f, "{}/{}", a, b),
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
