// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! lattice-graph: the graph model.
//!
//! Maintains nodes, links and metadata for one topology, validates
//! mutations against the schema, provides deterministic traversal order
//! and adjacency queries, and persists the graph as `topology.json`
//! under the execution folder, as a zip archive of that folder, or as a
//! YAML document.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod error;
mod network;
mod persist;
#[cfg(test)]
mod testutil;
mod yaml;

pub use error::GraphError;
pub use network::{Link, Network, Node};
pub use persist::LoadOutcome;
pub use yaml::{export_yaml, import_yaml};
