// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! lattice-schema: package definitions and node/link-type registries.
//!
//! A package is described by a `schema.json` in its directory, declaring
//! node types (with typed input/output ports), link types and an optional
//! per-package configuration class.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod schema;
mod types;

pub use schema::{Schema, SchemaError};
pub use types::{ConfigurationSpec, LinkType, NodeType, Package, Port};
