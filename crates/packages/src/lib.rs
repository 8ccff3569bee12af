// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! lattice-packages: built-in node packages.
//!
//! Currently one package, `numbergraph`: small integer-processing nodes
//! used by the demo topologies and the end-to-end tests. Workers resolve
//! package ids from this registry when rebuilding their class map.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod numbergraph;

use lattice_engine::ClassMap;

/// Register every built-in package.
pub fn register_builtin(class_map: &mut ClassMap) {
    numbergraph::register(class_map);
}
