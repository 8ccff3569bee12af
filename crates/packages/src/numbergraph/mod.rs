// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `numbergraph` package: integer sources, transforms and sinks.

mod configuration;
mod nodes;

pub use configuration::NumbergraphConfiguration;
pub use nodes::{
    DoublerNode, IntegerDisplayNode, IntegerSumNode, IntegerValueNode, PrimeFactorsNode,
};

use std::path::Path;

use lattice_engine::{ClassMap, PackageClasses};

/// The package definition, embedded so hosts can materialise it.
pub const SCHEMA_JSON: &str = include_str!("schema.json");

/// The package id, as declared in the schema.
pub const PACKAGE_ID: &str = "numbergraph";

/// Register the package's factories.
pub fn register(class_map: &mut ClassMap) {
    class_map.register_package(
        PACKAGE_ID,
        PackageClasses::new()
            .node("integer_value", |services| Box::new(IntegerValueNode::new(services)))
            .node("doubler", |_services| Box::new(DoublerNode))
            .node("integer_sum", |_services| Box::new(IntegerSumNode))
            .node("prime_factors", |services| Box::new(PrimeFactorsNode::new(services)))
            .node("integer_display", |services| Box::new(IntegerDisplayNode::new(services)))
            .configuration(|services| Box::new(NumbergraphConfiguration::new(services))),
    );
}

/// Write the package directory (just `schema.json`) under `dir`, so the
/// package can be passed to a topology by path.
pub fn materialize(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    std::fs::write(dir.join("schema.json"), SCHEMA_JSON)
}

#[cfg(test)]
#[path = "numbergraph_tests.rs"]
mod tests;
