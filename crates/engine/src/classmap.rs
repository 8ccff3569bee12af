// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The class map: how `package:type` descriptors become instances.
//!
//! Hosts populate the map at startup; the worker process rebuilds it from
//! its statically registered packages when it receives `init`.

use std::collections::HashMap;

use crate::api::{Configuration, Node};
use crate::services::{ConfigurationServices, NodeServices};

/// Constructs a node instance for one node type.
pub type NodeFactory = Box<dyn Fn(NodeServices) -> Box<dyn Node> + Send + Sync>;

/// Constructs the package's configuration instance.
pub type ConfigurationFactory =
    Box<dyn Fn(ConfigurationServices) -> Box<dyn Configuration> + Send + Sync>;

/// Factories for one package.
#[derive(Default)]
pub struct PackageClasses {
    nodes: HashMap<String, NodeFactory>,
    configuration: Option<ConfigurationFactory>,
}

impl PackageClasses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node<F>(mut self, node_type_id: impl Into<String>, factory: F) -> Self
    where
        F: Fn(NodeServices) -> Box<dyn Node> + Send + Sync + 'static,
    {
        self.nodes.insert(node_type_id.into(), Box::new(factory));
        self
    }

    pub fn configuration<F>(mut self, factory: F) -> Self
    where
        F: Fn(ConfigurationServices) -> Box<dyn Configuration> + Send + Sync + 'static,
    {
        self.configuration = Some(Box::new(factory));
        self
    }
}

/// Registry mapping package ids to their factories.
#[derive(Default)]
pub struct ClassMap {
    packages: HashMap<String, PackageClasses>,
}

impl ClassMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_package(&mut self, package_id: impl Into<String>, classes: PackageClasses) {
        self.packages.insert(package_id.into(), classes);
    }

    pub fn has_package(&self, package_id: &str) -> bool {
        self.packages.contains_key(package_id)
    }

    pub(crate) fn node_factory(&self, package_id: &str, node_type_id: &str) -> Option<&NodeFactory> {
        self.packages.get(package_id)?.nodes.get(node_type_id)
    }

    pub(crate) fn configuration_factory(&self, package_id: &str) -> Option<&ConfigurationFactory> {
        self.packages.get(package_id)?.configuration.as_ref()
    }
}
