// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deserialised package definition types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// A named attachment point on a node type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    pub link_type: String,
    #[serde(default)]
    pub allow_multiple_connections: bool,
}

/// A node type declared by a package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeType {
    /// Implementation descriptor, resolved against the host's class map.
    #[serde(default)]
    pub classname: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub input_ports: IndexMap<String, Port>,
    #[serde(default)]
    pub output_ports: IndexMap<String, Port>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// A link type declared by a package.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkType {
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// The optional per-package configuration declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigurationSpec {
    #[serde(default)]
    pub classname: Option<String>,
}

impl ConfigurationSpec {
    pub fn is_declared(&self) -> bool {
        self.classname.is_some()
    }
}

/// A loaded package definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub node_types: IndexMap<String, NodeType>,
    #[serde(default)]
    pub link_types: IndexMap<String, LinkType>,
    #[serde(default)]
    pub configuration: ConfigurationSpec,
    /// Directory the package was loaded from; not part of the definition.
    #[serde(skip)]
    pub dir: Option<PathBuf>,
}

impl Package {
    /// Parse a package from its `schema.json` content, dropping disabled
    /// node types.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        let mut package: Package = serde_json::from_str(content)?;
        package.node_types.retain(|_, nt| nt.enabled);
        Ok(package)
    }

    pub fn node_type(&self, node_type_id: &str) -> Option<&NodeType> {
        self.node_types.get(node_type_id)
    }
}
