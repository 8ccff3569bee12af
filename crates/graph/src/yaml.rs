// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! YAML import and export.
//!
//! The YAML form is a compact authoring format: node properties and
//! package configuration live inline, and links are written as
//! `"from[:port] => to[:port]"` strings with ports elided when the node
//! type leaves no choice.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::{Read, Write};

use lattice_schema::Schema;
use lattice_store::{DataStore, Owner, Properties};

use crate::error::GraphError;
use crate::network::Network;

#[derive(Debug, Serialize, Deserialize)]
struct YamlNode {
    #[serde(rename = "type")]
    node_type: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    properties: Map<String, Value>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct YamlTopology {
    #[serde(default)]
    metadata: Map<String, Value>,
    #[serde(default)]
    configuration: IndexMap<String, Properties>,
    #[serde(default)]
    nodes: IndexMap<String, YamlNode>,
    #[serde(default)]
    links: Vec<String>,
}

/// Import a YAML topology document, writing node and package properties
/// through the data store and adding nodes/links to the network.
pub fn import_yaml<R: Read>(
    network: &mut Network,
    store: &DataStore,
    reader: R,
) -> Result<(), GraphError> {
    let doc: YamlTopology = serde_yaml::from_reader(reader)?;

    network.set_metadata(doc.metadata)?;

    for (package_id, properties) in &doc.configuration {
        store.set_properties(&Owner::package(package_id), Some(properties))?;
    }

    for (node_id, node) in &doc.nodes {
        store.set_properties(&Owner::node(node_id), Some(&node.properties))?;
        network.add_node(node_id, &node.node_type, 0.0, 0.0, Map::new())?;
    }

    for (index, spec) in doc.links.iter().enumerate() {
        let (from, to) = spec.split_once("=>").ok_or_else(|| {
            GraphError::InvalidLink(format!("link '{}' is not of the form from => to", spec))
        })?;
        let (from_node, from_port) = split_endpoint(from);
        let (to_node, to_port) = split_endpoint(to);
        network.add_link(&format!("link{}", index), from_node, from_port, to_node, to_port)?;
    }

    Ok(())
}

/// Export the network and its stored properties as a YAML document.
pub fn export_yaml<W: Write>(
    network: &Network,
    store: &DataStore,
    writer: W,
) -> Result<(), GraphError> {
    let mut doc = YamlTopology { metadata: network.metadata().clone(), ..Default::default() };

    for node_id in network.node_ids() {
        let Some(node) = network.get_node(&node_id) else { continue };
        let (package_id, _) = Schema::split_descriptor(&node.node_type)?;
        if !doc.configuration.contains_key(package_id) {
            let properties = store.properties(&Owner::package(package_id))?;
            doc.configuration.insert(package_id.to_string(), properties);
        }
        let properties = store.properties(&Owner::node(&node_id))?;
        doc.nodes.insert(
            node_id.clone(),
            YamlNode { node_type: node.node_type.clone(), properties },
        );
    }

    for link in network.links() {
        let from_type = network
            .get_node(&link.from_node_id)
            .map(|n| network.schema().node_type(&n.node_type))
            .transpose()?;
        let to_type = network
            .get_node(&link.to_node_id)
            .map(|n| network.schema().node_type(&n.node_type))
            .transpose()?;

        let mut s = link.from_node_id.clone();
        if from_type.map_or(true, |t| t.output_ports.len() > 1) {
            s.push(':');
            s.push_str(&link.from_port);
        }
        s.push_str(" => ");
        s.push_str(&link.to_node_id);
        if to_type.map_or(true, |t| t.input_ports.len() > 1) {
            s.push(':');
            s.push_str(&link.to_port);
        }
        doc.links.push(s);
    }

    serde_yaml::to_writer(writer, &doc)?;
    Ok(())
}

fn split_endpoint(s: &str) -> (&str, Option<&str>) {
    let s = s.trim();
    match s.split_once(':') {
        Some((node, port)) => (node, Some(port)),
        None => (s, None),
    }
}

#[cfg(test)]
#[path = "yaml_tests.rs"]
mod tests;
