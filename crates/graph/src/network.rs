// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The in-memory graph: nodes, links, metadata, validation and traversal.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use lattice_schema::{NodeType, Schema};

use crate::error::GraphError;

/// A vertex of the graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    /// `package:type` descriptor.
    pub node_type: String,
    pub x: f64,
    pub y: f64,
    pub metadata: Map<String, Value>,
}

/// A typed directed edge between an output port and an input port.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: String,
    pub from_node_id: String,
    pub from_port: String,
    pub to_node_id: String,
    pub to_port: String,
    pub link_type: String,
}

/// The graph model for one topology.
///
/// Node and link maps are insertion-ordered; traversal order tie-breaks
/// on insertion order so repeated runs are deterministic.
#[derive(Debug)]
pub struct Network {
    schema: Schema,
    savedir: PathBuf,
    pub(crate) nodes: IndexMap<String, Node>,
    pub(crate) links: IndexMap<String, Link>,
    pub(crate) metadata: Map<String, Value>,
}

impl Network {
    pub fn new(schema: Schema, savedir: impl Into<PathBuf>) -> Self {
        Self {
            schema,
            savedir: savedir.into(),
            nodes: IndexMap::new(),
            links: IndexMap::new(),
            metadata: Map::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn savedir(&self) -> &Path {
        &self.savedir
    }

    pub fn set_metadata(&mut self, metadata: Map<String, Value>) -> Result<(), GraphError> {
        self.metadata = metadata;
        self.save_dir()
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Add a node after checking id uniqueness and type resolution.
    pub fn add_node(
        &mut self,
        id: &str,
        node_type: &str,
        x: f64,
        y: f64,
        metadata: Map<String, Value>,
    ) -> Result<(), GraphError> {
        if self.nodes.contains_key(id) {
            return Err(GraphError::InvalidNode(format!("node with id {} already exists", id)));
        }
        self.schema.node_type(node_type)?;
        self.nodes.insert(
            id.to_string(),
            Node { id: id.to_string(), node_type: node_type.to_string(), x, y, metadata },
        );
        self.save_dir()
    }

    /// Remove a node and every link attached to it. Returns the ids of
    /// the removed links.
    pub fn remove_node(&mut self, id: &str) -> Result<Vec<String>, GraphError> {
        if self.nodes.shift_remove(id).is_none() {
            return Err(GraphError::InvalidNode(format!("no node with id {}", id)));
        }
        let removed_links: Vec<String> = self
            .links
            .values()
            .filter(|l| l.from_node_id == id || l.to_node_id == id)
            .map(|l| l.id.clone())
            .collect();
        for link_id in &removed_links {
            self.links.shift_remove(link_id);
        }
        self.save_dir()?;
        Ok(removed_links)
    }

    pub fn move_node(&mut self, id: &str, x: f64, y: f64) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::InvalidNode(format!("no node with id {}", id)))?;
        node.x = x;
        node.y = y;
        self.save_dir()
    }

    /// Add a link after full endpoint validation. Port names may be
    /// omitted when the corresponding node type has exactly one candidate
    /// port. Returns the completed link.
    pub fn add_link(
        &mut self,
        id: &str,
        from_node_id: &str,
        from_port: Option<&str>,
        to_node_id: &str,
        to_port: Option<&str>,
    ) -> Result<Link, GraphError> {
        if self.links.contains_key(id) {
            return Err(GraphError::InvalidLink(format!("link with id {} already exists", id)));
        }

        let from_type = self.node_type_of(from_node_id)?;
        let to_type = self.node_type_of(to_node_id)?;

        let from_port = resolve_port(from_node_id, from_port, &from_type, Direction::Output)?;
        let to_port = resolve_port(to_node_id, to_port, &to_type, Direction::Input)?;

        // resolve_port guarantees presence
        let from_port_def = from_type
            .output_ports
            .get(&from_port)
            .ok_or_else(|| GraphError::InvalidLink(format!("unknown port {}", from_port)))?;
        let to_port_def = to_type
            .input_ports
            .get(&to_port)
            .ok_or_else(|| GraphError::InvalidLink(format!("unknown port {}", to_port)))?;

        if from_port_def.link_type != to_port_def.link_type {
            return Err(GraphError::InvalidLink(format!(
                "incompatible link types (from: {}, to: {})",
                from_port_def.link_type, to_port_def.link_type
            )));
        }

        if !from_port_def.allow_multiple_connections
            && !self.outputs_from(from_node_id, Some(&from_port)).is_empty()
        {
            return Err(GraphError::InvalidLink(format!(
                "output port {}:{} is already connected and does not allow multiple connections",
                from_node_id, from_port
            )));
        }

        if !to_port_def.allow_multiple_connections
            && !self.inputs_to(to_node_id, Some(&to_port)).is_empty()
        {
            return Err(GraphError::InvalidLink(format!(
                "input port {}:{} is already connected and does not allow multiple connections",
                to_node_id, to_port
            )));
        }

        let link = Link {
            id: id.to_string(),
            from_node_id: from_node_id.to_string(),
            from_port,
            to_node_id: to_node_id.to_string(),
            to_port,
            link_type: from_port_def.link_type.clone(),
        };
        self.links.insert(id.to_string(), link.clone());
        self.save_dir()?;
        Ok(link)
    }

    pub fn remove_link(&mut self, id: &str) -> Result<Link, GraphError> {
        let link = self
            .links
            .shift_remove(id)
            .ok_or_else(|| GraphError::InvalidLink(format!("no link with id {}", id)))?;
        self.save_dir()?;
        Ok(link)
    }

    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_link(&self, id: &str) -> Option<&Link> {
        self.links.get(id)
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    pub fn link_ids(&self) -> Vec<String> {
        self.links.keys().cloned().collect()
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    /// Node ids in dependency order: a node is listed once all of its
    /// predecessors are listed, ties broken by insertion order.
    pub fn traversal_order(&self) -> Vec<String> {
        let mut ordered: Vec<String> = Vec::new();
        let mut placed: HashSet<&str> = HashSet::new();
        let mut remaining: Vec<&str> = self.nodes.keys().map(String::as_str).collect();

        while !remaining.is_empty() {
            let mut progressed = false;
            remaining.retain(|&id| {
                let ready = self
                    .links
                    .values()
                    .filter(|l| l.to_node_id == id)
                    .all(|l| placed.contains(l.from_node_id.as_str()));
                if ready {
                    ordered.push(id.to_string());
                    placed.insert(id);
                    progressed = true;
                }
                !ready
            });
            if !progressed {
                // cycle: fall back to insertion order for the remainder
                ordered.extend(remaining.iter().map(|s| s.to_string()));
                break;
            }
        }
        ordered
    }

    /// `(from_node, from_port)` pairs feeding the given node.
    pub fn inputs_to(&self, node_id: &str, port: Option<&str>) -> Vec<(String, String)> {
        self.links
            .values()
            .filter(|l| l.to_node_id == node_id && port.map_or(true, |p| l.to_port == p))
            .map(|l| (l.from_node_id.clone(), l.from_port.clone()))
            .collect()
    }

    /// `(to_node, to_port)` pairs fed by the given node.
    pub fn outputs_from(&self, node_id: &str, port: Option<&str>) -> Vec<(String, String)> {
        self.links
            .values()
            .filter(|l| l.from_node_id == node_id && port.map_or(true, |p| l.from_port == p))
            .map(|l| (l.to_node_id.clone(), l.to_port.clone()))
            .collect()
    }

    /// Per-port connection counts, `(inputs, outputs)`.
    pub fn connection_counts(
        &self,
        node_id: &str,
    ) -> (IndexMap<String, usize>, IndexMap<String, usize>) {
        let mut inputs: IndexMap<String, usize> = IndexMap::new();
        let mut outputs: IndexMap<String, usize> = IndexMap::new();
        for link in self.links.values() {
            if link.to_node_id == node_id {
                *inputs.entry(link.to_port.clone()).or_insert(0) += 1;
            }
            if link.from_node_id == node_id {
                *outputs.entry(link.from_port.clone()).or_insert(0) += 1;
            }
        }
        (inputs, outputs)
    }

    /// Every node reachable from `node_id` via outgoing links, including
    /// `node_id` itself.
    pub fn downstream_of(&self, node_id: &str) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut stack = vec![node_id.to_string()];
        let mut out = Vec::new();
        while let Some(id) = stack.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            out.push(id.clone());
            for link in self.links.values() {
                if link.from_node_id == id {
                    stack.push(link.to_node_id.clone());
                }
            }
        }
        out
    }

    pub fn clear(&mut self) -> Result<(), GraphError> {
        self.nodes.clear();
        self.links.clear();
        self.save_dir()
    }

    fn node_type_of(&self, node_id: &str) -> Result<NodeType, GraphError> {
        let node = self
            .nodes
            .get(node_id)
            .ok_or_else(|| GraphError::InvalidLink(format!("{} does not exist", node_id)))?;
        Ok(self.schema.node_type(&node.node_type)?.clone())
    }
}

enum Direction {
    Input,
    Output,
}

fn resolve_port(
    node_id: &str,
    port: Option<&str>,
    node_type: &NodeType,
    direction: Direction,
) -> Result<String, GraphError> {
    let (ports, kind) = match direction {
        Direction::Input => (&node_type.input_ports, "input"),
        Direction::Output => (&node_type.output_ports, "output"),
    };
    match port {
        Some(name) => {
            if ports.contains_key(name) {
                Ok(name.to_string())
            } else {
                Err(GraphError::InvalidLink(format!(
                    "{} is not a valid {} port for node {}",
                    name, kind, node_id
                )))
            }
        }
        None => {
            if ports.len() == 1 {
                // single candidate, checked above
                match ports.keys().next() {
                    Some(name) => Ok(name.clone()),
                    None => Err(GraphError::InvalidLink(format!(
                        "node {} has no {} ports",
                        node_id, kind
                    ))),
                }
            } else {
                let names: Vec<&str> = ports.keys().map(String::as_str).collect();
                Err(GraphError::InvalidLink(format!(
                    "{} port not specified for link, should be one of ({})",
                    kind,
                    names.join(",")
                )))
            }
        }
    }
}

#[cfg(test)]
#[path = "network_tests.rs"]
mod tests;
