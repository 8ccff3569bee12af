// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence: `topology.json`, zip archives of the execution folder,
//! and the merging load that renames colliding node ids.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::{Read, Seek, Write};
use std::path::Path;
use uuid::Uuid;

use lattice_core::PortRef;

use crate::error::GraphError;
use crate::network::{Link, Network, Node};

/// What a (merging) load added to the network.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub added_nodes: Vec<String>,
    pub added_links: Vec<String>,
    /// Incoming node id -> fresh id, for nodes renamed to avoid collisions.
    pub renamings: IndexMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeRecord {
    node_type: String,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    metadata: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LinkRecord {
    from_port: PortRef,
    to_port: PortRef,
    #[serde(default)]
    link_type: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TopologyRecord {
    #[serde(default)]
    nodes: IndexMap<String, NodeRecord>,
    #[serde(default)]
    links: IndexMap<String, LinkRecord>,
    #[serde(default)]
    metadata: Map<String, Value>,
}

fn fresh_node_id() -> String {
    format!("n{}", Uuid::new_v4().simple())
}

fn fresh_link_id() -> String {
    format!("l{}", Uuid::new_v4().simple())
}

impl Network {
    /// Serialise the graph to its `topology.json` form.
    pub fn save(&self) -> Result<Value, GraphError> {
        let record = TopologyRecord {
            nodes: self
                .nodes
                .iter()
                .map(|(id, n)| {
                    (
                        id.clone(),
                        NodeRecord {
                            node_type: n.node_type.clone(),
                            x: n.x,
                            y: n.y,
                            metadata: n.metadata.clone(),
                        },
                    )
                })
                .collect(),
            links: self
                .links
                .iter()
                .map(|(id, l)| {
                    (
                        id.clone(),
                        LinkRecord {
                            from_port: PortRef::new(&l.from_node_id, &l.from_port),
                            to_port: PortRef::new(&l.to_node_id, &l.to_port),
                            link_type: l.link_type.clone(),
                        },
                    )
                })
                .collect(),
            metadata: self.metadata.clone(),
        };
        Ok(serde_json::to_value(record)?)
    }

    /// Write `topology.json` under the save directory.
    pub(crate) fn save_dir(&self) -> Result<(), GraphError> {
        fs::create_dir_all(self.savedir())?;
        let saved = self.save()?;
        fs::write(self.savedir().join("topology.json"), serde_json::to_string(&saved)?)?;
        Ok(())
    }

    /// Load `topology.json` from the save directory, merging into the
    /// current graph.
    pub fn load_dir(&mut self) -> Result<LoadOutcome, GraphError> {
        let path = self.savedir().join("topology.json");
        if !path.exists() {
            return Ok(LoadOutcome::default());
        }
        let content = fs::read_to_string(&path)?;
        let value: Value = serde_json::from_str(&content)?;
        self.load_value(&value)
    }

    /// Merge a saved topology into this one. Incoming nodes whose ids
    /// collide with existing nodes are renamed to a fresh `n<uuid>` id and
    /// reported in the outcome; link endpoints follow the renaming.
    pub fn load_value(&mut self, from: &Value) -> Result<LoadOutcome, GraphError> {
        let record: TopologyRecord = serde_json::from_value(from.clone())?;
        let mut outcome = LoadOutcome::default();

        for (id, node) in record.nodes {
            let target_id = if self.nodes.contains_key(&id) {
                let fresh = fresh_node_id();
                outcome.renamings.insert(id.clone(), fresh.clone());
                fresh
            } else {
                id.clone()
            };
            self.schema().node_type(&node.node_type)?;
            self.nodes.insert(
                target_id.clone(),
                Node {
                    id: target_id.clone(),
                    node_type: node.node_type,
                    x: node.x,
                    y: node.y,
                    metadata: node.metadata,
                },
            );
            outcome.added_nodes.push(target_id);
        }

        for (id, link) in record.links {
            let target_id =
                if self.links.contains_key(&id) { fresh_link_id() } else { id.clone() };
            let rename = |node_id: &str| -> String {
                outcome.renamings.get(node_id).cloned().unwrap_or_else(|| node_id.to_string())
            };
            self.links.insert(
                target_id.clone(),
                Link {
                    id: target_id.clone(),
                    from_node_id: rename(&link.from_port.node_id),
                    from_port: link.from_port.port,
                    to_node_id: rename(&link.to_port.node_id),
                    to_port: link.to_port.port,
                    link_type: link.link_type,
                },
            );
            outcome.added_links.push(target_id);
        }

        if !record.metadata.is_empty() {
            self.metadata = record.metadata;
        }

        self.save_dir()?;
        Ok(outcome)
    }

    /// Write the portable zip archive: `topology.json` plus the `node/`
    /// and `package/` owner trees of the execution folder.
    pub fn save_zip<W: Write + Seek>(&self, writer: W) -> Result<(), GraphError> {
        let mut zip = zip::ZipWriter::new(writer);
        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);

        zip.start_file("topology.json", options)?;
        zip.write_all(serde_json::to_string(&self.save()?)?.as_bytes())?;

        for subtree in ["node", "package"] {
            let root = self.savedir().join(subtree);
            if root.is_dir() {
                add_dir_to_zip(&mut zip, self.savedir(), &root, options)?;
            }
        }

        zip.finish()?;
        Ok(())
    }

    /// Load a zip archive, merging its topology and extracting its owner
    /// trees into the execution folder (following node renamings).
    pub fn load_zip<R: Read + Seek>(&mut self, reader: R) -> Result<LoadOutcome, GraphError> {
        let mut archive = zip::ZipArchive::new(reader)?;

        let saved: Value = {
            let mut entry = archive.by_name("topology.json")?;
            let mut content = String::new();
            entry.read_to_string(&mut content)?;
            serde_json::from_str(&content)?
        };
        let outcome = self.load_value(&saved)?;

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let Some(target) = remap_entry_path(&name, &outcome.renamings) else {
                continue;
            };
            let path = self.savedir().join(target);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes)?;
            fs::write(&path, bytes)?;
        }

        Ok(outcome)
    }
}

/// Map a zip entry under `node/` or `package/` onto the execution folder,
/// rewriting the owner id of renamed nodes. Other entries are skipped.
fn remap_entry_path(name: &str, renamings: &IndexMap<String, String>) -> Option<String> {
    let mut parts = name.splitn(3, '/');
    let kind = parts.next()?;
    let owner = parts.next()?;
    let rest = parts.next()?;
    if rest.is_empty() {
        return None;
    }
    match kind {
        "node" => {
            let owner = renamings.get(owner).map(String::as_str).unwrap_or(owner);
            Some(format!("node/{}/{}", owner, rest))
        }
        "package" => Some(format!("package/{}/{}", owner, rest)),
        _ => None,
    }
}

fn add_dir_to_zip<W: Write + Seek>(
    zip: &mut zip::ZipWriter<W>,
    base: &Path,
    dir: &Path,
    options: zip::write::FileOptions,
) -> Result<(), GraphError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            add_dir_to_zip(zip, base, &path, options)?;
        } else if path.extension().map_or(true, |e| e != "tmp") {
            let relative = path.strip_prefix(base).unwrap_or(&path);
            let name = relative.to_string_lossy().replace('\\', "/");
            zip.start_file(name, options)?;
            let bytes = fs::read(&path)?;
            zip.write_all(&bytes)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
