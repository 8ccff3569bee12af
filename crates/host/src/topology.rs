// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Topology` facade: a graph model, a schema, an execution folder
//! and an execution manager bound together.

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::{Read, Seek, Write};
use std::path::PathBuf;
use std::sync::Arc;

use lattice_core::{ExecutionState, PortRef, StatusLevel, TargetType};
use lattice_graph::{export_yaml, import_yaml, Network};
use lattice_schema::Schema;
use lattice_store::{Blob, DataStore, Owner, Properties};

use crate::error::HostError;
use crate::interactor::TopologyInteractor;
use crate::manager::{ExecutionManager, LinkReplay, ManagerOptions, RegisterFn, ReplayPlan};

/// Host-side options for a topology.
#[derive(Clone, Default)]
pub struct TopologyOptions {
    /// Run the worker in a child process instead of an in-process thread.
    pub separate_process: bool,
    /// Worker binary for out-of-process mode.
    pub worker_command: Option<PathBuf>,
}

/// One executable computation graph and its persistent state.
pub struct Topology {
    store: DataStore,
    network: Mutex<Network>,
    manager: ExecutionManager,
    outputs: Arc<Mutex<HashMap<String, IndexMap<String, Value>>>>,
}

impl Topology {
    /// Create a topology over `execution_folder`, loading the schema of
    /// each package directory and any previously saved graph.
    pub fn new(
        execution_folder: impl Into<PathBuf>,
        package_dirs: &[PathBuf],
        register: RegisterFn,
    ) -> Result<Self, HostError> {
        Self::with_options(execution_folder, package_dirs, register, TopologyOptions::default())
    }

    pub fn with_options(
        execution_folder: impl Into<PathBuf>,
        package_dirs: &[PathBuf],
        register: RegisterFn,
        options: TopologyOptions,
    ) -> Result<Self, HostError> {
        let execution_folder = execution_folder.into();
        std::fs::create_dir_all(&execution_folder)?;

        let mut schema = Schema::new();
        for dir in package_dirs {
            schema.load_package_dir(dir)?;
        }

        let mut network = Network::new(schema, &execution_folder);
        network.load_dir()?;

        let manager = ExecutionManager::new(
            ManagerOptions {
                execution_folder: execution_folder.clone(),
                packages: package_dirs.to_vec(),
                in_process: !options.separate_process,
                worker_command: options.worker_command,
            },
            register,
        );

        Ok(Self {
            store: DataStore::new(&execution_folder),
            network: Mutex::new(network),
            manager,
            outputs: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn execution_folder(&self) -> PathBuf {
        self.store.root().to_path_buf()
    }

    /// Register a handler for node/configuration status messages.
    pub fn set_status_handler(
        &self,
        handler: impl Fn(&str, TargetType, StatusLevel, &str) + Send + Sync + 'static,
    ) {
        self.manager.on_status(handler);
    }

    /// Register a handler for node execution-state changes.
    pub fn set_execution_handler(
        &self,
        handler: impl Fn(f64, &str, ExecutionState, Option<&str>, bool) + Send + Sync + 'static,
    ) {
        self.manager.on_execution_state(handler);
    }

    // === graph mutation ===

    /// Add a node with initial properties.
    pub fn add_node(
        &self,
        node_id: &str,
        node_type: &str,
        properties: Properties,
    ) -> Result<(), HostError> {
        self.store.set_properties(&Owner::node(node_id), Some(&properties))?;
        self.network.lock().add_node(node_id, node_type, 0.0, 0.0, Map::new())?;
        if self.manager.is_running() {
            self.manager.notify_add_node(node_id, node_type);
        }
        Ok(())
    }

    /// Remove a node, its links and its persisted state.
    pub fn remove_node(&self, node_id: &str) -> Result<(), HostError> {
        let removed_links = self.network.lock().remove_node(node_id)?;
        if self.manager.is_running() {
            for link_id in &removed_links {
                self.manager.notify_remove_link(link_id);
            }
            self.manager.notify_remove_node(node_id);
        }
        self.store.remove_owner(&Owner::node(node_id))?;
        Ok(())
    }

    /// Add a link; port names may be omitted when unambiguous.
    pub fn add_link(
        &self,
        link_id: &str,
        from_node_id: &str,
        from_port: Option<&str>,
        to_node_id: &str,
        to_port: Option<&str>,
    ) -> Result<(), HostError> {
        let link = self
            .network
            .lock()
            .add_link(link_id, from_node_id, from_port, to_node_id, to_port)?;
        if self.manager.is_running() {
            self.manager.notify_add_link(
                &LinkReplay {
                    link_id: link.id,
                    from_node_id: link.from_node_id,
                    from_port: link.from_port,
                    to_node_id: link.to_node_id,
                    to_port: link.to_port,
                    link_type: link.link_type,
                },
                false,
            );
        }
        Ok(())
    }

    pub fn remove_link(&self, link_id: &str) -> Result<(), HostError> {
        self.network.lock().remove_link(link_id)?;
        if self.manager.is_running() {
            self.manager.notify_remove_link(link_id);
        }
        Ok(())
    }

    /// Remove every node and link, dropping all engine state.
    pub fn clear(&self) -> Result<(), HostError> {
        self.network.lock().clear()?;
        if self.manager.is_running() {
            self.manager.notify_clear();
        }
        Ok(())
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.network.lock().node_ids()
    }

    pub fn link_ids(&self) -> Vec<String> {
        self.network.lock().link_ids()
    }

    /// `(package_id, node_type_id)` for a node.
    pub fn node_type(&self, node_id: &str) -> Option<(String, String)> {
        let network = self.network.lock();
        let node = network.get_node(node_id)?;
        Schema::split_descriptor(&node.node_type)
            .ok()
            .map(|(p, t)| (p.to_string(), t.to_string()))
    }

    pub fn set_metadata(&self, metadata: Map<String, Value>) -> Result<(), HostError> {
        self.network.lock().set_metadata(metadata)?;
        Ok(())
    }

    pub fn metadata(&self) -> Map<String, Value> {
        self.network.lock().metadata().clone()
    }

    // === properties and data ===

    pub fn get_node_property(&self, node_id: &str, name: &str) -> Result<Option<Value>, HostError> {
        Ok(self.store.property(&Owner::node(node_id), name)?)
    }

    pub fn set_node_property(
        &self,
        node_id: &str,
        name: &str,
        value: Option<Value>,
    ) -> Result<(), HostError> {
        Ok(self.store.set_property(&Owner::node(node_id), name, value)?)
    }

    pub fn get_node_data(&self, node_id: &str, key: &str) -> Result<Option<Blob>, HostError> {
        Ok(self.store.data(&Owner::node(node_id), key)?)
    }

    pub fn set_node_data(
        &self,
        node_id: &str,
        key: &str,
        data: Option<Blob>,
    ) -> Result<(), HostError> {
        Ok(self.store.set_data(&Owner::node(node_id), key, data)?)
    }

    pub fn get_package_property(
        &self,
        package_id: &str,
        name: &str,
    ) -> Result<Option<Value>, HostError> {
        Ok(self.store.property(&Owner::package(package_id), name)?)
    }

    pub fn set_package_property(
        &self,
        package_id: &str,
        name: &str,
        value: Option<Value>,
    ) -> Result<(), HostError> {
        Ok(self.store.set_property(&Owner::package(package_id), name, value)?)
    }

    /// Replace a package's configuration properties wholesale.
    pub fn set_configuration(
        &self,
        package_id: &str,
        properties: Properties,
    ) -> Result<(), HostError> {
        Ok(self.store.set_properties(&Owner::package(package_id), Some(&properties))?)
    }

    // === persistence ===

    /// Save the portable zip archive.
    pub fn save_zip<W: Write + Seek>(&self, writer: W) -> Result<(), HostError> {
        self.network.lock().save_zip(writer)?;
        Ok(())
    }

    /// Merge-load a zip archive. Returns the node renaming map.
    pub fn load_zip<R: Read + Seek>(
        &self,
        reader: R,
    ) -> Result<IndexMap<String, String>, HostError> {
        let outcome = self.network.lock().load_zip(reader)?;
        if self.manager.is_running() {
            let network = self.network.lock();
            for node_id in &outcome.added_nodes {
                if let Some(node) = network.get_node(node_id) {
                    self.manager.notify_add_node(node_id, &node.node_type);
                }
            }
            for link_id in &outcome.added_links {
                if let Some(link) = network.get_link(link_id) {
                    self.manager.notify_add_link(
                        &LinkReplay {
                            link_id: link.id.clone(),
                            from_node_id: link.from_node_id.clone(),
                            from_port: link.from_port.clone(),
                            to_node_id: link.to_node_id.clone(),
                            to_port: link.to_port.clone(),
                            link_type: link.link_type.clone(),
                        },
                        false,
                    );
                }
            }
        }
        Ok(outcome.renamings)
    }

    pub fn import_yaml<R: Read>(&self, reader: R) -> Result<(), HostError> {
        let mut network = self.network.lock();
        import_yaml(&mut network, &self.store, reader)?;
        Ok(())
    }

    pub fn export_yaml<W: Write>(&self, writer: W) -> Result<(), HostError> {
        let network = self.network.lock();
        export_yaml(&network, &self.store, writer)?;
        Ok(())
    }

    // === execution ===

    /// Run the topology to completion. Returns true iff no node failed.
    pub fn run(&self) -> Result<bool, HostError> {
        self.run_with(Vec::new(), Vec::new())
    }

    /// Run with injected input values and output listeners, keyed by
    /// `node:port` references.
    pub fn run_with(
        &self,
        injected_inputs: Vec<(PortRef, Value)>,
        output_listeners: Vec<(PortRef, Box<dyn Fn(Value) + Send + Sync>)>,
    ) -> Result<bool, HostError> {
        self.manager.reset_io();
        self.outputs.lock().clear();
        self.register_output_capture();

        for (port_ref, value) in injected_inputs {
            self.manager.inject_input(&port_ref.node_id, &port_ref.port, value);
        }
        for (port_ref, listener) in output_listeners {
            self.manager
                .add_output_listener(&port_ref.node_id, &port_ref.port, listener);
        }

        let plan = self.replay_plan();
        self.manager.run(&plan, true)
    }

    /// Outputs observed for a node during the last run.
    pub fn node_outputs(&self, node_id: &str) -> Option<IndexMap<String, Value>> {
        self.outputs.lock().get(node_id).cloned()
    }

    /// Stop the current run; callable from another thread.
    pub fn stop(&self) {
        self.manager.stop();
    }

    /// Begin an interactive session over this topology.
    pub fn interactive_session(&self) -> TopologyInteractor<'_> {
        TopologyInteractor::new(self)
    }

    pub(crate) fn manager(&self) -> &ExecutionManager {
        &self.manager
    }

    /// Listen on every declared output port so `node_outputs` reflects
    /// the run.
    pub(crate) fn register_output_capture(&self) {
        let network = self.network.lock();
        for node_id in network.node_ids() {
            let Some(node) = network.get_node(&node_id) else { continue };
            let Ok(node_type) = network.schema().node_type(&node.node_type) else { continue };
            for port in node_type.output_ports.keys() {
                let outputs = Arc::clone(&self.outputs);
                let capture_node = node_id.clone();
                let capture_port = port.clone();
                self.manager.add_output_listener(&node_id, port, move |value| {
                    outputs
                        .lock()
                        .entry(capture_node.clone())
                        .or_default()
                        .insert(capture_port.clone(), value);
                });
            }
        }
    }

    /// Snapshot the graph for worker replay.
    pub(crate) fn replay_plan(&self) -> ReplayPlan {
        let network = self.network.lock();
        ReplayPlan {
            packages: network.schema().packages().map(|p| p.id.clone()).collect(),
            nodes: {
                let mut nodes = Vec::new();
                for node_id in network.traversal_order() {
                    if let Some(node) = network.get_node(&node_id) {
                        nodes.push((node_id.clone(), node.node_type.clone()));
                    }
                }
                nodes
            },
            links: network
                .links()
                .map(|link| LinkReplay {
                    link_id: link.id.clone(),
                    from_node_id: link.from_node_id.clone(),
                    from_port: link.from_port.clone(),
                    to_node_id: link.to_node_id.clone(),
                    to_port: link.to_port.clone(),
                    link_type: link.link_type.clone(),
                })
                .collect(),
        }
    }
}

impl std::fmt::Debug for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Topology").field("execution_folder", &self.store.root()).finish()
    }
}

#[cfg(test)]
#[path = "topology_tests.rs"]
mod tests;
