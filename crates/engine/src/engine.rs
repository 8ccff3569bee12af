// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dirty/dispatch scheduler.
//!
//! All state lives behind one `Rc<RefCell<..>>` shared between the
//! command loop and spawned node tasks; borrows never cross an await
//! point. Node executions run as `spawn_local` tasks, bounded by
//! `execution_limit`.

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::rc::Rc;
use thiserror::Error;
use tokio::sync::mpsc;

use lattice_core::{ClientId, ExecutionState, Message, TargetType};
use lattice_store::DataStore;

use crate::classmap::ClassMap;
use crate::command::{EngineCommand, EngineHandle, LinkSpec};
use crate::event::{EngineEvent, EventSink};
use crate::services::{ConfigurationServices, NodeServices};
use crate::wrapper::{ConfigurationWrapper, NodeWrapper};
use crate::PortValues;

/// Errors from engine registration operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid type descriptor '{0}', expected package:type")]
    BadDescriptor(String),
    #[error("no implementation registered for '{0}'")]
    MissingFactory(String),
}

/// Engine construction parameters.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub execution_folder: PathBuf,
    /// Maximum concurrently executing node tasks.
    pub execution_limit: usize,
}

impl EngineConfig {
    pub fn new(execution_folder: impl Into<PathBuf>) -> Self {
        Self { execution_folder: execution_folder.into(), execution_limit: 4 }
    }
}

struct EngineState {
    class_map: ClassMap,
    store: DataStore,

    nodes: HashMap<String, Rc<NodeWrapper>>,
    configurations: HashMap<String, Rc<ConfigurationWrapper>>,
    links: IndexMap<String, LinkSpec>,
    in_links: HashMap<String, IndexMap<String, Vec<LinkSpec>>>,
    out_links: HashMap<String, IndexMap<String, Vec<LinkSpec>>>,

    dirty: IndexSet<String>,
    executing: IndexSet<String>,
    executed: HashSet<String>,
    failed: IndexMap<String, String>,
    outputs: HashMap<String, IndexMap<String, Value>>,

    injected_inputs: IndexMap<(String, String), Value>,
    output_listeners: HashSet<(String, String)>,

    execution_limit: usize,
    paused: bool,
    stopping: bool,

    pending_clients: HashMap<(TargetType, String), Vec<(ClientId, Value)>>,
    pending_messages: HashMap<(TargetType, String), Vec<(ClientId, Message)>>,

    tasks: Vec<tokio::task::JoinHandle<()>>,
}

/// The execution engine. Clones share the same state; it must only be
/// used from the single-threaded runtime that owns it.
#[derive(Clone)]
pub struct ExecutionEngine {
    state: Rc<RefCell<EngineState>>,
    events: EventSink,
    handle: EngineHandle,
}

/// Weak back-reference handed to node services; the wrapper never
/// outlives the engine, so upgrades only fail during teardown.
#[derive(Clone)]
pub(crate) struct EngineRef {
    state: std::rc::Weak<RefCell<EngineState>>,
    events: EventSink,
    handle: EngineHandle,
}

impl EngineRef {
    pub(crate) fn upgrade(&self) -> Option<ExecutionEngine> {
        self.state.upgrade().map(|state| ExecutionEngine {
            state,
            events: self.events.clone(),
            handle: self.handle.clone(),
        })
    }
}

impl ExecutionEngine {
    /// Build an engine. Commands posted through the returned handle are
    /// applied by [`ExecutionEngine::run`]; events appear on `events`.
    pub fn new(
        class_map: ClassMap,
        config: EngineConfig,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> (Self, mpsc::UnboundedReceiver<EngineCommand>) {
        let (handle, rx) = EngineHandle::new();
        let state = EngineState {
            class_map,
            store: DataStore::new(&config.execution_folder),
            nodes: HashMap::new(),
            configurations: HashMap::new(),
            links: IndexMap::new(),
            in_links: HashMap::new(),
            out_links: HashMap::new(),
            dirty: IndexSet::new(),
            executing: IndexSet::new(),
            executed: HashSet::new(),
            failed: IndexMap::new(),
            outputs: HashMap::new(),
            injected_inputs: IndexMap::new(),
            output_listeners: HashSet::new(),
            execution_limit: config.execution_limit.max(1),
            paused: true,
            stopping: false,
            pending_clients: HashMap::new(),
            pending_messages: HashMap::new(),
            tasks: Vec::new(),
        };
        let engine = Self {
            state: Rc::new(RefCell::new(state)),
            events: EventSink::new(events),
            handle,
        };
        (engine, rx)
    }

    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    pub(crate) fn downgrade(&self) -> EngineRef {
        EngineRef {
            state: Rc::downgrade(&self.state),
            events: self.events.clone(),
            handle: self.handle.clone(),
        }
    }

    /// Present `value` at `(node_id, port)` in addition to linked values.
    pub fn inject_input(&self, node_id: &str, port: &str, value: Value) {
        self.state
            .borrow_mut()
            .injected_inputs
            .insert((node_id.to_string(), port.to_string()), value);
    }

    /// Emit an [`EngineEvent::OutputNotification`] whenever the port
    /// produces a value.
    pub fn add_output_listener(&self, node_id: &str, port: &str) {
        self.state
            .borrow_mut()
            .output_listeners
            .insert((node_id.to_string(), port.to_string()));
    }

    pub fn count_failed(&self) -> usize {
        self.state.borrow().failed.len()
    }

    /// Cached outputs for a node, present only after a successful run.
    pub fn outputs(&self, node_id: &str) -> Option<IndexMap<String, Value>> {
        self.state.borrow().outputs.get(node_id).cloned()
    }

    /// Apply commands until the channel closes or `Stop` arrives.
    pub async fn run(&self, mut rx: mpsc::UnboundedReceiver<EngineCommand>) {
        while let Some(command) = rx.recv().await {
            let stop = matches!(command, EngineCommand::Stop);
            self.apply(command).await;
            if stop {
                break;
            }
        }
    }

    async fn apply(&self, command: EngineCommand) {
        match command {
            EngineCommand::AddPackage { package_id } => self.add_package(&package_id).await,
            EngineCommand::AddNode { node_id, node_type, loading } => {
                if let Err(e) = self.add_node(&node_id, &node_type, loading).await {
                    tracing::error!(node_id = %node_id, error = %e, "add_node failed");
                }
            }
            EngineCommand::RemoveNode { node_id } => self.remove_node(&node_id).await,
            EngineCommand::AddLink { link, loading } => self.add_link(link, loading).await,
            EngineCommand::RemoveLink { link_id } => self.remove_link(&link_id).await,
            EngineCommand::RequestExecution { node_id } => {
                self.request_execution_now(&node_id);
            }
            EngineCommand::OpenClient { target_type, target_id, client_id, client_options } => {
                self.open_client(target_type, &target_id, client_id, client_options).await;
            }
            EngineCommand::RecvMessage { target_type, target_id, client_id, message } => {
                self.recv_message(target_type, &target_id, client_id, message);
            }
            EngineCommand::CloseClient { target_type, target_id, client_id } => {
                self.close_client(target_type, &target_id, &client_id).await;
            }
            EngineCommand::Pause => {
                self.state.borrow_mut().paused = true;
            }
            EngineCommand::Resume => {
                self.state.borrow_mut().paused = false;
                self.dispatch();
            }
            EngineCommand::Clear => self.clear().await,
            EngineCommand::Stop => {
                self.state.borrow_mut().stopping = true;
            }
        }
    }

    /// Instantiate the package's configuration, if it declares one.
    async fn add_package(&self, package_id: &str) {
        let wrapper = {
            let state = self.state.borrow();
            match state.class_map.configuration_factory(package_id) {
                None => return,
                Some(factory) => {
                    let services = ConfigurationServices::new(
                        package_id,
                        state.store.clone(),
                        self.events.clone(),
                        self.downgrade(),
                    );
                    let instance = factory(services.clone());
                    Rc::new(ConfigurationWrapper::new(
                        package_id,
                        services,
                        instance,
                        self.events.clone(),
                    ))
                }
            }
        };

        wrapper.load().await;
        self.state
            .borrow_mut()
            .configurations
            .insert(package_id.to_string(), Rc::clone(&wrapper));

        self.flush_pending(TargetType::Configuration, package_id).await;
    }

    /// Instantiate a node and mark it dirty; dispatch unless loading.
    async fn add_node(
        &self,
        node_id: &str,
        node_type: &str,
        loading: bool,
    ) -> Result<(), EngineError> {
        let wrapper = {
            let state = self.state.borrow();
            let (package_id, node_type_id) = node_type
                .split_once(':')
                .ok_or_else(|| EngineError::BadDescriptor(node_type.to_string()))?;
            let factory = state
                .class_map
                .node_factory(package_id, node_type_id)
                .ok_or_else(|| EngineError::MissingFactory(node_type.to_string()))?;
            let services = NodeServices::new(
                node_id,
                state.store.clone(),
                self.events.clone(),
                self.downgrade(),
            );
            let instance = factory(services.clone());
            let wrapper =
                Rc::new(NodeWrapper::new(node_id, services, instance, self.events.clone()));
            if let Some(configuration) = state.configurations.get(package_id) {
                wrapper.set_configuration(configuration.handle());
            }
            wrapper
        };

        wrapper.load().await;
        self.state.borrow_mut().nodes.insert(node_id.to_string(), Rc::clone(&wrapper));

        self.flush_pending(TargetType::Node, node_id).await;

        self.mark_dirty(node_id);
        if !loading {
            self.notify_connection_counts(node_id).await;
            self.dispatch();
        }
        Ok(())
    }

    /// Close the wrapper and remove the node from every index and set.
    async fn remove_node(&self, node_id: &str) {
        let wrapper = {
            let mut state = self.state.borrow_mut();
            state.outputs.remove(node_id);
            state.dirty.shift_remove(node_id);
            state.executed.remove(node_id);
            state.failed.shift_remove(node_id);
            state.in_links.remove(node_id);
            state.out_links.remove(node_id);
            state.links.retain(|_, l| l.from_node_id != node_id && l.to_node_id != node_id);
            state.nodes.remove(node_id)
        };
        if let Some(wrapper) = wrapper {
            wrapper.close().await;
        }
        let store = self.state.borrow().store.clone();
        if let Err(e) = store.remove_owner(&lattice_store::Owner::node(node_id)) {
            tracing::warn!(node_id = %node_id, error = %e, "failed to remove node storage");
        }
    }

    /// Index a link and invalidate its destination; dispatch unless loading.
    async fn add_link(&self, link: LinkSpec, loading: bool) {
        {
            let mut state = self.state.borrow_mut();
            state
                .in_links
                .entry(link.to_node_id.clone())
                .or_default()
                .entry(link.to_port.clone())
                .or_default()
                .push(link.clone());
            state
                .out_links
                .entry(link.from_node_id.clone())
                .or_default()
                .entry(link.from_port.clone())
                .or_default()
                .push(link.clone());
            state.links.insert(link.link_id.clone(), link.clone());
        }

        self.notify_connection_counts(&link.to_node_id).await;
        self.notify_connection_counts(&link.from_node_id).await;

        if !loading {
            self.mark_dirty(&link.to_node_id);
            self.dispatch();
        }
    }

    /// Unindex a link and invalidate its destination.
    async fn remove_link(&self, link_id: &str) {
        let link = {
            let mut state = self.state.borrow_mut();
            let Some(link) = state.links.shift_remove(link_id) else {
                return;
            };
            if let Some(ports) = state.in_links.get_mut(&link.to_node_id) {
                if let Some(links) = ports.get_mut(&link.to_port) {
                    links.retain(|l| l.link_id != link_id);
                }
            }
            if let Some(ports) = state.out_links.get_mut(&link.from_node_id) {
                if let Some(links) = ports.get_mut(&link.from_port) {
                    links.retain(|l| l.link_id != link_id);
                }
            }
            link
        };

        self.notify_connection_counts(&link.to_node_id).await;
        self.notify_connection_counts(&link.from_node_id).await;

        self.mark_dirty(&link.to_node_id);
        self.dispatch();
    }

    async fn notify_connection_counts(&self, node_id: &str) {
        let (wrapper, inputs, outputs) = {
            let state = self.state.borrow();
            let Some(wrapper) = state.nodes.get(node_id).cloned() else {
                return;
            };
            let count = |ports: Option<&IndexMap<String, Vec<LinkSpec>>>| {
                ports
                    .map(|p| {
                        p.iter().map(|(port, links)| (port.clone(), links.len())).collect()
                    })
                    .unwrap_or_default()
            };
            (
                wrapper,
                count(state.in_links.get(node_id)),
                count(state.out_links.get(node_id)),
            )
        };
        wrapper.connections_changed(inputs, outputs).await;
    }

    /// Mark dirty and dispatch; the synchronous path used by node
    /// services so the request takes effect before any queued command.
    pub(crate) fn request_execution_now(&self, node_id: &str) {
        self.mark_dirty(node_id);
        self.dispatch();
    }

    /// Move the node and everything downstream of it into the dirty set,
    /// publishing `pending` and resetting each newly dirty node.
    fn mark_dirty(&self, node_id: &str) {
        let newly_dirty: Vec<String> = {
            let mut state = self.state.borrow_mut();
            let mut collected = Vec::new();
            let mut stack = vec![node_id.to_string()];
            while let Some(id) = stack.pop() {
                if state.dirty.contains(&id) || !state.nodes.contains_key(&id) {
                    continue;
                }
                state.dirty.insert(id.clone());
                state.executed.remove(&id);
                state.failed.shift_remove(&id);
                state.outputs.remove(&id);

                // push successors in reverse so the first successor is
                // processed first (depth-first, link order)
                let successors: Vec<String> = state
                    .out_links
                    .get(&id)
                    .map(|ports| {
                        ports
                            .values()
                            .flatten()
                            .map(|l| l.to_node_id.clone())
                            .collect()
                    })
                    .unwrap_or_default();
                for successor in successors.into_iter().rev() {
                    stack.push(successor);
                }
                collected.push(id);
            }
            collected
        };

        for id in newly_dirty {
            self.events.execution_state(&id, ExecutionState::Pending, None, false);
            let wrapper = self.state.borrow().nodes.get(&id).cloned();
            if let Some(wrapper) = wrapper {
                wrapper.reset_run();
            }
        }
    }

    /// Launch runnable dirty nodes up to the execution limit; publish
    /// completion when nothing is executing.
    fn dispatch(&self) {
        let launch: Vec<String> = {
            let mut state = self.state.borrow_mut();
            if state.paused || state.stopping {
                return;
            }

            let free = state.execution_limit.saturating_sub(state.executing.len());
            let mut launch = Vec::new();
            if free > 0 {
                for id in &state.dirty {
                    if Self::can_execute(&state, id) {
                        launch.push(id.clone());
                        if launch.len() >= free {
                            break;
                        }
                    }
                }
            }
            for id in &launch {
                state.dirty.shift_remove(id);
                state.executing.insert(id.clone());
            }

            if state.executing.is_empty() {
                let count_failed = state.failed.len();
                drop(state);
                self.events.emit(EngineEvent::ExecutionComplete { count_failed });
                return;
            }

            state.tasks.retain(|t| !t.is_finished());
            launch
        };

        for node_id in launch {
            let engine = self.clone();
            let task = tokio::task::spawn_local(async move {
                engine.execute_node(node_id).await;
            });
            self.state.borrow_mut().tasks.push(task);
        }
    }

    /// A node can launch once every predecessor has executed; a failed or
    /// pending predecessor blocks it.
    fn can_execute(state: &EngineState, node_id: &str) -> bool {
        if state.executing.contains(node_id) {
            return false;
        }
        match state.in_links.get(node_id) {
            None => true,
            Some(ports) => ports
                .values()
                .flatten()
                .all(|l| state.executed.contains(&l.from_node_id)),
        }
    }

    /// Input values for one node: linked predecessor outputs in link
    /// order, then injected values.
    fn pre_execute(state: &EngineState, node_id: &str) -> PortValues {
        let mut inputs = PortValues::new();
        if let Some(ports) = state.in_links.get(node_id) {
            for (port, links) in ports {
                let values = inputs.entry(port.clone()).or_default();
                for link in links {
                    let value = state
                        .outputs
                        .get(&link.from_node_id)
                        .and_then(|o| o.get(&link.from_port))
                        .cloned()
                        .unwrap_or(Value::Null);
                    values.push(value);
                }
            }
        }
        for ((injected_node, port), value) in &state.injected_inputs {
            if injected_node == node_id {
                inputs.entry(port.clone()).or_default().push(value.clone());
            }
        }
        inputs
    }

    async fn execute_node(&self, node_id: String) {
        let (wrapper, inputs) = {
            let state = self.state.borrow();
            (state.nodes.get(&node_id).cloned(), Self::pre_execute(&state, &node_id))
        };
        let Some(wrapper) = wrapper else {
            self.state.borrow_mut().executing.shift_remove(&node_id);
            self.dispatch();
            return;
        };

        wrapper.reload_properties();
        self.events
            .execution_state(&node_id, ExecutionState::Executing, None, false);

        match wrapper.execute(inputs).await {
            Ok(outputs) => {
                self.events
                    .execution_state(&node_id, ExecutionState::Executed, None, false);
                let listened: Vec<(String, Value)> = {
                    let mut state = self.state.borrow_mut();
                    state.executing.shift_remove(&node_id);
                    state.executed.insert(node_id.clone());
                    state.outputs.insert(node_id.clone(), outputs.clone());
                    outputs
                        .iter()
                        .filter(|(port, _)| {
                            state
                                .output_listeners
                                .contains(&(node_id.clone(), (*port).clone()))
                        })
                        .map(|(port, value)| (port.clone(), value.clone()))
                        .collect()
                };
                for (output_port, value) in listened {
                    self.events.emit(EngineEvent::OutputNotification {
                        node_id: node_id.clone(),
                        output_port,
                        value,
                    });
                }
            }
            Err(e) => {
                let message = e.to_string();
                self.events.execution_state(
                    &node_id,
                    ExecutionState::Failed,
                    Some(message.clone()),
                    false,
                );
                let mut state = self.state.borrow_mut();
                state.executing.shift_remove(&node_id);
                state.failed.insert(node_id.clone(), message);
            }
        }

        self.dispatch();
    }

    async fn open_client(
        &self,
        target_type: TargetType,
        target_id: &str,
        client_id: ClientId,
        client_options: Value,
    ) {
        match self.find_wrapper(target_type, target_id) {
            Wrapper::Node(w) => w.open_client(&client_id, &client_options).await,
            Wrapper::Configuration(w) => w.open_client(&client_id, &client_options).await,
            Wrapper::Absent => {
                self.state
                    .borrow_mut()
                    .pending_clients
                    .entry((target_type, target_id.to_string()))
                    .or_default()
                    .push((client_id, client_options));
            }
        }
    }

    fn recv_message(
        &self,
        target_type: TargetType,
        target_id: &str,
        client_id: ClientId,
        message: Message,
    ) {
        match self.find_wrapper(target_type, target_id) {
            Wrapper::Node(w) => w.recv_message(&client_id, message),
            Wrapper::Configuration(w) => w.recv_message(&client_id, message),
            Wrapper::Absent => {
                self.state
                    .borrow_mut()
                    .pending_messages
                    .entry((target_type, target_id.to_string()))
                    .or_default()
                    .push((client_id, message));
            }
        }
    }

    async fn close_client(&self, target_type: TargetType, target_id: &str, client_id: &ClientId) {
        match self.find_wrapper(target_type, target_id) {
            Wrapper::Node(w) => w.close_client(client_id).await,
            Wrapper::Configuration(w) => w.close_client(client_id).await,
            Wrapper::Absent => {}
        }
        // drop anything still queued for this client
        let mut state = self.state.borrow_mut();
        let key = (target_type, target_id.to_string());
        if let Some(queued) = state.pending_clients.get_mut(&key) {
            queued.retain(|(id, _)| id != client_id);
        }
        if let Some(queued) = state.pending_messages.get_mut(&key) {
            queued.retain(|(id, _)| id != client_id);
        }
    }

    /// Replay queued client opens and messages for a newly registered
    /// target, in arrival order.
    async fn flush_pending(&self, target_type: TargetType, target_id: &str) {
        let key = (target_type, target_id.to_string());
        let (clients, messages) = {
            let mut state = self.state.borrow_mut();
            (
                state.pending_clients.remove(&key).unwrap_or_default(),
                state.pending_messages.remove(&key).unwrap_or_default(),
            )
        };
        for (client_id, client_options) in clients {
            self.open_client(target_type, target_id, client_id, client_options).await;
        }
        for (client_id, message) in messages {
            self.recv_message(target_type, target_id, client_id, message);
        }
    }

    fn find_wrapper(&self, target_type: TargetType, target_id: &str) -> Wrapper {
        let state = self.state.borrow();
        match target_type {
            TargetType::Node => state
                .nodes
                .get(target_id)
                .cloned()
                .map(Wrapper::Node)
                .unwrap_or(Wrapper::Absent),
            TargetType::Configuration => state
                .configurations
                .get(target_id)
                .cloned()
                .map(Wrapper::Configuration)
                .unwrap_or(Wrapper::Absent),
        }
    }

    /// Detach all clients, close and drop all wrappers, and empty every
    /// scheduler set.
    async fn clear(&self) {
        let (nodes, configurations) = {
            let mut state = self.state.borrow_mut();
            state.links.clear();
            state.in_links.clear();
            state.out_links.clear();
            state.dirty.clear();
            state.executed.clear();
            state.failed.clear();
            state.outputs.clear();
            state.pending_clients.clear();
            state.pending_messages.clear();
            (
                std::mem::take(&mut state.nodes),
                std::mem::take(&mut state.configurations),
            )
        };
        for wrapper in nodes.values() {
            wrapper.close().await;
        }
        for wrapper in configurations.values() {
            wrapper.close().await;
        }
    }

    /// Wait for in-flight executions, then close every wrapper.
    pub async fn close(&self) {
        loop {
            let tasks = std::mem::take(&mut self.state.borrow_mut().tasks);
            if tasks.is_empty() {
                break;
            }
            for task in tasks {
                let _ = task.await;
            }
        }
        self.clear().await;
    }
}

enum Wrapper {
    Node(Rc<NodeWrapper>),
    Configuration(Rc<ConfigurationWrapper>),
    Absent,
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
