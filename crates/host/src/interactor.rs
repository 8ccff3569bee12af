// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive sessions: pause/resume/run/stop plus client attachment.

use serde_json::Value;

use lattice_core::{ClientId, TargetType};

use crate::client::ClientService;
use crate::error::HostError;
use crate::manager::ExecutionManager;
use crate::topology::Topology;

/// Thin facade over a topology for interactive use.
pub struct TopologyInteractor<'t> {
    topology: &'t Topology,
}

impl<'t> TopologyInteractor<'t> {
    pub(crate) fn new(topology: &'t Topology) -> Self {
        Self { topology }
    }

    /// Attach a client to a node. Any client already attached with the
    /// same id is detached first. The returned service sends and receives
    /// messages for this client.
    pub fn attach_node_client(
        &self,
        node_id: &str,
        client_id: impl Into<ClientId>,
        client_options: Value,
    ) -> ClientService {
        self.topology.manager().attach_client(
            TargetType::Node,
            node_id,
            client_id.into(),
            client_options,
        )
    }

    pub fn detach_node_client(&self, node_id: &str, client_id: impl Into<ClientId>) {
        self.topology
            .manager()
            .detach_client(TargetType::Node, node_id, &client_id.into());
    }

    /// Attach a client to a package configuration.
    pub fn attach_configuration_client(
        &self,
        package_id: &str,
        client_id: impl Into<ClientId>,
        client_options: Value,
    ) -> ClientService {
        self.topology.manager().attach_client(
            TargetType::Configuration,
            package_id,
            client_id.into(),
            client_options,
        )
    }

    pub fn detach_configuration_client(&self, package_id: &str, client_id: impl Into<ClientId>) {
        self.topology
            .manager()
            .detach_client(TargetType::Configuration, package_id, &client_id.into());
    }

    pub fn pause(&self) {
        self.topology.manager().pause();
    }

    pub fn resume(&self) {
        self.topology.manager().resume();
    }

    /// A cloneable, thread-safe handle for controlling the session from
    /// callbacks or other threads.
    pub fn controller(&self) -> SessionController {
        SessionController { manager: self.topology.manager().clone() }
    }

    /// Start the session and block until [`SessionController::stop`] (or
    /// [`TopologyInteractor::stop`] from another thread) ends it.
    /// `complete_callback` fires whenever the executing set empties.
    pub fn run(
        &self,
        complete_callback: Option<Box<dyn Fn() + Send + Sync>>,
    ) -> Result<bool, HostError> {
        let manager = self.topology.manager();
        if let Some(callback) = complete_callback {
            manager.on_execution_complete(callback);
        }
        self.topology.manager().reset_io();
        self.topology.register_output_capture();
        manager.start(|| self.topology.replay_plan())
    }

    pub fn stop(&self) {
        self.topology.manager().stop();
    }
}

/// Cloneable control handle for a running session.
#[derive(Clone)]
pub struct SessionController {
    manager: ExecutionManager,
}

impl SessionController {
    pub fn stop(&self) {
        self.manager.stop();
    }

    pub fn pause(&self) {
        self.manager.pause();
    }

    pub fn resume(&self) {
        self.manager.resume();
    }

    /// Relaunch the worker with the same configuration.
    pub fn restart(&self) {
        self.manager.restart();
    }
}
