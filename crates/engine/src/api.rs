// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The user-facing node and configuration traits.
//!
//! Implementations plug into the engine via a [`crate::ClassMap`]. Every
//! hook other than [`Node::execute`] has a no-op default, so
//! implementations only write the hooks they care about. Hook futures are
//! `?Send`: they run on the engine's single-threaded runtime.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use std::any::Any;
use thiserror::Error;

use lattice_core::ClientId;

use crate::client::ClientService;

/// Input values presented at each input port, in link order followed by
/// injected values.
pub type PortValues = IndexMap<String, Vec<Value>>;

/// Output values produced at each output port.
pub type PortOutputs = IndexMap<String, Value>;

/// An error raised by user code during a hook.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct NodeError(String);

impl NodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<String> for NodeError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for NodeError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<lattice_store::StoreError> for NodeError {
    fn from(e: lattice_store::StoreError) -> Self {
        Self(e.to_string())
    }
}

impl From<serde_json::Error> for NodeError {
    fn from(e: serde_json::Error) -> Self {
        Self(e.to_string())
    }
}

/// A unit of computation instantiated for one graph node.
#[async_trait(?Send)]
pub trait Node: 'static {
    /// Load any resources associated with this node.
    async fn load(&mut self) -> Result<(), NodeError> {
        Ok(())
    }

    /// Called when the node is about to be re-run.
    fn reset_run(&mut self) {}

    /// Called when the number of connections at any port changes.
    fn connections_changed(
        &mut self,
        input_counts: &IndexMap<String, usize>,
        output_counts: &IndexMap<String, usize>,
    ) {
        let _ = (input_counts, output_counts);
    }

    /// Transform input values into output values.
    ///
    /// Errors mark the node failed and block its dependents; they do not
    /// abort the scheduler.
    async fn execute(&mut self, inputs: PortValues) -> Result<PortOutputs, NodeError>;

    /// Called when a client attaches. The node may keep the service to
    /// send messages later and install a handler for inbound messages.
    fn open_client(&mut self, client_id: &ClientId, client_options: &Value, client: ClientService) {
        let _ = (client_id, client_options, client);
    }

    /// Called when a client detaches; always preceded by `open_client`
    /// with the same id.
    fn close_client(&mut self, client_id: &ClientId) {
        let _ = client_id;
    }

    /// Called before the instance is dropped.
    async fn close(&mut self) -> Result<(), NodeError> {
        Ok(())
    }
}

/// A long-lived per-package instance shared by all nodes of the package.
#[async_trait(?Send)]
pub trait Configuration: 'static {
    async fn load(&mut self) -> Result<(), NodeError> {
        Ok(())
    }

    fn open_client(&mut self, client_id: &ClientId, client_options: &Value, client: ClientService) {
        let _ = (client_id, client_options, client);
    }

    fn close_client(&mut self, client_id: &ClientId) {
        let _ = client_id;
    }

    async fn close(&mut self) -> Result<(), NodeError> {
        Ok(())
    }

    /// Downcast support so nodes can reach their package's concrete
    /// configuration through [`crate::ConfigurationHandle::with`].
    fn as_any(&mut self) -> &mut dyn Any;
}
