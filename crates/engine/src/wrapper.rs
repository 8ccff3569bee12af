// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wrappers mediating between user instances and the engine.
//!
//! A wrapper owns exactly one user instance behind an async mutex: hooks
//! may arrive while an `execute` future is suspended, and the mutex
//! serialises them in FIFO order. Errors from hooks other than `execute`
//! are logged and swallowed; `execute` errors propagate to the scheduler.

use indexmap::IndexMap;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use lattice_core::{ClientId, Message, TargetType};

use crate::api::{Configuration, Node, NodeError, PortOutputs, PortValues};
use crate::client::ClientService;
use crate::event::EventSink;
use crate::services::{ConfigurationHandle, ConfigurationServices, NodeServices};

/// Engine-side holder of one node instance.
pub(crate) struct NodeWrapper {
    node_id: String,
    services: NodeServices,
    instance: Rc<tokio::sync::Mutex<Box<dyn Node>>>,
    clients: RefCell<HashMap<ClientId, ClientService>>,
    events: EventSink,
}

impl NodeWrapper {
    pub(crate) fn new(
        node_id: &str,
        services: NodeServices,
        instance: Box<dyn Node>,
        events: EventSink,
    ) -> Self {
        Self {
            node_id: node_id.to_string(),
            services,
            instance: Rc::new(tokio::sync::Mutex::new(instance)),
            clients: RefCell::new(HashMap::new()),
            events,
        }
    }

    pub(crate) fn node_id(&self) -> &str {
        &self.node_id
    }

    pub(crate) fn set_configuration(&self, handle: ConfigurationHandle) {
        self.services.set_configuration(handle);
    }

    pub(crate) async fn load(&self) {
        if let Err(e) = self.instance.lock().await.load().await {
            tracing::warn!(node_id = %self.node_id, error = %e, "error in load hook");
        }
    }

    pub(crate) fn reload_properties(&self) {
        self.services.reload_properties();
    }

    /// Invoke `reset_run` immediately. A node that is mid-execution holds
    /// its own instance lock; the hook is skipped for it.
    pub(crate) fn reset_run(&self) {
        match self.instance.try_lock() {
            Ok(mut instance) => instance.reset_run(),
            Err(_) => {
                tracing::debug!(node_id = %self.node_id, "reset_run skipped, node is executing");
            }
        }
    }

    pub(crate) async fn connections_changed(
        &self,
        input_counts: IndexMap<String, usize>,
        output_counts: IndexMap<String, usize>,
    ) {
        self.instance.lock().await.connections_changed(&input_counts, &output_counts);
    }

    pub(crate) async fn execute(&self, inputs: PortValues) -> Result<PortOutputs, NodeError> {
        self.instance.lock().await.execute(inputs).await
    }

    pub(crate) async fn open_client(&self, client_id: &ClientId, client_options: &Value) {
        let service = ClientService::new();
        let events = self.events.clone();
        let origin_id = self.node_id.clone();
        let forward_client_id = client_id.clone();
        service.open(move |message: Message| {
            events.client_message(&origin_id, TargetType::Node, &forward_client_id, message);
        });
        self.clients.borrow_mut().insert(client_id.clone(), service.clone());
        self.instance.lock().await.open_client(client_id, client_options, service);
    }

    pub(crate) fn recv_message(&self, client_id: &ClientId, message: Message) {
        let service = self.clients.borrow().get(client_id).cloned();
        if let Some(service) = service {
            service.handle_message(message);
        }
    }

    pub(crate) async fn close_client(&self, client_id: &ClientId) {
        let service = self.clients.borrow_mut().remove(client_id);
        if let Some(service) = service {
            service.close();
            self.instance.lock().await.close_client(client_id);
        }
    }

    pub(crate) async fn close(&self) {
        let clients = std::mem::take(&mut *self.clients.borrow_mut());
        for (client_id, service) in clients {
            service.close();
            self.instance.lock().await.close_client(&client_id);
        }
        if let Err(e) = self.instance.lock().await.close().await {
            tracing::warn!(node_id = %self.node_id, error = %e, "error in close hook");
        }
    }
}

/// Engine-side holder of one package configuration instance.
pub(crate) struct ConfigurationWrapper {
    package_id: String,
    #[allow(dead_code)] // keeps the shared property cache alive
    services: ConfigurationServices,
    instance: Rc<tokio::sync::Mutex<Box<dyn Configuration>>>,
    clients: RefCell<HashMap<ClientId, ClientService>>,
    events: EventSink,
}

impl ConfigurationWrapper {
    pub(crate) fn new(
        package_id: &str,
        services: ConfigurationServices,
        instance: Box<dyn Configuration>,
        events: EventSink,
    ) -> Self {
        Self {
            package_id: package_id.to_string(),
            services,
            instance: Rc::new(tokio::sync::Mutex::new(instance)),
            clients: RefCell::new(HashMap::new()),
            events,
        }
    }

    /// Shared handle for nodes of this package.
    pub(crate) fn handle(&self) -> ConfigurationHandle {
        ConfigurationHandle { instance: Rc::clone(&self.instance) }
    }

    pub(crate) async fn load(&self) {
        if let Err(e) = self.instance.lock().await.load().await {
            tracing::warn!(package_id = %self.package_id, error = %e, "error in load hook");
        }
    }

    pub(crate) async fn open_client(&self, client_id: &ClientId, client_options: &Value) {
        let service = ClientService::new();
        let events = self.events.clone();
        let origin_id = self.package_id.clone();
        let forward_client_id = client_id.clone();
        service.open(move |message: Message| {
            events.client_message(
                &origin_id,
                TargetType::Configuration,
                &forward_client_id,
                message,
            );
        });
        self.clients.borrow_mut().insert(client_id.clone(), service.clone());
        self.instance.lock().await.open_client(client_id, client_options, service);
    }

    pub(crate) fn recv_message(&self, client_id: &ClientId, message: Message) {
        let service = self.clients.borrow().get(client_id).cloned();
        if let Some(service) = service {
            service.handle_message(message);
        }
    }

    pub(crate) async fn close_client(&self, client_id: &ClientId) {
        let service = self.clients.borrow_mut().remove(client_id);
        if let Some(service) = service {
            service.close();
            self.instance.lock().await.close_client(client_id);
        }
    }

    pub(crate) async fn close(&self) {
        let clients = std::mem::take(&mut *self.clients.borrow_mut());
        for (client_id, service) in clients {
            service.close();
            self.instance.lock().await.close_client(&client_id);
        }
        if let Err(e) = self.instance.lock().await.close().await {
            tracing::warn!(package_id = %self.package_id, error = %e, "error in close hook");
        }
    }
}
