// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host-side client endpoints.
//!
//! [`ClientService`] is the handle returned to external code by the
//! attach operations: thread-safe, with the same queueing contract as
//! the engine-side service. [`ExecutionClient`] pairs a service with a
//! target and holds messages sent before the worker connection is up.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

use lattice_core::{ClientId, Message, TargetType};

type ForwardFn = Box<dyn Fn(Message) + Send + Sync>;
type HandlerFn = Arc<dyn Fn(Message) + Send + Sync>;

#[derive(Default)]
struct ClientServiceState {
    forwarder: Option<ForwardFn>,
    handler: Option<HandlerFn>,
    pending: Vec<Message>,
    open: bool,
}

/// External-client conversation endpoint. Clones share the conversation.
#[derive(Clone, Default)]
pub struct ClientService {
    state: Arc<Mutex<ClientServiceState>>,
}

impl ClientService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the function used to transmit messages to the peer and
    /// start accepting traffic.
    pub(crate) fn open(&self, forwarder: impl Fn(Message) + Send + Sync + 'static) {
        let mut state = self.state.lock();
        state.forwarder = Some(Box::new(forwarder));
        state.open = true;
    }

    /// Send a message to the target node or configuration.
    pub fn send_message(&self, message: Message) -> bool {
        let state = self.state.lock();
        if !state.open {
            return false;
        }
        match &state.forwarder {
            Some(f) => {
                f(message);
                true
            }
            None => false,
        }
    }

    /// Install the inbound handler, draining queued messages in order.
    pub fn set_message_handler(&self, handler: impl Fn(Message) + Send + Sync + 'static) {
        let (handler, pending) = {
            let mut state = self.state.lock();
            if !state.open {
                return;
            }
            let handler: HandlerFn = Arc::new(handler);
            state.handler = Some(Arc::clone(&handler));
            (handler, std::mem::take(&mut state.pending))
        };
        for message in pending {
            handler(message);
        }
    }

    /// Deliver an inbound message, queueing it if no handler is set yet.
    pub(crate) fn handle_message(&self, message: Message) {
        let handler = {
            let mut state = self.state.lock();
            if !state.open {
                return;
            }
            match state.handler.clone() {
                Some(h) => h,
                None => {
                    state.pending.push(message);
                    return;
                }
            }
        };
        handler(message);
    }

    pub(crate) fn close(&self) {
        let mut state = self.state.lock();
        state.open = false;
        state.forwarder = None;
        state.handler = None;
        state.pending.clear();
    }
}

/// Where outbound client messages go once the worker is connected.
pub(crate) trait ClientTransport: Send + Sync {
    fn forward_client_message(
        &self,
        target_type: TargetType,
        target_id: &str,
        client_id: &ClientId,
        message: Message,
    );
}

struct ExecutionClientState {
    connected: bool,
    pending: Vec<Message>,
}

/// Host-side record of one attached client.
pub(crate) struct ExecutionClient {
    pub(crate) target_type: TargetType,
    pub(crate) target_id: String,
    pub(crate) client_id: ClientId,
    pub(crate) client_options: serde_json::Value,
    pub(crate) service: ClientService,
    transport: Weak<dyn ClientTransport>,
    state: Mutex<ExecutionClientState>,
}

impl ExecutionClient {
    /// Create the client and wire its service's outbound side to it.
    pub(crate) fn new(
        target_type: TargetType,
        target_id: &str,
        client_id: ClientId,
        client_options: serde_json::Value,
        transport: Weak<dyn ClientTransport>,
    ) -> Arc<Self> {
        let client = Arc::new(Self {
            target_type,
            target_id: target_id.to_string(),
            client_id,
            client_options,
            service: ClientService::new(),
            transport,
            state: Mutex::new(ExecutionClientState { connected: false, pending: Vec::new() }),
        });
        let weak = Arc::downgrade(&client);
        client.service.open(move |message| {
            if let Some(client) = weak.upgrade() {
                client.send_message(message);
            }
        });
        client
    }

    /// Send towards the target, queueing until connected.
    fn send_message(&self, message: Message) {
        {
            let mut state = self.state.lock();
            if !state.connected {
                state.pending.push(message);
                return;
            }
        }
        self.forward(message);
    }

    fn forward(&self, message: Message) {
        if let Some(transport) = self.transport.upgrade() {
            transport.forward_client_message(
                self.target_type,
                &self.target_id,
                &self.client_id,
                message,
            );
        }
    }

    /// Mark connected and flush queued messages in order.
    pub(crate) fn set_connected(&self) {
        let pending = {
            let mut state = self.state.lock();
            state.connected = true;
            std::mem::take(&mut state.pending)
        };
        for message in pending {
            self.forward(message);
        }
    }

    pub(crate) fn set_disconnected(&self) {
        self.state.lock().connected = false;
    }

    /// Deliver a message from the target to the external client.
    pub(crate) fn message_callback(&self, message: Message) {
        self.service.handle_message(message);
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
