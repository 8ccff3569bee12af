// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine-side client service.
//!
//! One `ClientService` sits between a node/configuration instance and one
//! attached external client. Messages received before the instance
//! installs a handler are queued and delivered in order once a handler is
//! set.

use std::cell::RefCell;
use std::rc::Rc;

use lattice_core::Message;

type ForwardFn = Rc<dyn Fn(Message)>;
type HandlerFn = Rc<dyn Fn(Message)>;

#[derive(Default)]
struct ClientServiceState {
    forwarder: Option<ForwardFn>,
    handler: Option<HandlerFn>,
    pending: Vec<Message>,
    open: bool,
}

/// Conversation endpoint handed to node and configuration instances.
///
/// Cheap to clone; clones share the same conversation.
#[derive(Clone, Default)]
pub struct ClientService {
    state: Rc<RefCell<ClientServiceState>>,
}

impl ClientService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the function used to transmit messages to the peer and
    /// start accepting traffic.
    pub fn open(&self, forwarder: impl Fn(Message) + 'static) {
        let mut state = self.state.borrow_mut();
        state.forwarder = Some(Rc::new(forwarder));
        state.open = true;
    }

    /// Send a message to the peer. Dropped silently when not open.
    pub fn send_message(&self, message: Message) -> bool {
        let forwarder = {
            let state = self.state.borrow();
            if !state.open {
                return false;
            }
            state.forwarder.clone()
        };
        match forwarder {
            Some(f) => {
                f(message);
                true
            }
            None => false,
        }
    }

    /// Install the inbound handler, draining any queued messages in order.
    pub fn set_message_handler(&self, handler: impl Fn(Message) + 'static) {
        let (handler, pending) = {
            let mut state = self.state.borrow_mut();
            if !state.open {
                return;
            }
            let handler: HandlerFn = Rc::new(handler);
            state.handler = Some(Rc::clone(&handler));
            (handler, std::mem::take(&mut state.pending))
        };
        for message in pending {
            handler(message);
        }
    }

    /// Deliver an inbound message, queueing it if no handler is set yet.
    pub fn handle_message(&self, message: Message) {
        let handler = {
            let mut state = self.state.borrow_mut();
            if !state.open {
                return;
            }
            match state.handler.clone() {
                Some(h) => Some(h),
                None => {
                    state.pending.push(message);
                    return;
                }
            }
        };
        if let Some(h) = handler {
            h(message);
        }
    }

    /// Release the forwarder and stop accepting traffic.
    pub fn close(&self) {
        let mut state = self.state.borrow_mut();
        state.open = false;
        state.forwarder = None;
        state.handler = None;
        state.pending.clear();
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
