// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;

use lattice_core::{ClientId, MessagePart};
use lattice_engine::{ClientService, Node, NodeError, NodeServices, PortOutputs, PortValues};

/// Collects the values arriving on its input ports, publishes them as a
/// status message and forwards them to every attached client.
pub struct IntegerDisplayNode {
    services: NodeServices,
    clients: HashMap<ClientId, ClientService>,
}

impl IntegerDisplayNode {
    pub fn new(services: NodeServices) -> Self {
        Self { services, clients: HashMap::new() }
    }
}

#[async_trait(?Send)]
impl Node for IntegerDisplayNode {
    fn reset_run(&mut self) {
        for client in self.clients.values() {
            client.send_message(vec![MessagePart::Null]);
        }
    }

    async fn execute(&mut self, inputs: PortValues) -> Result<PortOutputs, NodeError> {
        let mut values: Vec<Value> = Vec::new();
        for port in ["integer_data_in", "integerlist_data_in"] {
            values.extend(inputs.get(port).into_iter().flatten().cloned());
        }
        let collected = json!(values);
        self.services.set_status_info(&collected.to_string());
        for client in self.clients.values() {
            client.send_message(vec![MessagePart::Json(collected.clone())]);
        }
        Ok(PortOutputs::new())
    }

    fn open_client(&mut self, client_id: &ClientId, _options: &Value, client: ClientService) {
        self.clients.insert(client_id.clone(), client);
    }

    fn close_client(&mut self, client_id: &ClientId) {
        self.clients.remove(client_id);
    }
}
