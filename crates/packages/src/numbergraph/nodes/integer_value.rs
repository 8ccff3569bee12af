// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use serde_json::{json, Value};

use lattice_core::{ClientId, Message, MessagePart};
use lattice_engine::{ClientService, Node, NodeError, NodeServices, PortOutputs, PortValues};

/// Emits its `value` property on `data_out`. Attached clients may send a
/// JSON integer to change the value and trigger a re-run.
pub struct IntegerValueNode {
    services: NodeServices,
}

impl IntegerValueNode {
    pub fn new(services: NodeServices) -> Self {
        Self { services }
    }
}

#[async_trait(?Send)]
impl Node for IntegerValueNode {
    async fn execute(&mut self, _inputs: PortValues) -> Result<PortOutputs, NodeError> {
        let value = self.services.get_property("value", json!(10));
        Ok(PortOutputs::from_iter([("data_out".to_string(), value)]))
    }

    fn open_client(&mut self, _client_id: &ClientId, _options: &Value, client: ClientService) {
        let services = self.services.clone();
        client.set_message_handler(move |message: Message| {
            match message.first() {
                Some(MessagePart::Json(value)) if value.is_i64() => {
                    services.set_property("value", Some(value.clone()));
                    services.request_run();
                }
                _ => {
                    services.set_status_warning("new value passed by client is not an integer");
                }
            }
        });
    }
}
