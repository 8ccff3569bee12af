// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use serde_json::json;

use lattice_engine::{Node, NodeError, PortOutputs, PortValues};

/// Doubles the integer arriving on `data_in`.
pub struct DoublerNode;

#[async_trait(?Send)]
impl Node for DoublerNode {
    async fn execute(&mut self, inputs: PortValues) -> Result<PortOutputs, NodeError> {
        let Some(value) = inputs.get("data_in").and_then(|values| values.first()) else {
            return Ok(PortOutputs::new());
        };
        let n = value
            .as_i64()
            .ok_or_else(|| NodeError::new(format!("input value {} is not an integer", value)))?;
        Ok(PortOutputs::from_iter([("data_out".to_string(), json!(n * 2))]))
    }
}
