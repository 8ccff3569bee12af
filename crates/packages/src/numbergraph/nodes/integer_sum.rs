// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use serde_json::json;

use lattice_engine::{Node, NodeError, PortOutputs, PortValues};

/// Sums every integer arriving on `data_in`.
pub struct IntegerSumNode;

#[async_trait(?Send)]
impl Node for IntegerSumNode {
    async fn execute(&mut self, inputs: PortValues) -> Result<PortOutputs, NodeError> {
        let mut total: i64 = 0;
        for value in inputs.get("data_in").into_iter().flatten() {
            let n = value.as_i64().ok_or_else(|| {
                NodeError::new(format!("input value {} is not an integer", value))
            })?;
            total += n;
        }
        Ok(PortOutputs::from_iter([("data_out".to_string(), json!(total))]))
    }
}
