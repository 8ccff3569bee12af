// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use serde_json::json;

use lattice_engine::{Node, NodeError, NodeServices, PortOutputs, PortValues};

use crate::numbergraph::configuration::{factorise, NumbergraphConfiguration};

/// Factorises the integer arriving on `data_in`, caching results in the
/// package configuration. Rejects inputs below 2.
pub struct PrimeFactorsNode {
    services: NodeServices,
}

impl PrimeFactorsNode {
    pub fn new(services: NodeServices) -> Self {
        Self { services }
    }
}

#[async_trait(?Send)]
impl Node for PrimeFactorsNode {
    async fn execute(&mut self, inputs: PortValues) -> Result<PortOutputs, NodeError> {
        let Some(value) = inputs.get("data_in").and_then(|values| values.first()) else {
            return Ok(PortOutputs::new());
        };
        let n = value.as_i64().ok_or_else(|| {
            NodeError::new(format!("input value {} is invalid (not an integer)", value))
        })?;
        if n < 2 {
            return Err(NodeError::new(format!("input value {} is invalid (< 2)", n)));
        }

        let factors = match self.services.configuration() {
            Some(configuration) => configuration
                .with(|c: &mut NumbergraphConfiguration| c.find_prime_factors(n))
                .await
                .unwrap_or_else(|| factorise(n)),
            None => factorise(n),
        };
        Ok(PortOutputs::from_iter([("data_out".to_string(), json!(factors))]))
    }
}
