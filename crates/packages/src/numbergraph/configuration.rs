// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared configuration for the numbergraph package: a persistent cache
//! of prime factorisations.

use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;

use lattice_engine::{Configuration, ConfigurationServices, NodeError};
use lattice_store::Blob;

const CACHE_KEY: &str = "prime_factors";

pub struct NumbergraphConfiguration {
    services: ConfigurationServices,
    cache: HashMap<i64, Vec<i64>>,
}

impl NumbergraphConfiguration {
    pub fn new(services: ConfigurationServices) -> Self {
        Self { services, cache: HashMap::new() }
    }

    pub fn get_prime_factors(&self, n: i64) -> Option<Vec<i64>> {
        self.cache.get(&n).cloned()
    }

    pub fn set_prime_factors(&mut self, n: i64, factors: Vec<i64>) {
        self.cache.insert(n, factors);
    }

    /// Factorise `n`, consulting and updating the cache.
    pub fn find_prime_factors(&mut self, n: i64) -> Vec<i64> {
        if let Some(factors) = self.get_prime_factors(n) {
            return factors;
        }
        let factors = factorise(n);
        self.set_prime_factors(n, factors.clone());
        factors
    }
}

#[async_trait(?Send)]
impl Configuration for NumbergraphConfiguration {
    async fn load(&mut self) -> Result<(), NodeError> {
        if let Some(Blob::Text(text)) = self.services.get_data(CACHE_KEY)? {
            let stored: HashMap<String, Vec<i64>> = serde_json::from_str(&text)?;
            self.cache = stored
                .into_iter()
                .filter_map(|(n, factors)| n.parse().ok().map(|n| (n, factors)))
                .collect();
        }
        self.services
            .set_status_info(&format!("loaded cache ({} items)", self.cache.len()));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), NodeError> {
        let stored: HashMap<String, &Vec<i64>> =
            self.cache.iter().map(|(n, factors)| (n.to_string(), factors)).collect();
        self.services
            .set_data(CACHE_KEY, Some(Blob::Text(serde_json::to_string(&stored)?)))?;
        self.services
            .set_status_info(&format!("saved cache ({} items)", self.cache.len()));
        Ok(())
    }

    fn as_any(&mut self) -> &mut dyn Any {
        self
    }
}

fn is_prime(n: i64) -> bool {
    let root = (n as f64).sqrt() as i64;
    for i in 2..=root {
        if n % i == 0 {
            return false;
        }
    }
    true
}

/// Prime factorisation of `n`, smallest factor first. Expects `n >= 2`.
pub(crate) fn factorise(n: i64) -> Vec<i64> {
    let mut factors = Vec::new();
    let mut remainder = n;
    let mut i = 2;
    loop {
        if remainder % i == 0 {
            factors.push(i);
            remainder /= i;
            if remainder == 1 || is_prime(remainder) {
                break;
            }
        } else {
            i += 1;
        }
    }
    if remainder > 1 {
        factors.push(remainder);
    }
    factors
}
