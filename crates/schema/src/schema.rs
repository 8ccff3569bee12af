// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The schema registry: packages keyed by id, node types resolved from
//! `package:type` descriptors.

use indexmap::IndexMap;
use std::path::Path;
use thiserror::Error;

use crate::types::{NodeType, Package};

/// Errors from schema loading and lookup.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("package '{0}' already exists in the schema")]
    DuplicatePackage(String),
    #[error("unknown package '{0}'")]
    UnknownPackage(String),
    #[error("unknown node type '{0}'")]
    UnknownNodeType(String),
    #[error("invalid type descriptor '{0}', expected package:type")]
    BadDescriptor(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("schema parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Registry of loaded packages.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    packages: IndexMap<String, Package>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a package from `<dir>/schema.json` and register it.
    /// Returns the package id.
    pub fn load_package_dir(&mut self, dir: &Path) -> Result<String, SchemaError> {
        let content = std::fs::read_to_string(dir.join("schema.json"))?;
        let mut package = Package::from_json(&content)?;
        package.dir = Some(dir.to_path_buf());
        let id = package.id.clone();
        self.add_package(package)?;
        Ok(id)
    }

    pub fn add_package(&mut self, package: Package) -> Result<(), SchemaError> {
        if self.packages.contains_key(&package.id) {
            return Err(SchemaError::DuplicatePackage(package.id));
        }
        self.packages.insert(package.id.clone(), package);
        Ok(())
    }

    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }

    pub fn package(&self, package_id: &str) -> Option<&Package> {
        self.packages.get(package_id)
    }

    /// Resolve a `package:type` descriptor to its node type.
    pub fn node_type(&self, descriptor: &str) -> Result<&NodeType, SchemaError> {
        let (package_id, node_type_id) = Self::split_descriptor(descriptor)?;
        let package = self
            .packages
            .get(package_id)
            .ok_or_else(|| SchemaError::UnknownPackage(package_id.to_string()))?;
        package
            .node_type(node_type_id)
            .ok_or_else(|| SchemaError::UnknownNodeType(descriptor.to_string()))
    }

    /// Split `package:type` into its components.
    pub fn split_descriptor(descriptor: &str) -> Result<(&str, &str), SchemaError> {
        match descriptor.split_once(':') {
            Some((package_id, node_type_id))
                if !package_id.is_empty()
                    && !node_type_id.is_empty()
                    && !node_type_id.contains(':') =>
            {
                Ok((package_id, node_type_id))
            }
            _ => Err(SchemaError::BadDescriptor(descriptor.to_string())),
        }
    }

    /// Join a package id and node type id into a descriptor.
    pub fn form_descriptor(package_id: &str, node_type_id: &str) -> String {
        format!("{}:{}", package_id, node_type_id)
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
