// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graph model errors.

use thiserror::Error;

/// Errors raised by the graph API before any mutation takes place.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("invalid node: {0}")]
    InvalidNode(String),
    #[error("invalid link: {0}")]
    InvalidLink(String),
    #[error("unsupported format '{0}', expecting .zip, .yaml or .yml")]
    UnsupportedFormat(String),
    #[error("schema error: {0}")]
    Schema(#[from] lattice_schema::SchemaError),
    #[error("store error: {0}")]
    Store(#[from] lattice_store::StoreError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("topology parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}
