// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host errors.

use thiserror::Error;

/// Errors from the execution host.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("transport error: {0}")]
    Protocol(#[from] lattice_wire::ProtocolError),
    #[error("graph error: {0}")]
    Graph(#[from] lattice_graph::GraphError),
    #[error("schema error: {0}")]
    Schema(#[from] lattice_schema::SchemaError),
    #[error("store error: {0}")]
    Store(#[from] lattice_store::StoreError),
    #[error("no implementation registered for package '{0}'")]
    UnknownPackage(String),
    #[error("failed to start worker: {0}")]
    WorkerSpawn(String),
}
