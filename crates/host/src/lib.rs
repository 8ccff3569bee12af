// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! lattice-host: the execution host.
//!
//! Runs the engine either on a thread inside this process or in a child
//! worker process, speaking the framed wire protocol over loopback TCP in
//! both cases. Exposes the `Topology` facade binding a graph model, a
//! schema, an execution folder and the execution manager, plus the
//! interactive-session surface.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod error;
mod interactor;
mod manager;
mod runner;
mod topology;
mod worker;

pub use client::ClientService;
pub use error::HostError;
pub use interactor::{SessionController, TopologyInteractor};
pub use manager::{ExecutionManager, LinkReplay, ManagerOptions, RegisterFn, ReplayPlan};
pub use topology::{Topology, TopologyOptions};
pub use worker::{run_worker, run_worker_blocking};
