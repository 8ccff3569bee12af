// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lattice-core: shared vocabulary for the lattice computation-graph runtime

pub mod client;
pub mod message;
pub mod port;
pub mod state;

pub use client::ClientId;
pub use message::{Message, MessagePart};
pub use port::{PortRef, PortRefError};
pub use state::{ExecutionState, StatusLevel, TargetType};
