// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! lattice-store: persistent per-owner state under an execution folder.
//!
//! Each node and package owns a directory (`node/<id>/`, `package/<id>/`)
//! holding a `properties.json` document and suffixed data blobs under
//! `data/`. Writes are atomic (temp sibling + rename).

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod store;

pub use store::{Blob, DataStore, Owner, Properties, StoreError};
