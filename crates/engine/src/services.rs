// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service handles given to user instances.
//!
//! Handles are cheap clones over shared state, so instances may capture
//! them in client message handlers. Property reads go through an
//! in-memory cache that the engine reloads at the start of every
//! execution.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use serde_json::Value;

use lattice_core::{StatusLevel, TargetType};
use lattice_store::{Blob, DataStore, Owner, Properties, StoreError};

use crate::api::Configuration;
use crate::engine::EngineRef;
use crate::event::EventSink;

/// Shared access to a package's configuration instance.
#[derive(Clone)]
pub struct ConfigurationHandle {
    pub(crate) instance: Rc<tokio::sync::Mutex<Box<dyn Configuration>>>,
}

impl ConfigurationHandle {
    /// Run `f` against the concrete configuration type, or `None` if the
    /// instance is of a different type.
    pub async fn with<C, R>(&self, f: impl FnOnce(&mut C) -> R) -> Option<R>
    where
        C: Configuration,
    {
        let mut guard = self.instance.lock().await;
        guard.as_any().downcast_mut::<C>().map(f)
    }
}

struct ServicesState {
    owner: Owner,
    origin_type: TargetType,
    store: DataStore,
    properties: RefCell<Properties>,
    events: EventSink,
    engine: EngineRef,
    configuration: RefCell<Option<ConfigurationHandle>>,
}

impl ServicesState {
    fn origin_id(&self) -> &str {
        match &self.owner {
            Owner::Node(id) | Owner::Package(id) => id,
        }
    }

    fn set_status(&self, status: StatusLevel, message: &str) {
        self.events.status(self.origin_id(), self.origin_type, status, message);
    }
}

macro_rules! shared_service_methods {
    () => {
        /// The id of the owning node or package.
        pub fn id(&self) -> &str {
            self.state.origin_id()
        }

        /// Read a property from the in-memory cache.
        pub fn get_property(&self, name: &str, default: Value) -> Value {
            self.state.properties.borrow().get(name).cloned().unwrap_or(default)
        }

        /// Write a property: updates the cache and persists immediately.
        /// `None` removes the key.
        pub fn set_property(&self, name: &str, value: Option<Value>) {
            {
                let mut properties = self.state.properties.borrow_mut();
                match &value {
                    Some(v) => {
                        properties.insert(name.to_string(), v.clone());
                    }
                    None => {
                        properties.remove(name);
                    }
                }
            }
            if let Err(e) = self.state.store.set_property(&self.state.owner, name, value) {
                tracing::warn!(owner = %self.state.owner, name, error = %e, "property write failed");
            }
        }

        /// Read a data blob.
        pub fn get_data(&self, key: &str) -> Result<Option<Blob>, StoreError> {
            self.state.store.data(&self.state.owner, key)
        }

        /// Write a data blob; `None` removes it.
        pub fn set_data(&self, key: &str, data: Option<Blob>) -> Result<(), StoreError> {
            self.state.store.set_data(&self.state.owner, key, data)
        }

        /// Directory for opaque files owned by this instance.
        pub fn files_dir(&self) -> PathBuf {
            self.state.store.files_dir(&self.state.owner)
        }

        pub fn set_status_info(&self, message: &str) {
            self.state.set_status(StatusLevel::Info, message);
        }

        pub fn set_status_warning(&self, message: &str) {
            self.state.set_status(StatusLevel::Warning, message);
        }

        pub fn set_status_error(&self, message: &str) {
            self.state.set_status(StatusLevel::Error, message);
        }

        pub fn clear_status(&self) {
            self.state.set_status(StatusLevel::Clear, "");
        }
    };
}

/// Services available to a node instance.
#[derive(Clone)]
pub struct NodeServices {
    state: Rc<ServicesState>,
}

impl NodeServices {
    pub(crate) fn new(
        node_id: &str,
        store: DataStore,
        events: EventSink,
        engine: EngineRef,
    ) -> Self {
        let owner = Owner::node(node_id);
        let properties = store.properties(&owner).unwrap_or_default();
        Self {
            state: Rc::new(ServicesState {
                owner,
                origin_type: TargetType::Node,
                store,
                properties: RefCell::new(properties),
                events,
                engine,
                configuration: RefCell::new(None),
            }),
        }
    }

    shared_service_methods!();

    /// Ask the scheduler to re-run this node. Takes effect immediately:
    /// the node is marked dirty before any queued command is applied.
    pub fn request_run(&self) {
        if let Some(engine) = self.state.engine.upgrade() {
            engine.request_execution_now(self.id());
        }
    }

    /// Publish a manually attested execution state. Advisory only: it
    /// does not alter the scheduler's sets.
    pub fn set_execution_state(&self, state: lattice_core::ExecutionState) {
        self.state.events.execution_state(self.id(), state, None, true);
    }

    /// The package's shared configuration, if the package declares one.
    pub fn configuration(&self) -> Option<ConfigurationHandle> {
        self.state.configuration.borrow().clone()
    }

    pub(crate) fn set_configuration(&self, handle: ConfigurationHandle) {
        *self.state.configuration.borrow_mut() = Some(handle);
    }

    pub(crate) fn reload_properties(&self) {
        let properties = self.state.store.properties(&self.state.owner).unwrap_or_default();
        *self.state.properties.borrow_mut() = properties;
    }
}

/// Services available to a configuration instance.
#[derive(Clone)]
pub struct ConfigurationServices {
    state: Rc<ServicesState>,
}

impl ConfigurationServices {
    pub(crate) fn new(
        package_id: &str,
        store: DataStore,
        events: EventSink,
        engine: EngineRef,
    ) -> Self {
        let owner = Owner::package(package_id);
        let properties = store.properties(&owner).unwrap_or_default();
        Self {
            state: Rc::new(ServicesState {
                owner,
                origin_type: TargetType::Configuration,
                store,
                properties: RefCell::new(properties),
                events,
                engine,
                configuration: RefCell::new(None),
            }),
        }
    }

    shared_service_methods!();
}
