// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The execution manager.
//!
//! Listens on an ephemeral loopback port, starts a runner (thread or
//! child process), replays the topology into the worker with
//! `loading=true`, then pumps worker events to the host callbacks until
//! the connection closes. The thread calling [`ExecutionManager::run`]
//! is the notification pump: every callback fires on it.

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use lattice_core::{ClientId, ExecutionState, Message, StatusLevel, TargetType};
use lattice_engine::ClassMap;
use lattice_wire::{read_packet, write_packet, Event, InjectedInput, Request};

use crate::client::{ClientService, ClientTransport, ExecutionClient};
use crate::error::HostError;
use crate::runner::{default_worker_command, Runner};

/// Installs node/configuration factories into a worker's class map.
pub type RegisterFn = Arc<dyn Fn(&mut ClassMap) + Send + Sync>;

type StatusCallback = Box<dyn Fn(&str, TargetType, StatusLevel, &str) + Send + Sync>;
type ExecutionCallback =
    Box<dyn Fn(f64, &str, ExecutionState, Option<&str>, bool) + Send + Sync>;
type CompleteCallback = Box<dyn Fn() + Send + Sync>;
type OutputCallback = Box<dyn Fn(Value) + Send + Sync>;

/// Fixed configuration for one manager.
#[derive(Clone)]
pub struct ManagerOptions {
    pub execution_folder: PathBuf,
    /// Package directories named in the `init` packet.
    pub packages: Vec<PathBuf>,
    /// Run the worker on a thread in this process instead of a child
    /// process.
    pub in_process: bool,
    /// Worker binary for out-of-process mode; defaults to a sibling of
    /// the current executable.
    pub worker_command: Option<PathBuf>,
}

/// What to replay into a fresh worker, in dependency order.
#[derive(Debug, Default, Clone)]
pub struct ReplayPlan {
    pub packages: Vec<String>,
    /// `(node_id, node_type)` in traversal order.
    pub nodes: Vec<(String, String)>,
    pub links: Vec<LinkReplay>,
}

#[derive(Debug, Clone)]
pub struct LinkReplay {
    pub link_id: String,
    pub from_node_id: String,
    pub from_port: String,
    pub to_node_id: String,
    pub to_port: String,
    pub link_type: String,
}

type ClientKey = (TargetType, String, ClientId);

struct ManagerInner {
    options: ManagerOptions,
    register: RegisterFn,
    paused: AtomicBool,
    restarting: AtomicBool,
    running: AtomicBool,
    completed: AtomicBool,
    count_failed: AtomicUsize,
    out: Mutex<Option<mpsc::UnboundedSender<(Request, Message)>>>,
    clients: Mutex<IndexMap<ClientKey, Arc<ExecutionClient>>>,
    injected: Mutex<IndexMap<(String, String), Value>>,
    listeners: Mutex<IndexMap<(String, String), Vec<OutputCallback>>>,
    status_cb: Mutex<Option<StatusCallback>>,
    execution_cb: Mutex<Option<ExecutionCallback>>,
    complete_cb: Mutex<Option<CompleteCallback>>,
}

impl ManagerInner {
    fn send(&self, request: Request, parts: Message) {
        if let Some(tx) = &*self.out.lock() {
            let _ = tx.send((request, parts));
        }
    }
}

impl ClientTransport for ManagerInner {
    fn forward_client_message(
        &self,
        target_type: TargetType,
        target_id: &str,
        client_id: &ClientId,
        message: Message,
    ) {
        self.send(
            Request::ClientMessage {
                target_id: target_id.to_string(),
                target_type,
                client_id: client_id.clone(),
            },
            message,
        );
    }
}

/// Host side of the host↔worker channel. Cloneable; clones share state.
#[derive(Clone)]
pub struct ExecutionManager {
    inner: Arc<ManagerInner>,
}

impl ExecutionManager {
    pub fn new(options: ManagerOptions, register: RegisterFn) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                options,
                register,
                paused: AtomicBool::new(false),
                restarting: AtomicBool::new(false),
                running: AtomicBool::new(false),
                completed: AtomicBool::new(false),
                count_failed: AtomicUsize::new(0),
                out: Mutex::new(None),
                clients: Mutex::new(IndexMap::new()),
                injected: Mutex::new(IndexMap::new()),
                listeners: Mutex::new(IndexMap::new()),
                status_cb: Mutex::new(None),
                execution_cb: Mutex::new(None),
                complete_cb: Mutex::new(None),
            }),
        }
    }

    // === callbacks ===

    pub fn on_status(
        &self,
        callback: impl Fn(&str, TargetType, StatusLevel, &str) + Send + Sync + 'static,
    ) {
        *self.inner.status_cb.lock() = Some(Box::new(callback));
    }

    pub fn on_execution_state(
        &self,
        callback: impl Fn(f64, &str, ExecutionState, Option<&str>, bool) + Send + Sync + 'static,
    ) {
        *self.inner.execution_cb.lock() = Some(Box::new(callback));
    }

    /// Invoked whenever the worker reports that the executing set emptied.
    pub fn on_execution_complete(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self.inner.complete_cb.lock() = Some(Box::new(callback));
    }

    // === pre-run inputs and listeners ===

    pub fn inject_input(&self, node_id: &str, port: &str, value: Value) {
        self.inner
            .injected
            .lock()
            .insert((node_id.to_string(), port.to_string()), value);
    }

    pub fn add_output_listener(
        &self,
        node_id: &str,
        port: &str,
        listener: impl Fn(Value) + Send + Sync + 'static,
    ) {
        self.inner
            .listeners
            .lock()
            .entry((node_id.to_string(), port.to_string()))
            .or_default()
            .push(Box::new(listener));
    }

    /// Drop injected inputs and output listeners (clients are kept).
    pub fn reset_io(&self) {
        self.inner.injected.lock().clear();
        self.inner.listeners.lock().clear();
    }

    // === control ===

    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::SeqCst)
    }

    pub fn pause(&self) {
        self.inner.paused.store(true, Ordering::SeqCst);
        self.inner.send(Request::Pause, Vec::new());
    }

    pub fn resume(&self) {
        self.inner.paused.store(false, Ordering::SeqCst);
        self.inner.send(Request::Resume, Vec::new());
    }

    /// Ask the worker to drain and exit; `run` returns once it does.
    pub fn stop(&self) {
        self.inner.send(Request::CloseWorker, Vec::new());
    }

    /// Tear the worker down and have the outer `start` loop relaunch it.
    pub fn restart(&self) {
        self.inner.restarting.store(true, Ordering::SeqCst);
        self.inner.send(Request::CloseWorker, Vec::new());
    }

    pub fn count_failed(&self) -> usize {
        self.inner.count_failed.load(Ordering::SeqCst)
    }

    // === live graph updates ===

    pub(crate) fn notify_add_node(&self, node_id: &str, node_type: &str) {
        self.inner.send(
            Request::AddNode {
                node_id: node_id.to_string(),
                node_type: node_type.to_string(),
                loading: false,
            },
            Vec::new(),
        );
    }

    pub(crate) fn notify_remove_node(&self, node_id: &str) {
        self.inner
            .send(Request::RemoveNode { node_id: node_id.to_string() }, Vec::new());
    }

    pub(crate) fn notify_add_link(&self, link: &LinkReplay, loading: bool) {
        self.inner.send(
            Request::AddLink {
                link_id: link.link_id.clone(),
                from_node_id: link.from_node_id.clone(),
                from_port: link.from_port.clone(),
                to_node_id: link.to_node_id.clone(),
                to_port: link.to_port.clone(),
                link_type: link.link_type.clone(),
                loading,
            },
            Vec::new(),
        );
    }

    pub(crate) fn notify_remove_link(&self, link_id: &str) {
        self.inner
            .send(Request::RemoveLink { link_id: link_id.to_string() }, Vec::new());
    }

    pub(crate) fn notify_clear(&self) {
        self.inner.send(Request::Clear, Vec::new());
    }

    pub(crate) fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    // === clients ===

    /// Attach a client, detaching any live client with the same id first.
    pub fn attach_client(
        &self,
        target_type: TargetType,
        target_id: &str,
        client_id: ClientId,
        client_options: Value,
    ) -> ClientService {
        self.detach_client(target_type, target_id, &client_id);

        let transport: Arc<dyn ClientTransport> = self.inner.clone();
        let client = ExecutionClient::new(
            target_type,
            target_id,
            client_id.clone(),
            client_options,
            Arc::downgrade(&transport),
        );
        let service = client.service.clone();
        self.inner
            .clients
            .lock()
            .insert((target_type, target_id.to_string(), client_id), Arc::clone(&client));
        if self.is_running() {
            self.connect_client(&client);
        }
        service
    }

    /// Detach a client, leaving no residual state for its id.
    pub fn detach_client(&self, target_type: TargetType, target_id: &str, client_id: &ClientId) {
        let removed = self
            .inner
            .clients
            .lock()
            .shift_remove(&(target_type, target_id.to_string(), client_id.clone()));
        if let Some(client) = removed {
            client.set_disconnected();
            client.service.close();
            self.inner.send(
                Request::CloseClient {
                    target_id: target_id.to_string(),
                    target_type,
                    client_id: client_id.clone(),
                },
                Vec::new(),
            );
        }
    }

    fn connect_client(&self, client: &ExecutionClient) {
        self.inner.send(
            Request::OpenClient {
                target_id: client.target_id.clone(),
                target_type: client.target_type,
                client_id: client.client_id.clone(),
                client_options: client.client_options.clone(),
            },
            Vec::new(),
        );
        client.set_connected();
    }

    // === the run loop ===

    /// Run one worker session, blocking until the worker exits. Returns
    /// `Ok(true)` iff no node was failed when the run completed.
    pub fn run(&self, plan: &ReplayPlan, terminate_on_complete: bool) -> Result<bool, HostError> {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        rt.block_on(self.serve(plan, terminate_on_complete))
    }

    /// Run worker sessions until stopped; a `restart` request starts a
    /// fresh session with a fresh plan.
    pub fn start(&self, plan_fn: impl Fn() -> ReplayPlan) -> Result<bool, HostError> {
        loop {
            let plan = plan_fn();
            let ok = self.run(&plan, false)?;
            if !self.inner.restarting.swap(false, Ordering::SeqCst) {
                return Ok(ok);
            }
        }
    }

    async fn serve(&self, plan: &ReplayPlan, terminate_on_complete: bool) -> Result<bool, HostError> {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await?;
        let port = listener.local_addr()?.port();
        tracing::info!(port, in_process = self.inner.options.in_process, "listening for worker");

        let mut runner = if self.inner.options.in_process {
            Runner::start_thread(port, Arc::clone(&self.inner.register))?
        } else {
            let command = self
                .inner
                .options
                .worker_command
                .clone()
                .unwrap_or_else(default_worker_command);
            Runner::start_process(port, &command)?
        };

        let result = self.drive_connection(listener, plan, terminate_on_complete).await;
        if result.is_err() {
            runner.kill();
        }
        runner.join();
        result
    }

    async fn drive_connection(
        &self,
        listener: tokio::net::TcpListener,
        plan: &ReplayPlan,
        terminate_on_complete: bool,
    ) -> Result<bool, HostError> {
        let (stream, _) = listener.accept().await?;
        stream.set_nodelay(true)?;
        tracing::info!("worker connected");
        let (mut reader, mut writer) = stream.into_split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<(Request, Message)>();
        *self.inner.out.lock() = Some(out_tx);
        self.inner.running.store(true, Ordering::SeqCst);
        self.inner.completed.store(false, Ordering::SeqCst);
        self.inner.count_failed.store(0, Ordering::SeqCst);

        let writer_task = tokio::spawn(async move {
            while let Some((request, parts)) = out_rx.recv().await {
                if let Err(e) = write_packet(&mut writer, &request, &parts).await {
                    tracing::error!(error = %e, "failed to write to worker");
                    break;
                }
            }
        });

        self.send_init();
        self.replay(plan);

        // connect clients attached before the session started
        let clients: Vec<Arc<ExecutionClient>> =
            self.inner.clients.lock().values().cloned().collect();
        for client in clients {
            self.connect_client(&client);
        }

        if !self.is_paused() {
            self.inner.send(Request::Resume, Vec::new());
        }

        let outcome = loop {
            match read_packet::<_, Event>(&mut reader).await {
                Ok(Some((event, parts))) => {
                    self.handle_event(event, parts, terminate_on_complete);
                }
                Ok(None) => break Ok(()),
                Err(e) => {
                    tracing::error!(error = %e, "terminating receive loop");
                    break Err(HostError::from(e));
                }
            }
        };

        tracing::info!("terminating connection");
        self.inner.running.store(false, Ordering::SeqCst);
        *self.inner.out.lock() = None;
        for client in self.inner.clients.lock().values() {
            client.set_disconnected();
        }
        let _ = writer_task.await;

        // a run that terminates without ever completing (e.g. the worker
        // died during the handshake) is a failure
        let completed = self.inner.completed.load(Ordering::SeqCst);
        outcome.map(|_| {
            (completed || !terminate_on_complete)
                && self.inner.count_failed.load(Ordering::SeqCst) == 0
        })
    }

    fn send_init(&self) {
        let injected_inputs: Vec<InjectedInput> = self
            .inner
            .injected
            .lock()
            .iter()
            .map(|((node_id, port), value)| InjectedInput {
                node_id: node_id.clone(),
                port: port.clone(),
                value: value.clone(),
            })
            .collect();
        let output_listeners = self
            .inner
            .listeners
            .lock()
            .keys()
            .map(|(node_id, port)| lattice_core::PortRef::new(node_id, port))
            .collect();
        self.inner.send(
            Request::Init {
                execution_folder: self.inner.options.execution_folder.clone(),
                packages: self.inner.options.packages.clone(),
                injected_inputs,
                output_listeners,
            },
            Vec::new(),
        );
    }

    /// Replay packages, then nodes in traversal order, then links, all
    /// with `loading=true`.
    fn replay(&self, plan: &ReplayPlan) {
        for package_id in &plan.packages {
            self.inner
                .send(Request::AddPackage { package_id: package_id.clone() }, Vec::new());
        }
        for (node_id, node_type) in &plan.nodes {
            self.inner.send(
                Request::AddNode {
                    node_id: node_id.clone(),
                    node_type: node_type.clone(),
                    loading: true,
                },
                Vec::new(),
            );
        }
        for link in &plan.links {
            self.notify_add_link(link, true);
        }
    }

    fn handle_event(&self, event: Event, parts: Message, terminate_on_complete: bool) {
        match event {
            Event::ClientMessage { origin_id, origin_type, client_id } => {
                let client = self
                    .inner
                    .clients
                    .lock()
                    .get(&(origin_type, origin_id.clone(), client_id))
                    .cloned();
                if let Some(client) = client {
                    client.message_callback(parts);
                }
            }
            Event::UpdateExecutionState { node_id, execution_state, exn, is_manual, at_time } => {
                if let Some(callback) = &*self.inner.execution_cb.lock() {
                    callback(at_time, &node_id, execution_state, exn.as_deref(), is_manual);
                }
            }
            Event::Status { origin_id, origin_type, status, message } => {
                if let Some(callback) = &*self.inner.status_cb.lock() {
                    callback(&origin_id, origin_type, status, &message);
                }
            }
            Event::OutputNotification { node_id, output_port, value } => {
                let listeners = self.inner.listeners.lock();
                if let Some(callbacks) = listeners.get(&(node_id, output_port)) {
                    for callback in callbacks {
                        callback(value.clone());
                    }
                }
            }
            Event::ExecutionComplete { count_failed } => {
                self.inner.completed.store(true, Ordering::SeqCst);
                self.inner.count_failed.store(count_failed, Ordering::SeqCst);
                if let Some(callback) = &*self.inner.complete_cb.lock() {
                    callback();
                }
                if terminate_on_complete {
                    self.inner.send(Request::CloseWorker, Vec::new());
                }
            }
        }
    }
}
