// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker runners: a thread inside this process, or a child process.
//!
//! Both connect back to the host's loopback listener and run the same
//! worker loop; only the isolation differs.

use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use crate::error::HostError;
use crate::manager::RegisterFn;
use crate::worker::run_worker_blocking;

pub(crate) enum Runner {
    Thread {
        handle: Option<std::thread::JoinHandle<()>>,
    },
    Process {
        child: Child,
        output: Option<std::thread::JoinHandle<()>>,
    },
}

impl Runner {
    /// Run the worker loop on a thread in this process.
    pub(crate) fn start_thread(port: u16, register: RegisterFn) -> Result<Self, HostError> {
        let handle = std::thread::Builder::new()
            .name("lattice-worker".to_string())
            .spawn(move || {
                if let Err(e) = run_worker_blocking("127.0.0.1", port, register.as_ref()) {
                    tracing::error!(error = %e, "worker loop failed");
                }
            })
            .map_err(|e| HostError::WorkerSpawn(e.to_string()))?;
        Ok(Runner::Thread { handle: Some(handle) })
    }

    /// Spawn the worker binary as a child process, relaying its stdout.
    pub(crate) fn start_process(port: u16, command: &PathBuf) -> Result<Self, HostError> {
        let mut child = Command::new(command)
            .arg("--host")
            .arg("127.0.0.1")
            .arg("--port")
            .arg(port.to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| HostError::WorkerSpawn(format!("{}: {}", command.display(), e)))?;

        let pid = child.id();
        let output = child.stdout.take().map(|stdout| {
            std::thread::spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    match line {
                        Ok(line) => tracing::info!("[{}]: {}", pid, line),
                        Err(_) => break,
                    }
                }
            })
        });

        Ok(Runner::Process { child, output })
    }

    /// Forcibly terminate the worker (process mode only).
    pub(crate) fn kill(&mut self) {
        if let Runner::Process { child, .. } = self {
            let _ = child.kill();
        }
    }

    /// Wait for the worker to finish.
    pub(crate) fn join(mut self) {
        match &mut self {
            Runner::Thread { handle } => {
                if let Some(handle) = handle.take() {
                    let _ = handle.join();
                }
            }
            Runner::Process { child, output } => {
                let _ = child.wait();
                if let Some(output) = output.take() {
                    let _ = output.join();
                }
            }
        }
    }
}

/// Default path of the worker binary: a sibling of the current executable.
pub(crate) fn default_worker_command() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("lattice-worker")))
        .unwrap_or_else(|| PathBuf::from("lattice-worker"))
}
