// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lattice`: load a topology, optionally import/export it, and run it.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use lattice_core::{ExecutionState, StatusLevel};
use lattice_graph::GraphError;
use lattice_host::Topology;

#[derive(Parser)]
#[command(name = "lattice", about = "Run lattice computation graphs")]
struct Args {
    /// Package directory containing a schema.json (repeatable)
    #[arg(long = "package", required = true)]
    package: Vec<PathBuf>,

    /// Folder holding the topology and its persistent state
    #[arg(long)]
    execution_folder: PathBuf,

    /// Topology file to import (.zip, .yaml or .yml)
    #[arg(long)]
    import_path: Option<PathBuf>,

    /// Topology file to export (.zip, .yaml or .yml)
    #[arg(long)]
    export_path: Option<PathBuf>,

    /// Run the topology after loading
    #[arg(long)]
    run: bool,
}

#[derive(Clone, Copy, PartialEq)]
enum Format {
    Zip,
    Yaml,
}

fn detect_format(path: &Path) -> Result<Format, GraphError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("zip") => Ok(Format::Zip),
        Some("yaml") | Some("yml") => Ok(Format::Yaml),
        _ => Err(GraphError::UnsupportedFormat(path.display().to_string())),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            tracing::error!("execution failed");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("run failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<bool> {
    let topology = Topology::new(
        &args.execution_folder,
        &args.package,
        Arc::new(|class_map| lattice_packages::register_builtin(class_map)),
    )
    .context("failed to create topology")?;

    topology.set_status_handler(|origin_id, origin_type, status, message| match status {
        StatusLevel::Info => tracing::info!("[{}:{}] {}", origin_type, origin_id, message),
        StatusLevel::Warning => tracing::warn!("[{}:{}] {}", origin_type, origin_id, message),
        StatusLevel::Error => tracing::error!("[{}:{}] {}", origin_type, origin_id, message),
        StatusLevel::Clear => {}
    });
    topology.set_execution_handler(|_at_time, node_id, state, exn, _is_manual| {
        if state == ExecutionState::Failed {
            tracing::error!("[node:{}] execution error: {}", node_id, exn.unwrap_or("unknown"));
        }
    });

    if let Some(import_path) = &args.import_path {
        let format = detect_format(import_path)?;
        let file = File::open(import_path)
            .with_context(|| format!("cannot open {}", import_path.display()))?;
        match format {
            Format::Zip => {
                topology.load_zip(file).context("error importing topology")?;
            }
            Format::Yaml => {
                topology.import_yaml(file).context("error importing topology")?;
            }
        }
    }

    let mut succeeded = true;
    if args.run {
        succeeded = topology.run().context("execution error")?;
    }

    if let Some(export_path) = &args.export_path {
        let format = detect_format(export_path)?;
        let file = File::create(export_path)
            .with_context(|| format!("cannot create {}", export_path.display()))?;
        match format {
            Format::Zip => topology.save_zip(file).context("error exporting topology")?,
            Format::Yaml => topology.export_yaml(file).context("error exporting topology")?,
        }
    }

    Ok(succeeded)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
