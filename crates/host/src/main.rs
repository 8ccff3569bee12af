// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lattice-worker`: runs an execution engine connected to a host over
//! loopback TCP. Spawned by the execution manager in out-of-process mode.

use clap::Parser;

#[derive(Parser)]
#[command(name = "lattice-worker", about = "lattice execution worker")]
struct Args {
    /// Host name to connect back to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port the host is listening on
    #[arg(long)]
    port: u16,

    /// Verbose logging
    #[arg(long)]
    verbose: bool,
}

fn main() -> std::process::ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    match lattice_host::run_worker_blocking(&args.host, args.port, |class_map| {
        lattice_packages::register_builtin(class_map);
    }) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "worker failed");
            std::process::ExitCode::FAILURE
        }
    }
}
