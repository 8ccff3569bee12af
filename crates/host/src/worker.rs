// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker loop: connect back to the host, build the engine from the
//! `init` packet, serve requests and forward engine events.

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use lattice_core::Message;
use lattice_engine::{
    ClassMap, EngineCommand, EngineConfig, EngineEvent, EngineHandle, ExecutionEngine, LinkSpec,
};
use lattice_wire::{read_packet, write_packet, Event, ProtocolError, Request};

use crate::error::HostError;

/// Run the worker loop on a fresh single-threaded runtime, blocking the
/// calling thread until the host closes the connection.
pub fn run_worker_blocking(
    host: &str,
    port: u16,
    register: impl Fn(&mut ClassMap),
) -> Result<(), HostError> {
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let local = tokio::task::LocalSet::new();
    local.block_on(&rt, run_worker(host, port, register))
}

/// Connect to the host and serve until `close_worker` or disconnect.
/// Must run inside a `LocalSet`.
pub async fn run_worker(
    host: &str,
    port: u16,
    register: impl Fn(&mut ClassMap),
) -> Result<(), HostError> {
    let stream = TcpStream::connect((host, port)).await?;
    stream.set_nodelay(true)?;
    let (mut reader, writer) = stream.into_split();

    // the first packet must be init
    let Some((request, _)) = read_packet::<_, Request>(&mut reader).await? else {
        return Err(ProtocolError::ConnectionClosed.into());
    };
    let Request::Init { execution_folder, packages, injected_inputs, output_listeners } = request
    else {
        return Err(ProtocolError::Corrupt("expected init as the first packet".into()).into());
    };

    let mut class_map = ClassMap::new();
    register(&mut class_map);

    // every named package must resolve against the registry
    let mut schema = lattice_schema::Schema::new();
    for dir in &packages {
        let package_id = schema.load_package_dir(dir)?;
        if !class_map.has_package(&package_id) {
            return Err(HostError::UnknownPackage(package_id));
        }
    }

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let (engine, commands) =
        ExecutionEngine::new(class_map, EngineConfig::new(&execution_folder), events_tx);
    for injected in injected_inputs {
        engine.inject_input(&injected.node_id, &injected.port, injected.value);
    }
    for listener in output_listeners {
        engine.add_output_listener(&listener.node_id, &listener.port);
    }
    let handle = engine.handle();

    let loop_engine = engine.clone();
    let engine_task = tokio::task::spawn_local(async move {
        loop_engine.run(commands).await;
    });

    // events drain to the socket in emission order
    let writer_task = tokio::task::spawn_local(async move {
        let mut writer = writer;
        while let Some(event) = events_rx.recv().await {
            let (packet, parts) = encode_event(event);
            if let Err(e) = write_packet(&mut writer, &packet, &parts).await {
                tracing::error!(error = %e, "failed to write event");
                break;
            }
        }
        writer
    });

    loop {
        match read_packet::<_, Request>(&mut reader).await {
            Ok(Some((Request::CloseWorker, _))) => break,
            Ok(Some((request, parts))) => apply_request(&handle, request, parts),
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "terminating receive loop");
                break;
            }
        }
    }

    // drain the engine: stop the loop, let in-flight executions finish,
    // close every wrapper
    handle.stop();
    let _ = engine_task.await;
    engine.close().await;
    drop(engine);

    if let Ok(mut writer) = writer_task.await {
        let _ = writer.shutdown().await;
    }
    Ok(())
}

fn apply_request(handle: &EngineHandle, request: Request, parts: Message) {
    match request {
        Request::Init { .. } => {
            tracing::warn!("duplicate init ignored");
        }
        Request::AddPackage { package_id } => {
            handle.send(EngineCommand::AddPackage { package_id });
        }
        Request::AddNode { node_id, node_type, loading } => {
            handle.send(EngineCommand::AddNode { node_id, node_type, loading });
        }
        Request::AddLink {
            link_id,
            from_node_id,
            from_port,
            to_node_id,
            to_port,
            loading,
            link_type: _,
        } => {
            handle.send(EngineCommand::AddLink {
                link: LinkSpec { link_id, from_node_id, from_port, to_node_id, to_port },
                loading,
            });
        }
        Request::RemoveNode { node_id } => {
            handle.send(EngineCommand::RemoveNode { node_id });
        }
        Request::RemoveLink { link_id } => {
            handle.send(EngineCommand::RemoveLink { link_id });
        }
        Request::Clear => handle.send(EngineCommand::Clear),
        Request::Pause => handle.send(EngineCommand::Pause),
        Request::Resume => handle.send(EngineCommand::Resume),
        Request::OpenClient { target_id, target_type, client_id, client_options } => {
            handle.send(EngineCommand::OpenClient {
                target_type,
                target_id,
                client_id,
                client_options,
            });
        }
        Request::ClientMessage { target_id, target_type, client_id } => {
            handle.send(EngineCommand::RecvMessage {
                target_type,
                target_id,
                client_id,
                message: parts,
            });
        }
        Request::CloseClient { target_id, target_type, client_id } => {
            handle.send(EngineCommand::CloseClient { target_type, target_id, client_id });
        }
        // handled by the caller
        Request::CloseWorker => {}
    }
}

fn encode_event(event: EngineEvent) -> (Event, Message) {
    match event {
        EngineEvent::ExecutionStateChanged { node_id, state, exn, is_manual, at_time } => (
            Event::UpdateExecutionState {
                node_id,
                execution_state: state,
                exn,
                is_manual,
                at_time,
            },
            Vec::new(),
        ),
        EngineEvent::Status { origin_id, origin_type, status, message } => {
            (Event::Status { origin_id, origin_type, status, message }, Vec::new())
        }
        EngineEvent::OutputNotification { node_id, output_port, value } => {
            (Event::OutputNotification { node_id, output_port, value }, Vec::new())
        }
        EngineEvent::ClientMessage { origin_id, origin_type, client_id, message } => {
            (Event::ClientMessage { origin_id, origin_type, client_id }, message)
        }
        EngineEvent::ExecutionComplete { count_failed } => {
            (Event::ExecutionComplete { count_failed }, Vec::new())
        }
    }
}
