//! The multiplexer: a single task servicing the listener, in-flight
//! handshakes, the broadcast command queue (an in-process replacement for
//! per-protocol loopback ingress sockets), and every live connection.
//!
//! Built on [`FuturesUnordered`] instead of a manual `poll(2)` array: each
//! live connection contributes one "read the next frame" future, each
//! accepted-but-not-yet-upgraded socket contributes one "finish the
//! handshake" future, and `tokio::select!` is the single suspension point.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::SinkExt;
use futures_util::StreamExt;
use futures_util::stream::{FuturesUnordered, SplitStream};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_rustls::TlsAcceptor;
use tokio_tungstenite::tungstenite::Error as WsError;
use tracing::{info, instrument, warn};
use wsbroker_proto::{HandshakeOutcome, Message, Prefixed, WebSocketStream, perform_handshake, pong_for};

use crate::broadcast::LoopCommand;
use crate::callback::Reason;
use crate::connection::context::ConnectionHandle;
use crate::connection::state::ConnState;
use crate::connection::{ConnIo, Connection, DEFAULT_WIRE_REVISION, lifecycle};
use crate::error::{AcceptError, ConnectionError};
use crate::protocol::Registry;
use crate::server::ServerContext;
use crate::slot::{ConnId, ConnTable};
use crate::transport::Transport;

type PendingRead = Pin<
    Box<
        dyn Future<
                Output = (
                    ConnId,
                    SplitStream<WebSocketStream<Prefixed<Transport>>>,
                    Option<Result<Message, WsError>>,
                ),
            > + Send,
    >,
>;

/// What a pending handshake resolved to: a usable outcome, or a failure
/// already logged by [`spawn_handshake`] (TLS failure, malformed/unsupported
/// request, or timeout — spec §7 "Accept-time failures").
enum HandshakeResult {
    Outcome(HandshakeOutcome<Transport>),
    Failed,
}

type PendingHandshake =
    Pin<Box<dyn Future<Output = (ConnId, SocketAddr, HandshakeResult)> + Send>>;

fn next_message(id: ConnId, mut stream: SplitStream<WebSocketStream<Prefixed<Transport>>>) -> PendingRead {
    Box::pin(async move {
        let item = stream.next().await;
        (id, stream, item)
    })
}

/// Runs the TLS accept (if configured) and the HTTP/WebSocket handshake for
/// one freshly accepted socket, off the hot path of the event loop's own
/// `select!` so a slow or hostile peer can't stall accepts, reads, or
/// broadcasts for everyone else. Every failure branch logs a typed
/// [`AcceptError`] and is non-fatal to the server (spec §7).
fn spawn_handshake(
    id: ConnId,
    addr: SocketAddr,
    stream: TcpStream,
    tls_acceptor: Option<TlsAcceptor>,
    offered: Vec<String>,
    handshake_timeout: Duration,
    read_chunk_size: usize,
) -> PendingHandshake {
    Box::pin(async move {
        let transport = match tls_acceptor {
            Some(acceptor) => match acceptor.accept(stream).await {
                Ok(tls_stream) => Transport::Tls(Box::new(tls_stream)),
                Err(e) => {
                    // Browsers probe with incompatible TLS parameters; discard silently.
                    let err = AcceptError::TlsHandshake(e);
                    warn!(%addr, error = %err, code = err.error_code(), "TLS handshake failed");
                    return (id, addr, HandshakeResult::Failed);
                }
            },
            None => Transport::Plain(stream),
        };

        match tokio::time::timeout(
            handshake_timeout,
            perform_handshake(transport, &offered, read_chunk_size),
        )
        .await
        {
            Ok(Ok(outcome)) => (id, addr, HandshakeResult::Outcome(outcome)),
            Ok(Err(e)) => {
                let err = AcceptError::from(e);
                warn!(%addr, error = %err, code = err.error_code(), "WebSocket handshake failed");
                (id, addr, HandshakeResult::Failed)
            }
            Err(_) => {
                let err = AcceptError::Timeout;
                warn!(%addr, error = %err, code = err.error_code(), "handshake timed out");
                (id, addr, HandshakeResult::Failed)
            }
        }
    })
}

/// Drives the event loop until the listener dies. A listener error is
/// treated as fatal: the loop unwinds and the error propagates to the
/// caller.
#[instrument(skip(ctx), name = "event_loop", fields(addr = %ctx.config().bind_addr))]
pub async fn run(mut ctx: ServerContext) -> std::io::Result<()> {
    let registry = ctx.registry();
    let commands_tx = ctx.commands_tx();
    let mut conns: ConnTable<Connection> = ConnTable::with_capacity(ctx.config().max_clients);
    let mut pending_reads: FuturesUnordered<PendingRead> = FuturesUnordered::new();
    let mut pending_handshakes: FuturesUnordered<PendingHandshake> = FuturesUnordered::new();

    let mut keepalive = tokio::time::interval(ctx.config().ping_interval);
    keepalive.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    keepalive.tick().await; // first tick fires immediately; consume it

    ctx.signal_ready();
    info!("event loop started");

    loop {
        tokio::select! {
            accept_res = ctx.listener_mut().accept() => {
                match accept_res {
                    Ok((stream, addr)) => {
                        handle_accept(stream, addr, &mut conns, &registry, &ctx, &mut pending_handshakes).await;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "listener error, tearing down event loop");
                        return Err(e);
                    }
                }
            }
            Some((id, addr, result)) = pending_handshakes.next(), if !pending_handshakes.is_empty() => {
                handle_handshake_result(id, addr, result, &mut conns, &registry, &commands_tx, &mut pending_reads).await;
            }
            Some((id, stream_half, item)) = pending_reads.next(), if !pending_reads.is_empty() => {
                handle_message(id, stream_half, item, &mut conns, &registry, &commands_tx, &mut pending_reads).await;
            }
            Some(cmd) = ctx.commands_rx_mut().recv() => {
                apply_command(cmd, &mut conns, &registry, &commands_tx).await;
                while let Ok(cmd) = ctx.commands_rx_mut().try_recv() {
                    apply_command(cmd, &mut conns, &registry, &commands_tx).await;
                }
            }
            _ = keepalive.tick() => {
                ping_established_connections(&mut conns).await;
            }
        }
    }
}

/// Pings every established connection directly over its sink, sidestepping
/// the command queue since the loop already holds `&mut conns` here.
/// `ServerConfig::ping_interval` (spec-adjacent ambient keepalive, not a
/// spec §3/§4 requirement) drives this tick.
async fn ping_established_connections(conns: &mut ConnTable<Connection>) {
    for (id, conn) in conns.iter_mut() {
        if let ConnIo::Established(sink) = &mut conn.io {
            if let Err(e) = sink.send(Message::Ping(Vec::new())).await {
                warn!(conn = id, error = %e, "keepalive ping failed");
            }
        }
    }
}

/// Accepts one socket: reserves its slot in `HTTP` state (spec §4.2
/// "Connection created in HTTP state") and hands the TLS/handshake work to
/// [`spawn_handshake`], polled alongside everything else so one slow peer
/// can't block the rest of the loop.
async fn handle_accept(
    stream: TcpStream,
    addr: SocketAddr,
    conns: &mut ConnTable<Connection>,
    registry: &Registry,
    ctx: &ServerContext,
    pending_handshakes: &mut FuturesUnordered<PendingHandshake>,
) {
    // Table full: drop the newly accepted socket immediately, before any
    // handshake I/O, leaving the connection count unchanged.
    if conns.len() >= ctx.config().max_clients {
        let err = AcceptError::TableFull {
            max_clients: ctx.config().max_clients,
        };
        warn!(%addr, error = %err, code = err.error_code(), "connection table full, dropping new connection");
        return;
    }

    let tentative_protocol = registry
        .first()
        .expect("registry non-empty, checked at bind")
        .index;

    let conn = Connection {
        addr,
        state: ConnState::Http,
        protocol: tentative_protocol,
        wire_revision: DEFAULT_WIRE_REVISION,
        user_data: Arc::new(Mutex::new(None)),
        io: ConnIo::Pending,
    };
    let id = conns.insert(conn);

    let offered = registry.names();
    pending_handshakes.push(spawn_handshake(
        id,
        addr,
        stream,
        ctx.tls_acceptor().cloned(),
        offered,
        ctx.config().handshake_timeout,
        ctx.config().read_buffer_size,
    ));
}

/// Applies a resolved handshake to its reserved slot: transitions it to
/// `ESTABLISHED` on success, or tears it down — with no `CLOSED` callback,
/// since it never left `HTTP` — on HTTP-fallback or failure.
async fn handle_handshake_result(
    id: ConnId,
    addr: SocketAddr,
    result: HandshakeResult,
    conns: &mut ConnTable<Connection>,
    registry: &Registry,
    commands_tx: &mpsc::UnboundedSender<LoopCommand>,
    pending_reads: &mut FuturesUnordered<PendingRead>,
) {
    // The slot may already be gone if the server is shutting down.
    if !conns.contains(id) {
        return;
    }

    match result {
        HandshakeResult::Failed => {
            let conn = conns.remove(id);
            lifecycle::destroy(id, conn, registry, commands_tx).await;
        }
        HandshakeResult::Outcome(HandshakeOutcome::Upgraded { stream, protocol }) => {
            let entry = protocol
                .as_deref()
                .and_then(|name| registry.find_by_name(name))
                .or_else(|| registry.first());
            let Some(entry) = entry else {
                warn!(%addr, "no protocol available to bind upgraded connection to");
                let conn = conns.remove(id);
                lifecycle::destroy(id, conn, registry, commands_tx).await;
                return;
            };
            let protocol_index = entry.index;
            let (sink, read_half) = stream.split();

            let conn = conns.get_mut(id).expect("checked above");
            conn.state = ConnState::Established;
            conn.protocol = protocol_index;
            conn.io = ConnIo::Established(sink);
            let wire_revision = conn.wire_revision;
            let user_data = conn.user_data.clone();

            info!(%addr, protocol = %entry.name, conn = id, "connection established");

            let handle = ConnectionHandle::new(
                id,
                addr,
                protocol_index,
                entry.name.clone(),
                wire_revision,
                user_data,
                commands_tx.clone(),
            );
            entry.handler.on_event(&handle, Reason::Established).await;
            pending_reads.push(next_message(id, read_half));
        }
        HandshakeResult::Outcome(HandshakeOutcome::Http { request, stream }) => {
            // A plain HTTP request never reaches ESTABLISHED; remove the
            // reserved slot without a CLOSED callback.
            let conn = conns.remove(id);

            if let Some(entry) = registry.first() {
                let handle = ConnectionHandle::new(
                    id,
                    addr,
                    entry.index,
                    entry.name.clone(),
                    conn.wire_revision,
                    conn.user_data.clone(),
                    commands_tx.clone(),
                );
                entry
                    .handler
                    .on_event(&handle, Reason::Http { path: &request.path })
                    .await;
            }

            let mut raw = stream.into_inner();
            use tokio::io::AsyncWriteExt;
            let _ = raw
                .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .await;
            let _ = raw.shutdown().await;
        }
    }
}

async fn handle_message(
    id: ConnId,
    read_half: SplitStream<WebSocketStream<Prefixed<Transport>>>,
    item: Option<Result<Message, WsError>>,
    conns: &mut ConnTable<Connection>,
    registry: &Registry,
    commands_tx: &mpsc::UnboundedSender<LoopCommand>,
    pending_reads: &mut FuturesUnordered<PendingRead>,
) {
    match item {
        None => {
            if conns.contains(id) {
                let conn = conns.remove(id);
                let err = ConnectionError::PeerClosed;
                info!(conn = id, error = %err, code = err.error_code(), "peer closed connection");
                lifecycle::destroy(id, conn, registry, commands_tx).await;
            }
        }
        Some(Ok(Message::Close(_))) => {
            if conns.contains(id) {
                let conn = conns.remove(id);
                let err = ConnectionError::PeerClosed;
                info!(conn = id, error = %err, code = err.error_code(), "received close frame");
                lifecycle::destroy(id, conn, registry, commands_tx).await;
            }
        }
        Some(Ok(Message::Ping(payload))) => {
            // A split stream loses tokio-tungstenite's own auto-Pong (it
            // only fires when the same half reads and writes), so the
            // reply is sent explicitly over the write-side command queue.
            let _ = commands_tx.send(LoopCommand::Write {
                id,
                message: pong_for(payload),
            });
            pending_reads.push(next_message(id, read_half));
        }
        Some(Ok(Message::Pong(_))) => {
            pending_reads.push(next_message(id, read_half));
        }
        Some(Ok(Message::Frame(_))) => {
            pending_reads.push(next_message(id, read_half));
        }
        Some(Ok(Message::Text(text))) => {
            deliver_receive(id, text.as_bytes(), conns, registry, commands_tx).await;
            pending_reads.push(next_message(id, read_half));
        }
        Some(Ok(Message::Binary(data))) => {
            deliver_receive(id, &data, conns, registry, commands_tx).await;
            pending_reads.push(next_message(id, read_half));
        }
        Some(Err(e)) => {
            if conns.contains(id) {
                let conn = conns.remove(id);
                let err = ConnectionError::Protocol(e);
                warn!(conn = id, error = %err, code = err.error_code(), "connection error, destroying");
                lifecycle::destroy(id, conn, registry, commands_tx).await;
            }
        }
    }
}

async fn deliver_receive(
    id: ConnId,
    payload: &[u8],
    conns: &ConnTable<Connection>,
    registry: &Registry,
    commands_tx: &mpsc::UnboundedSender<LoopCommand>,
) {
    let Some(conn) = conns.get(id) else { return };
    if !conn.state.is_established() {
        return;
    }
    let Some(entry) = registry.get(conn.protocol) else {
        return;
    };
    let handle = ConnectionHandle::new(
        id,
        conn.addr,
        conn.protocol,
        entry.name.clone(),
        conn.wire_revision,
        conn.user_data.clone(),
        commands_tx.clone(),
    );
    entry.handler.on_event(&handle, Reason::Receive(payload)).await;
}

async fn apply_command(
    cmd: LoopCommand,
    conns: &mut ConnTable<Connection>,
    registry: &Registry,
    commands_tx: &mpsc::UnboundedSender<LoopCommand>,
) {
    match cmd {
        LoopCommand::Write { id, message } => {
            if let Some(conn) = conns.get_mut(id) {
                match &mut conn.io {
                    ConnIo::Established(sink) => {
                        if let Err(e) = sink.send(message).await {
                            warn!(conn = id, error = %e, "write failed");
                        }
                    }
                    ConnIo::Pending => {
                        warn!(conn = id, "dropping write to a connection still mid-handshake");
                    }
                }
            }
        }
        LoopCommand::Close { id } => {
            if conns.contains(id) {
                let conn = conns.remove(id);
                lifecycle::destroy(id, conn, registry, commands_tx).await;
            }
        }
        LoopCommand::Broadcast { protocol, payload } => {
            let Some(entry) = registry.get(protocol) else {
                return;
            };
            let recipients: Vec<ConnId> = conns
                .iter()
                .filter(|(_, c)| c.state.is_established() && c.protocol == protocol)
                .map(|(id, _)| id)
                .collect();

            for id in recipients {
                let Some(conn) = conns.get(id) else { continue };
                let handle = ConnectionHandle::new(
                    id,
                    conn.addr,
                    protocol,
                    entry.name.clone(),
                    conn.wire_revision,
                    conn.user_data.clone(),
                    commands_tx.clone(),
                );
                entry
                    .handler
                    .on_event(&handle, Reason::Broadcast(payload.payload()))
                    .await;
            }
        }
    }
}
