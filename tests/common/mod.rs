//! Shared fixtures for the end-to-end seed scenarios (spec §8).

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::http::Request;
use tokio_tungstenite::{WebSocketStream, client_async};
use wsbroker::{ConnectionHandle, ProtocolHandler, Reason, Registry, ServerConfig, ServerContext, ServerHandle};

/// Records every callback reason it receives, in order, as a short string.
#[derive(Default)]
pub struct RecordingHandler {
    pub events: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ProtocolHandler for RecordingHandler {
    async fn on_event(&self, _conn: &ConnectionHandle, reason: Reason<'_>) {
        let label = match reason {
            Reason::Established => "ESTABLISHED".to_string(),
            Reason::Closed => "CLOSED".to_string(),
            Reason::Receive(data) => format!("RECEIVE:{}", String::from_utf8_lossy(data)),
            Reason::Broadcast(data) => format!("BROADCAST:{}", String::from_utf8_lossy(data)),
            Reason::Http { path } => format!("HTTP:{path}"),
        };
        self.events.lock().unwrap().push(label);
    }
}

/// On `Receive`, re-broadcasts the payload to every established peer on the
/// same protocol (in-loop path, spec §4.5). Records every `Broadcast` it
/// itself observes, tagged by which connection observed it.
#[derive(Default)]
pub struct ChatHandler {
    pub broadcasts_seen: Arc<Mutex<Vec<(SocketAddr, String)>>>,
}

#[async_trait]
impl ProtocolHandler for ChatHandler {
    async fn on_event(&self, conn: &ConnectionHandle, reason: Reason<'_>) {
        match reason {
            Reason::Receive(data) => {
                conn.broadcast(conn.protocol_index(), data);
            }
            Reason::Broadcast(data) => {
                self.broadcasts_seen
                    .lock()
                    .unwrap()
                    .push((conn.addr(), String::from_utf8_lossy(data).to_string()));
            }
            Reason::Established | Reason::Closed | Reason::Http { .. } => {}
        }
    }
}

/// Binds a server with `registry` on an OS-chosen loopback port and waits
/// for the loop to start accepting before returning.
pub async fn spawn_server(registry: Registry, max_clients: usize) -> (ServerHandle, SocketAddr) {
    let config = ServerConfig::builder()
        .bind_addr("127.0.0.1:0".parse().unwrap())
        .max_clients(max_clients)
        .build();

    let (ctx, mut handle) = ServerContext::bind_plain(config, registry)
        .await
        .expect("bind should succeed");
    let addr = ctx.local_addr().expect("listener must be bound");

    tokio::spawn(ctx.run());
    handle.wait_ready().await;

    (handle, addr)
}

/// Connects a plain-TCP WebSocket client to `addr` under the given
/// subprotocol, and completes the opening handshake.
pub async fn connect_client(addr: SocketAddr, protocol: &str) -> WebSocketStream<TcpStream> {
    let tcp = TcpStream::connect(addr).await.expect("tcp connect");
    let request = Request::builder()
        .uri(format!("ws://{addr}/"))
        .header("Host", addr.to_string())
        .header("Upgrade", "websocket")
        .header("Connection", "Upgrade")
        .header("Sec-WebSocket-Key", tokio_tungstenite::tungstenite::handshake::client::generate_key())
        .header("Sec-WebSocket-Version", "13")
        .header("Sec-WebSocket-Protocol", protocol)
        .body(())
        .unwrap();
    let (ws, _response) = client_async(request, tcp).await.expect("ws handshake");
    ws
}
