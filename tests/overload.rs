//! Connection-table overload: once the table holds `max_clients` live
//! connections, the next accepted socket is closed immediately with no
//! callback delivered at all.

#[path = "common/mod.rs"]
mod common;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use wsbroker::Registry;

use common::RecordingHandler;

#[tokio::test(flavor = "multi_thread")]
async fn nth_plus_one_connection_is_closed_without_a_callback() {
    let events = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let registry = Registry::builder()
        .register(
            "echo",
            RecordingHandler {
                events: events.clone(),
            },
        )
        .build();

    let (_handle, addr) = common::spawn_server(registry, 1).await;

    let _first = common::connect_client(addr, "echo").await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let mut overflow = TcpStream::connect(addr).await.unwrap();
    let _ = overflow
        .write_all(b"GET / HTTP/1.1\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\nSec-WebSocket-Version: 13\r\nSec-WebSocket-Protocol: echo\r\n\r\n")
        .await;

    let mut buf = Vec::new();
    let _ = overflow.read_to_end(&mut buf).await;
    assert!(buf.is_empty(), "overloaded accept must not write any response");

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let recorded = events.lock().unwrap().clone();
    assert_eq!(recorded, vec!["ESTABLISHED"]);
}
