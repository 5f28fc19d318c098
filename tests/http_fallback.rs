//! Seed scenario 2 (spec §8.2): HTTP fallback.

#[path = "common/mod.rs"]
mod common;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use wsbroker::Registry;

use common::RecordingHandler;

#[tokio::test(flavor = "multi_thread")]
async fn plain_get_delivers_http_reason_with_no_upgrade() {
    let events = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let registry = Registry::builder()
        .register(
            "echo",
            RecordingHandler {
                events: events.clone(),
            },
        )
        .build();

    let (_handle, addr) = common::spawn_server(registry, 16).await;

    let mut tcp = TcpStream::connect(addr).await.unwrap();
    tcp.write_all(b"GET /index.html HTTP/1.1\r\nHost: x\r\n\r\n")
        .await
        .unwrap();

    let mut buf = Vec::new();
    let _ = tcp.read_to_end(&mut buf).await;

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let recorded = events.lock().unwrap().clone();
    assert_eq!(recorded, vec!["HTTP:/index.html"]);
    assert!(buf.starts_with(b"HTTP/1.1 404"));
}
