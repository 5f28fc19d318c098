//! Seed scenario 1 (spec §8.1): single-client echo.

#[path = "common/mod.rs"]
mod common;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use wsbroker::Registry;

use common::RecordingHandler;

#[tokio::test(flavor = "multi_thread")]
async fn established_receive_then_closed_in_order() {
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

    let mut ws = common::connect_client(addr, "echo").await;
    ws.send(Message::binary(b"hi".to_vec())).await.unwrap();
    ws.close(None).await.unwrap();
    // Drain until the server half observes the close and completes teardown.
    while ws.next().await.is_some() {}

    // Give the server task a moment to process the close frame.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let recorded = events.lock().unwrap().clone();
    assert_eq!(recorded, vec!["ESTABLISHED", "RECEIVE:hi", "CLOSED"]);
}
