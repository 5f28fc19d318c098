//! A client that completes the opening handshake and then simply drops the
//! TCP connection (no close frame) must still produce exactly one `CLOSED`
//! callback and must not be destroyed twice.

#[path = "common/mod.rs"]
mod common;

use wsbroker::Registry;

use common::RecordingHandler;

#[tokio::test(flavor = "multi_thread")]
async fn abrupt_disconnect_yields_exactly_one_closed_callback() {
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

    let ws = common::connect_client(addr, "echo").await;
    drop(ws);

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let recorded = events.lock().unwrap().clone();
    assert_eq!(recorded, vec!["ESTABLISHED", "CLOSED"]);
}
