//! Cross-context broadcast: a task outside the event loop submits a payload
//! through a `BroadcastHandle` and every established peer on that protocol
//! observes it.

#[path = "common/mod.rs"]
mod common;

use wsbroker::Registry;

use common::ChatHandler;

#[tokio::test(flavor = "multi_thread")]
async fn external_broadcast_reaches_same_protocol_peers_only() {
    let chat_seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let other_seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));

    let registry = Registry::builder()
        .register(
            "chat",
            ChatHandler {
                broadcasts_seen: chat_seen.clone(),
            },
        )
        .register(
            "other",
            ChatHandler {
                broadcasts_seen: other_seen.clone(),
            },
        )
        .build();

    let (handle, addr) = common::spawn_server(registry, 16).await;

    let mut a = common::connect_client(addr, "chat").await;
    let mut b = common::connect_client(addr, "chat").await;
    let mut c = common::connect_client(addr, "other").await;

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let broadcaster = handle.broadcast_handle("chat").expect("chat is registered");
    broadcaster.send(b"y").expect("ingress still open");

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let chat_payloads: Vec<String> = chat_seen
        .lock()
        .unwrap()
        .iter()
        .map(|(_, p)| p.clone())
        .collect();
    assert_eq!(chat_payloads, vec!["y".to_string(), "y".to_string()]);
    assert!(other_seen.lock().unwrap().is_empty());

    let _ = (&mut a, &mut b, &mut c);
}
