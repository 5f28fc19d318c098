//! Connection destruction.

use futures_util::SinkExt;
use tokio::sync::mpsc;
use tracing::warn;

use super::Connection;
use super::ConnIo;
use super::context::ConnectionHandle;
use super::state::ConnState;
use crate::broadcast::LoopCommand;
use crate::callback::Reason;
use crate::protocol::Registry;
use crate::slot::ConnId;

/// Destroys `conn`: delivers `CLOSED` iff it was `ESTABLISHED`, transitions
/// it to `DEAD`, then shuts the transport down (if it had reached
/// `ESTABLISHED` — a connection destroyed while still `HTTP` never had a
/// sink of its own; the handshake future that owned its raw transport is
/// responsible for dropping/shutting that down itself). Idempotent in the
/// sense that the event loop never calls this twice for the same slot — the
/// slab entry is removed in the same step that calls this function.
pub async fn destroy(
    id: ConnId,
    mut conn: Connection,
    registry: &Registry,
    commands: &mpsc::UnboundedSender<LoopCommand>,
) {
    if conn.state.is_established() {
        if let Some(entry) = registry.get(conn.protocol) {
            let handle = ConnectionHandle::new(
                id,
                conn.addr,
                conn.protocol,
                entry.name.clone(),
                conn.wire_revision,
                conn.user_data.clone(),
                commands.clone(),
            );
            entry.handler.on_event(&handle, Reason::Closed).await;
        }
    }
    conn.state = ConnState::Dead;

    if let ConnIo::Established(mut sink) = conn.io {
        if let Err(e) = sink.close().await {
            warn!(conn = id, error = %e, "error shutting down transport during destroy");
        }
    }
}
