//! The protocol callback contract (spec §6).

use async_trait::async_trait;

use crate::connection::context::ConnectionHandle;

/// Why the callback is firing. Mirrors spec §6's recognized reasons exactly.
#[derive(Debug)]
pub enum Reason<'a> {
    /// Handshake complete; initialize per-session state.
    Established,
    /// Terminal; release per-session state. Delivered at most once, and only
    /// if the connection ever reached `Established`.
    Closed,
    /// Inbound application payload delivered.
    Receive(&'a [u8]),
    /// A broadcast has arrived for this protocol; the callback decides
    /// whether to write it back to the peer.
    Broadcast(&'a [u8]),
    /// Non-upgrade HTTP request; delivered only to the first protocol in
    /// the registry.
    Http { path: &'a str },
}

/// User protocol business logic, invoked by the event loop at the points
/// described in spec §6. Implementations should not block; the loop is
/// single-threaded and a blocked callback stalls every other connection.
#[async_trait]
pub trait ProtocolHandler: Send + Sync {
    async fn on_event(&self, conn: &ConnectionHandle, reason: Reason<'_>);
}
