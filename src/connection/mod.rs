//! Per-accepted-socket connection record.

pub mod context;
pub mod lifecycle;
pub mod state;

use std::net::SocketAddr;

use futures_util::stream::SplitSink;

use crate::connection::context::UserData;
use crate::connection::state::ConnState;
use crate::protocol::ProtocolIndex;
use crate::transport::Transport;
use wsbroker_proto::{Message, Prefixed, WebSocketStream};

/// A connection's transport side, which only exists once the connection has
/// actually reached [`ConnState::Established`].
///
/// A [`Connection`] in [`ConnState::Http`] has no sink here: the raw
/// transport is owned by the in-flight handshake future (see
/// `event_loop::spawn_handshake`) until it resolves, since there is nothing
/// meaningful to write to a connection that hasn't finished upgrading.
pub enum ConnIo {
    /// Handshake in flight.
    Pending,
    /// Past the upgrade; the writable half of the framed WebSocket stream.
    Established(SplitSink<WebSocketStream<Prefixed<Transport>>, Message>),
}

/// A connection held in the server's connection table, from the moment it
/// is accepted through to destruction. Mutated only by the event loop;
/// externally visible state is shared via [`context::ConnectionHandle`].
pub struct Connection {
    pub addr: SocketAddr,
    pub state: ConnState,
    /// The protocol this connection is bound to: the registry head while
    /// `HTTP`, rebound to the negotiated protocol on `ESTABLISHED`.
    pub protocol: ProtocolIndex,
    pub wire_revision: u32,
    pub user_data: UserData,
    pub io: ConnIo,
}

/// Wire revision assigned to a freshly accepted connection before any
/// protocol-specific negotiation bumps it.
pub const DEFAULT_WIRE_REVISION: u32 = 76;
