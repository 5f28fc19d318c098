//! `wsbroker` — an embeddable, multiplexed WebSocket server core.
//!
//! The event loop ([`event_loop`]) multiplexes a listening socket, an
//! internal broadcast command queue, and a population of live client
//! connections on a single dedicated task. [`server::ServerContext`] is the
//! entry point: construct a [`protocol::Registry`] of named protocols, each
//! backed by a [`callback::ProtocolHandler`], bind a context, and run it.

pub mod broadcast;
pub mod callback;
pub mod config;
pub mod connection;
pub mod error;
pub mod event_loop;
pub mod padding;
pub mod privilege;
pub mod protocol;
pub mod server;
pub mod slot;
pub mod tls;
pub mod transport;

pub use broadcast::BroadcastHandle;
pub use callback::{ProtocolHandler, Reason};
pub use config::ServerConfig;
pub use connection::context::ConnectionHandle;
pub use error::{AcceptError, BroadcastError, ConnectionError, InitError};
pub use protocol::{ProtocolIndex, Registry};
pub use server::{ServerContext, ServerHandle};

pub use wsbroker_proto::Message;
