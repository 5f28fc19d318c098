//! HTTP upgrade handshake and WebSocket frame collaborator.
//!
//! This crate implements the parsing/negotiation/framing surface that
//! `wsbroker`'s core event loop treats as an opaque collaborator: turning a
//! freshly accepted byte stream into either an upgraded
//! [`tokio_tungstenite::WebSocketStream`] or a plain HTTP request for the
//! embedder to answer itself.

mod accept_key;
mod error;
mod handshake;
mod keepalive;
mod prefixed;
mod request;

pub use accept_key::accept_key;
pub use error::HandshakeError;
pub use handshake::{HandshakeOutcome, perform_handshake};
pub use keepalive::pong_for;
pub use prefixed::Prefixed;
pub use request::{MAX_HEADER_BYTES, ParsedRequest, parse_request};

pub use tokio_tungstenite::WebSocketStream;
pub use tokio_tungstenite::tungstenite::Message;
pub use tokio_tungstenite::tungstenite::protocol::CloseFrame;
