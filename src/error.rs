//! Unified error hierarchy for `wsbroker`.
//!
//! One enum per failure domain, mirroring how far a failure can propagate:
//! construction failures are fatal, accept-time and connection-lifetime
//! failures are not.

use thiserror::Error;

/// Failures that can occur while constructing a [`crate::server::ServerContext`].
#[derive(Debug, Error)]
pub enum InitError {
    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to configure TLS: {0}")]
    Tls(#[from] crate::tls::TlsError),

    #[error("privilege drop failed: {0}")]
    Privilege(std::io::Error),

    #[error("registry has no protocols configured")]
    EmptyRegistry,
}

impl InitError {
    pub fn error_code(&self) -> &'static str {
        match self {
            InitError::Bind { .. } => "bind_failed",
            InitError::Tls(_) => "tls_setup_failed",
            InitError::Privilege(_) => "privilege_drop_failed",
            InitError::EmptyRegistry => "empty_registry",
        }
    }
}

/// Failures at accept time. Logged and the accepted socket discarded; never
/// propagated out of the event loop.
#[derive(Debug, Error)]
pub enum AcceptError {
    #[error("accept() failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS handshake failed: {0}")]
    TlsHandshake(std::io::Error),

    #[error("handshake failed: {0}")]
    Handshake(#[from] wsbroker_proto::HandshakeError),

    #[error("handshake did not complete before the configured timeout")]
    Timeout,

    #[error("connection table is full ({max_clients} slots)")]
    TableFull { max_clients: usize },
}

impl AcceptError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AcceptError::Io(_) => "accept_io",
            AcceptError::TlsHandshake(_) => "tls_handshake_failed",
            AcceptError::Handshake(_) => "ws_handshake_failed",
            AcceptError::Timeout => "handshake_timeout",
            AcceptError::TableFull { .. } => "table_full",
        }
    }
}

/// Failures on a live connection. Drives destruction; never fatal to the
/// server as a whole.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("read error: {0}")]
    Read(std::io::Error),

    #[error("write error: {0}")]
    Write(std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("peer closed the connection")]
    PeerClosed,

    #[error("callback returned an error: {0}")]
    Callback(String),
}

impl ConnectionError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ConnectionError::Read(_) => "read_error",
            ConnectionError::Write(_) => "write_error",
            ConnectionError::Protocol(_) => "protocol_error",
            ConnectionError::PeerClosed => "peer_closed",
            ConnectionError::Callback(_) => "callback_error",
        }
    }
}

/// Failures surfaced to an external caller invoking [`crate::broadcast::BroadcastHandle::send`]
/// from outside the event loop's own task.
#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("broadcast ingress for protocol {protocol:?} has shut down")]
    IngressClosed { protocol: String },
}

impl BroadcastError {
    pub fn error_code(&self) -> &'static str {
        match self {
            BroadcastError::IngressClosed { .. } => "ingress_closed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(
            AcceptError::TableFull { max_clients: 4 }.error_code(),
            "table_full"
        );
        assert_eq!(ConnectionError::PeerClosed.error_code(), "peer_closed");
    }
}
