//! Performs the HTTP → WebSocket upgrade handshake on a freshly accepted
//! stream, or reports that the request should instead be served as plain
//! HTTP.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::protocol::Role;
use tracing::debug;

use crate::accept_key::accept_key;
use crate::error::HandshakeError;
use crate::prefixed::Prefixed;
use crate::request::{ParsedRequest, parse_request};

const SUPPORTED_VERSION: &str = "13";

/// What the caller should do after reading the request head.
pub enum HandshakeOutcome<S> {
    /// The client negotiated a WebSocket upgrade on `protocol`.
    Upgraded {
        stream: WebSocketStream<Prefixed<S>>,
        protocol: Option<String>,
    },
    /// The request was well-formed HTTP but not a WebSocket upgrade; the
    /// caller owns the stream and any bytes already consumed from it.
    Http {
        request: ParsedRequest,
        stream: Prefixed<S>,
    },
}

/// Reads the request head from `io`, decides upgrade vs. HTTP fallback,
/// negotiates a subprotocol from `offered_protocols` (in registry order),
/// and on a successful upgrade writes the HTTP 101 response and returns a
/// framed `WebSocketStream`.
///
/// `read_chunk_size` bounds each individual read while accumulating the
/// request head — the handshake-time instance of the per-iteration read
/// buffer bound `ServerConfig::read_buffer_size` describes.
pub async fn perform_handshake<S>(
    mut io: S,
    offered_protocols: &[String],
    read_chunk_size: usize,
) -> Result<HandshakeOutcome<S>, HandshakeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = BytesMut::with_capacity(4 * 1024);
    let mut chunk = vec![0u8; read_chunk_size.max(1)];

    let (request, consumed) = loop {
        let n = io.read(&mut chunk).await?;
        if n == 0 {
            return Err(HandshakeError::Incomplete);
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(parsed) = parse_request(&buf)? {
            break parsed;
        }
    };

    let leftover = buf.split_off(consumed);

    if !request.is_websocket_upgrade() {
        debug!(path = %request.path, "request is not a WebSocket upgrade, falling back to HTTP");
        return Ok(HandshakeOutcome::Http {
            request,
            stream: Prefixed::new(io, leftover),
        });
    }

    let version = request.websocket_version().unwrap_or("");
    if version != SUPPORTED_VERSION {
        return Err(HandshakeError::UnsupportedVersion(version.to_string()));
    }

    let client_key = request.websocket_key().ok_or(HandshakeError::MissingKey)?;
    let accept = accept_key(client_key);

    let requested = request.requested_protocols();
    let negotiated = offered_protocols
        .iter()
        .find(|candidate| requested.iter().any(|r| r == *candidate))
        .cloned();

    if !requested.is_empty() && negotiated.is_none() {
        return Err(HandshakeError::NoMatchingProtocol(requested));
    }

    let mut response = format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {accept}\r\n"
    );
    if let Some(ref proto) = negotiated {
        response.push_str(&format!("Sec-WebSocket-Protocol: {proto}\r\n"));
    }
    response.push_str("\r\n");

    io.write_all(response.as_bytes()).await?;
    io.flush().await?;

    let prefixed = Prefixed::new(io, leftover);
    let stream = WebSocketStream::from_raw_socket(prefixed, Role::Server, None).await;

    Ok(HandshakeOutcome::Upgraded {
        stream,
        protocol: negotiated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn falls_back_to_http_for_plain_request() {
        let request = b"GET /health HTTP/1.1\r\nHost: x\r\n\r\n";
        let io = tokio_test::io::Builder::new().read(request).build();

        let outcome = perform_handshake(io, &[], 1024).await.unwrap();
        match outcome {
            HandshakeOutcome::Http { request, .. } => {
                assert_eq!(request.path, "/health");
            }
            HandshakeOutcome::Upgraded { .. } => panic!("expected HTTP fallback"),
        }
    }

    #[tokio::test]
    async fn rejects_unsupported_version() {
        let request = b"GET /chat HTTP/1.1\r\n\
Upgrade: websocket\r\n\
Connection: Upgrade\r\n\
Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
Sec-WebSocket-Version: 8\r\n\
\r\n";
        let io = tokio_test::io::Builder::new().read(request).build();

        let err = perform_handshake(io, &[], 1024).await.unwrap_err();
        assert!(matches!(err, HandshakeError::UnsupportedVersion(_)));
    }

    #[tokio::test]
    async fn rejects_unknown_subprotocol() {
        let request = b"GET /chat HTTP/1.1\r\n\
Upgrade: websocket\r\n\
Connection: Upgrade\r\n\
Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
Sec-WebSocket-Version: 13\r\n\
Sec-WebSocket-Protocol: unknown\r\n\
\r\n";
        let io = tokio_test::io::Builder::new().read(request).build();

        let err = perform_handshake(io, &["chat".to_string()], 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, HandshakeError::NoMatchingProtocol(_)));
    }
}
