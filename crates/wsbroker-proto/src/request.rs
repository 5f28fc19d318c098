//! Minimal HTTP/1.1 request-line + header parsing for the upgrade handshake.

use crate::error::HandshakeError;

/// Maximum size of the header block this parser will accept before giving up.
pub const MAX_HEADER_BYTES: usize = 8 * 1024;

/// A parsed HTTP request relevant to the handshake decision.
#[derive(Debug, Clone)]
pub struct ParsedRequest {
    pub method: String,
    pub path: String,
    pub version: u8,
    headers: Vec<(String, String)>,
}

impl ParsedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn header_contains_token(&self, name: &str, token: &str) -> bool {
        self.header(name)
            .map(|v| {
                v.split(',')
                    .any(|part| part.trim().eq_ignore_ascii_case(token))
            })
            .unwrap_or(false)
    }

    /// All `Sec-WebSocket-Protocol` entries, in client-preference order.
    pub fn requested_protocols(&self) -> Vec<String> {
        self.header("sec-websocket-protocol")
            .map(|v| v.split(',').map(|p| p.trim().to_string()).collect())
            .unwrap_or_default()
    }

    pub fn is_websocket_upgrade(&self) -> bool {
        self.header_contains_token("upgrade", "websocket")
            && self.header_contains_token("connection", "upgrade")
    }

    pub fn websocket_key(&self) -> Option<&str> {
        self.header("sec-websocket-key")
    }

    pub fn websocket_version(&self) -> Option<&str> {
        self.header("sec-websocket-version")
    }
}

/// Parses a buffer that may contain a complete HTTP request head.
///
/// Returns `Ok(Some((request, consumed)))` once a terminating CRLFCRLF has
/// been found, `Ok(None)` if more bytes are needed, and `Err` on malformed
/// input or once the header block exceeds [`MAX_HEADER_BYTES`].
pub fn parse_request(buf: &[u8]) -> Result<Option<(ParsedRequest, usize)>, HandshakeError> {
    if buf.len() > MAX_HEADER_BYTES {
        return Err(HandshakeError::HeaderTooLarge {
            limit: MAX_HEADER_BYTES,
        });
    }

    let mut header_storage = [httparse::EMPTY_HEADER; 64];
    let mut req = httparse::Request::new(&mut header_storage);

    let status = req.parse(buf)?;
    let consumed = match status {
        httparse::Status::Complete(n) => n,
        httparse::Status::Partial => return Ok(None),
    };

    let method = req.method.unwrap_or("").to_string();
    let path = req.path.unwrap_or("").to_string();
    let version = req.version.unwrap_or(1);
    let headers = req
        .headers
        .iter()
        .map(|h| {
            (
                h.name.to_string(),
                String::from_utf8_lossy(h.value).into_owned(),
            )
        })
        .collect();

    Ok(Some((
        ParsedRequest {
            method,
            path,
            version,
            headers,
        },
        consumed,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    const UPGRADE_REQUEST: &[u8] = b"GET /chat HTTP/1.1\r\n\
Host: example.com\r\n\
Upgrade: websocket\r\n\
Connection: Upgrade\r\n\
Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
Sec-WebSocket-Version: 13\r\n\
Sec-WebSocket-Protocol: chat, superchat\r\n\
\r\n";

    #[test]
    fn parses_complete_upgrade_request() {
        let (req, consumed) = parse_request(UPGRADE_REQUEST).unwrap().unwrap();
        assert_eq!(consumed, UPGRADE_REQUEST.len());
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/chat");
        assert!(req.is_websocket_upgrade());
        assert_eq!(
            req.websocket_key(),
            Some("dGhlIHNhbXBsZSBub25jZQ==")
        );
        assert_eq!(
            req.requested_protocols(),
            vec!["chat".to_string(), "superchat".to_string()]
        );
    }

    #[test]
    fn partial_request_yields_none() {
        let partial = b"GET /chat HTTP/1.1\r\nHost: example.com\r\n";
        assert!(parse_request(partial).unwrap().is_none());
    }

    #[test]
    fn plain_http_request_is_not_an_upgrade() {
        let plain = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let (req, _) = parse_request(plain).unwrap().unwrap();
        assert!(!req.is_websocket_upgrade());
    }

    #[test]
    fn oversized_header_block_is_rejected() {
        let mut oversized = b"GET / HTTP/1.1\r\n".to_vec();
        oversized.extend(std::iter::repeat(b'a').take(MAX_HEADER_BYTES + 1));
        assert!(matches!(
            parse_request(&oversized),
            Err(HandshakeError::HeaderTooLarge { .. })
        ));
    }
}
