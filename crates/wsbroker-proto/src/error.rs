use thiserror::Error;

/// Failures that can occur while parsing an HTTP request or performing
/// the WebSocket upgrade handshake.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("malformed HTTP request: {0}")]
    MalformedRequest(#[from] httparse::Error),

    #[error("request header block incomplete")]
    Incomplete,

    #[error("request header block exceeds {limit} bytes")]
    HeaderTooLarge { limit: usize },

    #[error("missing or invalid Upgrade header")]
    NotAnUpgrade,

    #[error("missing or invalid Sec-WebSocket-Key header")]
    MissingKey,

    #[error("unsupported Sec-WebSocket-Version: {0}")]
    UnsupportedVersion(String),

    #[error("no subprotocol in {0:?} is registered")]
    NoMatchingProtocol(Vec<String>),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl HandshakeError {
    /// Stable short label, analogous to the teacher's `error_code()` accessors.
    pub fn error_code(&self) -> &'static str {
        match self {
            HandshakeError::MalformedRequest(_) => "malformed_request",
            HandshakeError::Incomplete => "incomplete_request",
            HandshakeError::HeaderTooLarge { .. } => "header_too_large",
            HandshakeError::NotAnUpgrade => "not_an_upgrade",
            HandshakeError::MissingKey => "missing_key",
            HandshakeError::UnsupportedVersion(_) => "unsupported_version",
            HandshakeError::NoMatchingProtocol(_) => "no_matching_protocol",
            HandshakeError::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_is_stable() {
        assert_eq!(HandshakeError::Incomplete.error_code(), "incomplete_request");
        assert_eq!(
            HandshakeError::MissingKey.error_code(),
            "missing_key"
        );
    }
}
