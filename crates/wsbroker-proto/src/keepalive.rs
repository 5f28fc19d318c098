//! Explicit Ping -> Pong keepalive reply.
//!
//! `tokio-tungstenite` answers a `Ping` with an auto-queued `Pong` only when
//! the same stream half does both the reading and the writing. A caller
//! that splits the stream into independent read/write halves (as
//! `wsbroker`'s event loop does, to multiplex many connections on one task)
//! loses that shortcut: the auto-queued `Pong` sits in the read half's
//! internal buffer with nothing to flush it. This function makes the
//! RFC 6455 §5.5.3 requirement ("A Pong frame sent in response to a Ping
//! frame must have identical application data") an explicit step the caller
//! performs itself over whichever half it actually writes through.

use tokio_tungstenite::tungstenite::Message;

/// Builds the `Pong` reply for a received `Ping`, carrying the same payload.
pub fn pong_for(ping_payload: Vec<u8>) -> Message {
    Message::Pong(ping_payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pong_carries_the_same_payload_as_the_ping() {
        let reply = pong_for(b"hello".to_vec());
        assert_eq!(reply, Message::Pong(b"hello".to_vec()));
    }

    #[test]
    fn pong_for_an_empty_ping_is_an_empty_pong() {
        let reply = pong_for(Vec::new());
        assert_eq!(reply, Message::Pong(Vec::new()));
    }
}
