//! Padded buffer contract for broadcast payloads.
//!
//! `PRE_PADDING`/`POST_PADDING` are part of the stable ABI: the framing
//! layer may prepend a header or append a trailer in place during
//! downstream writes, so every payload buffer reserves this slack.

use bytes::BytesMut;

pub const PRE_PADDING: usize = 16;
pub const POST_PADDING: usize = 16;

/// A payload buffer with `PRE_PADDING` bytes of writable slack before the
/// payload and `POST_PADDING` bytes after.
#[derive(Debug, Clone)]
pub struct PaddedBuffer {
    storage: BytesMut,
    payload_len: usize,
}

impl PaddedBuffer {
    /// Allocates a padded buffer wrapping `payload`.
    pub fn new(payload: &[u8]) -> Self {
        let mut storage = BytesMut::with_capacity(PRE_PADDING + payload.len() + POST_PADDING);
        storage.resize(PRE_PADDING, 0);
        storage.extend_from_slice(payload);
        storage.resize(PRE_PADDING + payload.len() + POST_PADDING, 0);
        Self {
            storage,
            payload_len: payload.len(),
        }
    }

    /// The payload region, excluding pre/post padding.
    pub fn payload(&self) -> &[u8] {
        &self.storage[PRE_PADDING..PRE_PADDING + self.payload_len]
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        let end = PRE_PADDING + self.payload_len;
        &mut self.storage[PRE_PADDING..end]
    }

    pub fn pre_padding(&self) -> &[u8] {
        &self.storage[..PRE_PADDING]
    }

    pub fn post_padding(&self) -> &[u8] {
        &self.storage[PRE_PADDING + self.payload_len..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserves_pre_and_post_padding() {
        let buf = PaddedBuffer::new(b"hi");
        assert_eq!(buf.payload(), b"hi");
        assert_eq!(buf.pre_padding().len(), PRE_PADDING);
        assert_eq!(buf.post_padding().len(), POST_PADDING);
    }

    #[test]
    fn payload_mut_touches_only_the_payload_region() {
        let mut buf = PaddedBuffer::new(b"hi");
        buf.payload_mut()[0] = b'H';
        assert_eq!(buf.payload(), b"Hi");
        assert!(buf.pre_padding().iter().all(|&b| b == 0));
    }
}
