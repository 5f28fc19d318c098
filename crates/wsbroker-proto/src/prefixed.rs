//! Replays bytes consumed while hand-parsing the HTTP header block back in
//! front of the underlying stream, so the upgraded `WebSocketStream` sees a
//! contiguous byte sequence starting right after the header terminator.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// An `AsyncRead`/`AsyncWrite` wrapper that serves a leftover buffer first,
/// then falls through to the inner stream.
pub struct Prefixed<S> {
    leftover: BytesMut,
    inner: S,
}

impl<S> Prefixed<S> {
    pub fn new(inner: S, leftover: BytesMut) -> Self {
        Self { leftover, inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for Prefixed<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        if !self.leftover.is_empty() {
            let n = std::cmp::min(self.leftover.len(), buf.remaining());
            let chunk = self.leftover.split_to(n);
            buf.put_slice(&chunk);
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Prefixed<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn serves_leftover_before_inner() {
        let inner = tokio_test::io::Builder::new().read(b" world").build();
        let mut prefixed = Prefixed::new(inner, BytesMut::from(&b"hello"[..]));

        let mut out = [0u8; 11];
        prefixed.read_exact(&mut out[..5]).await.unwrap();
        assert_eq!(&out[..5], b"hello");
        prefixed.read_exact(&mut out[5..]).await.unwrap();
        assert_eq!(&out, b"hello world");
    }
}
