//! Body buffering.
//!
//! # Responsibilities
//! - Accumulate body chunks in arrival order
//! - Expose the concatenated bytes only after end-of-stream
//!
//! # Design Decisions
//! - No size limit is enforced here; memory cost is O(body size)
//! - `finish` consumes the buffer, so a partially filled buffer is never readable

use bytes::{Buf, BufMut, Bytes, BytesMut};
use http_body_util::BodyExt;
use hyper::body::Body;

/// Accumulates a byte sequence from a stream of chunks.
#[derive(Debug, Default)]
pub struct BodyBuffer {
    buf: BytesMut,
    chunks: usize,
}

impl BodyBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one chunk.
    pub fn push(&mut self, chunk: impl Buf) {
        self.buf.put(chunk);
        self.chunks += 1;
    }

    /// Number of bytes received so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Number of chunks received so far.
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    /// Close the buffer and return the complete, immutable body.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Read an HTTP body to its end through a [`BodyBuffer`].
///
/// Trailers are discarded.
pub async fn read_to_end<B>(body: B) -> Result<Bytes, B::Error>
where
    B: Body,
{
    let mut body = std::pin::pin!(body);
    let mut buffer = BodyBuffer::new();

    while let Some(frame) = body.frame().await {
        if let Ok(data) = frame?.into_data() {
            buffer.push(data);
        }
    }

    tracing::trace!(bytes = buffer.len(), chunks = buffer.chunks(), "Body buffered");
    Ok(buffer.finish())
}
