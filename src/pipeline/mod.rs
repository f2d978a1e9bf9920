//! Pull-based decoding stages for compressed multi-line responses.
//!
//! Every stage implements [`ChunkSource`] and wraps another one, so a
//! decoder chain is assembled per response:
//!
//! - `[COMPRESS=GZIP]` blocks: [`BodyReader`](crate::body::BodyReader)
//!   (binary) → [`Inflate::zlib_or_gzip`] → [`LineSplitter`]
//! - XZVER blocks: [`BodyReader`](crate::body::BodyReader) (text) →
//!   [`YencDecoder`] → [`Inflate::raw`] → [`LineSplitter`]
//!
//! Stages that can detect trailing garbage or checksum errors expose a
//! consuming `finish` which drains the stage and hands back its source.

mod inflate;
mod yenc;

pub use inflate::Inflate;
pub use yenc::YencDecoder;

use crate::Result;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};

/// A source of byte chunks that ends with `None`.
#[async_trait]
pub trait ChunkSource: Send {
    /// Produce the next chunk, or `None` once the source is exhausted.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>>;
}

#[async_trait]
impl<T: ChunkSource + ?Sized> ChunkSource for &mut T {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        (**self).next_chunk().await
    }
}

/// Re-chunks a byte stream into LF-terminated lines.
///
/// A final line without terminator is returned as is.
pub struct LineSplitter<Src> {
    source: Src,
    buffer: BytesMut,
    eof: bool,
}

impl<Src: ChunkSource> LineSplitter<Src> {
    /// Split the chunks of `source` into lines.
    pub fn new(source: Src) -> Self {
        Self {
            source,
            buffer: BytesMut::new(),
            eof: false,
        }
    }

    /// Give back the wrapped source, dropping any buffered partial line.
    pub fn into_inner(self) -> Src {
        self.source
    }
}

#[async_trait]
impl<Src: ChunkSource> ChunkSource for LineSplitter<Src> {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                return Ok(Some(self.buffer.split_to(pos + 1).freeze()));
            }
            if self.eof {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.buffer.split().freeze()));
            }
            match self.source.next_chunk().await? {
                Some(chunk) => self.buffer.extend_from_slice(&chunk),
                None => self.eof = true,
            }
        }
    }
}
