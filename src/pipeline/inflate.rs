//! DEFLATE decompression stage (raw, zlib or gzip wrapped).

use super::ChunkSource;
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::{Buf, Bytes, BytesMut};
use flate2::{Decompress, FlushDecompress, Status};
use tracing::trace;

const OUTPUT_CHUNK: usize = 16 * 1024;
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wrapper {
    /// Bare DEFLATE data
    Raw,
    /// zlib or gzip, decided by the first two bytes
    Detect,
    /// zlib header and Adler-32 trailer, checked by the decompressor
    Zlib,
    /// gzip header being read
    GzipHeader,
    /// gzip member body
    Gzip,
    /// gzip CRC-32 and size trailer being read
    GzipTrailer,
    /// Stream end reached
    Done,
}

/// Decompresses the chunks of its source.
///
/// Output ends when the compressed stream reports its end marker; a source
/// that runs dry before then is an error.
pub struct Inflate<Src> {
    source: Src,
    decompress: Decompress,
    wrapper: Wrapper,
    pending: BytesMut,
    crc: crc32fast::Hasher,
    starved: bool,
    tolerate_line_breaks: bool,
}

impl<Src: ChunkSource> Inflate<Src> {
    /// Bare DEFLATE, as carried inside XZVER's yEnc framing.
    pub fn raw(source: Src) -> Self {
        Self::with_wrapper(source, Wrapper::Raw, false)
    }

    /// zlib or gzip, as announced by `[COMPRESS=GZIP]`.
    ///
    /// Line breaks between the end of the compressed stream and the block
    /// terminator are accepted.
    pub fn zlib_or_gzip(source: Src) -> Self {
        Self::with_wrapper(source, Wrapper::Detect, true)
    }

    fn with_wrapper(source: Src, wrapper: Wrapper, tolerate_line_breaks: bool) -> Self {
        Self {
            source,
            decompress: Decompress::new(false),
            wrapper,
            pending: BytesMut::new(),
            crc: crc32fast::Hasher::new(),
            starved: false,
            tolerate_line_breaks,
        }
    }

    /// Drain remaining output, check that nothing but allowed padding
    /// follows the compressed stream, and give back the source.
    pub async fn finish(mut self) -> Result<Src> {
        while self.next_chunk().await?.is_some() {}
        self.check_trailing(&self.pending)?;
        while let Some(chunk) = self.source.next_chunk().await? {
            self.check_trailing(&chunk)?;
        }
        trace!(
            compressed = self.decompress.total_in(),
            decompressed = self.decompress.total_out(),
            "compressed stream released"
        );
        Ok(self.source)
    }

    fn check_trailing(&self, data: &[u8]) -> Result<()> {
        let allowed = |b: &u8| self.tolerate_line_breaks && matches!(b, b'\r' | b'\n');
        if data.iter().all(allowed) {
            Ok(())
        } else {
            Err(Error::Decompress(
                "unexpected data after compressed stream".to_string(),
            ))
        }
    }

    /// Pull one more chunk from the source into the pending buffer.
    async fn fill(&mut self) -> Result<()> {
        match self.source.next_chunk().await? {
            Some(chunk) => {
                self.pending.extend_from_slice(&chunk);
                Ok(())
            }
            None => Err(Error::Decompress("compressed stream truncated".to_string())),
        }
    }

    /// Run the decompressor over the pending input. `Ok(None)` means more
    /// input is needed or the stream just ended.
    fn inflate_pending(&mut self) -> Result<Option<Bytes>> {
        let mut out = Vec::with_capacity(OUTPUT_CHUNK);
        let before = self.decompress.total_in();
        let status = self
            .decompress
            .decompress_vec(&self.pending, &mut out, FlushDecompress::None)
            .map_err(|e| Error::Decompress(e.to_string()))?;
        let consumed = (self.decompress.total_in() - before) as usize;
        self.pending.advance(consumed);

        if self.wrapper == Wrapper::Gzip {
            self.crc.update(&out);
        }
        if status == Status::StreamEnd {
            self.wrapper = match self.wrapper {
                Wrapper::Gzip => Wrapper::GzipTrailer,
                _ => Wrapper::Done,
            };
        }
        self.starved = consumed == 0 && out.is_empty();
        Ok((!out.is_empty()).then(|| Bytes::from(out)))
    }

    fn check_gzip_trailer(&mut self) -> Result<()> {
        let trailer = self.pending.split_to(8);
        let crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        let size = u32::from_le_bytes([trailer[4], trailer[5], trailer[6], trailer[7]]);
        let actual = std::mem::take(&mut self.crc).finalize();
        if crc != actual {
            return Err(Error::Decompress(format!(
                "gzip CRC mismatch: expected {crc:08x}, got {actual:08x}"
            )));
        }
        if size != self.decompress.total_out() as u32 {
            return Err(Error::Decompress("gzip size mismatch".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl<Src: ChunkSource> ChunkSource for Inflate<Src> {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        loop {
            match self.wrapper {
                Wrapper::Done => return Ok(None),
                Wrapper::Detect => {
                    if self.pending.len() < 2 {
                        self.fill().await?;
                        continue;
                    }
                    if self.pending[..2] == GZIP_MAGIC {
                        self.wrapper = Wrapper::GzipHeader;
                    } else {
                        self.decompress = Decompress::new(true);
                        self.wrapper = Wrapper::Zlib;
                    }
                }
                Wrapper::GzipHeader => match gzip_header_len(&self.pending)? {
                    Some(len) => {
                        self.pending.advance(len);
                        self.wrapper = Wrapper::Gzip;
                    }
                    None => self.fill().await?,
                },
                Wrapper::GzipTrailer => {
                    if self.pending.len() < 8 {
                        self.fill().await?;
                        continue;
                    }
                    self.check_gzip_trailer()?;
                    self.wrapper = Wrapper::Done;
                }
                Wrapper::Raw | Wrapper::Zlib | Wrapper::Gzip => {
                    if self.pending.is_empty() || self.starved {
                        self.starved = false;
                        self.fill().await?;
                        continue;
                    }
                    if let Some(out) = self.inflate_pending()? {
                        return Ok(Some(out));
                    }
                    if self.wrapper == Wrapper::Done {
                        return Ok(None);
                    }
                }
            }
        }
    }
}

/// Length of the gzip member header at the start of `data`, or `None` if
/// more bytes are needed (RFC 1952 section 2.3).
fn gzip_header_len(data: &[u8]) -> Result<Option<usize>> {
    const FHCRC: u8 = 0x02;
    const FEXTRA: u8 = 0x04;
    const FNAME: u8 = 0x08;
    const FCOMMENT: u8 = 0x10;

    if data.len() < 10 {
        return Ok(None);
    }
    if data[..2] != GZIP_MAGIC || data[2] != 8 {
        return Err(Error::Decompress("invalid gzip header".to_string()));
    }
    let flags = data[3];
    let mut pos = 10;
    if flags & FEXTRA != 0 {
        if data.len() < pos + 2 {
            return Ok(None);
        }
        pos += 2 + u16::from_le_bytes([data[pos], data[pos + 1]]) as usize;
    }
    for flag in [FNAME, FCOMMENT] {
        if flags & flag != 0 {
            match data.get(pos..).and_then(|rest| rest.iter().position(|&b| b == 0)) {
                Some(nul) => pos += nul + 1,
                None => return Ok(None),
            }
        }
    }
    if flags & FHCRC != 0 {
        pos += 2;
    }
    Ok((data.len() >= pos).then_some(pos))
}
