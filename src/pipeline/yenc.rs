//! yEnc unframing stage.

use super::ChunkSource;
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use crc32fast::Hasher;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    WaitingForHeader,
    Decoding,
    Finished,
}

/// Strips yEnc framing from a line source and yields the decoded bytes.
///
/// Lines before `=ybegin` are skipped. Decoding stops at `=yend`, whose
/// `size` and `pcrc32` (or `crc32`) fields are checked against what was
/// decoded.
pub struct YencDecoder<Src> {
    source: Src,
    state: DecoderState,
    buffer: BytesMut,
    escaped: bool,
    begin_size: Option<u64>,
    multipart: bool,
    decoded: u64,
    crc: Hasher,
}

impl<Src: ChunkSource> YencDecoder<Src> {
    /// Decode the yEnc block carried by `source`.
    pub fn new(source: Src) -> Self {
        Self {
            source,
            state: DecoderState::WaitingForHeader,
            buffer: BytesMut::new(),
            escaped: false,
            begin_size: None,
            multipart: false,
            decoded: 0,
            crc: Hasher::new(),
        }
    }

    /// Read through `=yend` if not already there and give back the source,
    /// positioned just after the trailer line.
    pub async fn finish(mut self) -> Result<Src> {
        while self.next_chunk().await?.is_some() {}
        if !self.buffer.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(Error::Yenc("unexpected data after =yend".to_string()));
        }
        Ok(self.source)
    }

    /// Next complete line, or `None` when the source ran dry. A final line
    /// without terminator is still returned.
    async fn next_line(&mut self) -> Result<Option<Bytes>> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                return Ok(Some(self.buffer.split_to(pos + 1).freeze()));
            }
            match self.source.next_chunk().await? {
                Some(chunk) => self.buffer.extend_from_slice(&chunk),
                None if self.buffer.is_empty() => return Ok(None),
                None => return Ok(Some(self.buffer.split().freeze())),
            }
        }
    }

    fn begin(&mut self, line: &[u8]) -> Result<()> {
        self.begin_size = keyword(line, "size")
            .map(|value| parse_decimal("size", value))
            .transpose()?;
        self.multipart = keyword(line, "part").is_some();
        trace!(size = ?self.begin_size, "yEnc block started");
        Ok(())
    }

    fn end(&mut self, line: &[u8]) -> Result<()> {
        let size = match keyword(line, "size") {
            Some(value) => Some(parse_decimal("size", value)?),
            None if !self.multipart => self.begin_size,
            None => None,
        };
        if let Some(size) = size {
            if size != self.decoded {
                return Err(Error::Yenc(format!(
                    "size mismatch: expected {size}, decoded {}",
                    self.decoded
                )));
            }
        }

        let expected = keyword(line, "pcrc32")
            .or_else(|| keyword(line, "crc32"))
            .map(parse_crc)
            .transpose()?;
        let actual = std::mem::take(&mut self.crc).finalize();
        if let Some(expected) = expected {
            if expected != actual {
                return Err(Error::Yenc(format!(
                    "CRC mismatch: expected {expected:08x}, got {actual:08x}"
                )));
            }
        }
        trace!(decoded = self.decoded, "yEnc block ended");
        Ok(())
    }

    fn decode_line(&mut self, line: &[u8]) -> Bytes {
        let mut out = Vec::with_capacity(line.len());
        for &b in line {
            match b {
                b'\r' | b'\n' => {}
                b'=' if !self.escaped => self.escaped = true,
                _ if self.escaped => {
                    out.push(b.wrapping_sub(106));
                    self.escaped = false;
                }
                _ => out.push(b.wrapping_sub(42)),
            }
        }
        self.crc.update(&out);
        self.decoded += out.len() as u64;
        Bytes::from(out)
    }
}

#[async_trait]
impl<Src: ChunkSource> ChunkSource for YencDecoder<Src> {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        loop {
            if self.state == DecoderState::Finished {
                return Ok(None);
            }
            let Some(line) = self.next_line().await? else {
                let missing = match self.state {
                    DecoderState::WaitingForHeader => "=ybegin",
                    _ => "=yend",
                };
                return Err(Error::Yenc(format!("missing {missing} line")));
            };
            match self.state {
                DecoderState::WaitingForHeader => {
                    if line.starts_with(b"=ybegin ") {
                        self.begin(&line)?;
                        self.state = DecoderState::Decoding;
                    }
                }
                DecoderState::Decoding => {
                    if line.starts_with(b"=ypart ") {
                        continue;
                    }
                    if line.starts_with(b"=yend") && !self.escaped {
                        self.end(&line)?;
                        self.state = DecoderState::Finished;
                        return Ok(None);
                    }
                    let decoded = self.decode_line(&line);
                    if !decoded.is_empty() {
                        return Ok(Some(decoded));
                    }
                }
                DecoderState::Finished => return Ok(None),
            }
        }
    }
}

/// Value of `name=` in a yEnc header or trailer line. `name=` runs to the
/// end of the line and is never looked up.
fn keyword<'l>(line: &'l [u8], key: &str) -> Option<&'l str> {
    let text = std::str::from_utf8(line).ok()?;
    text.split_ascii_whitespace()
        .skip(1)
        .find_map(|token| token.strip_prefix(key)?.strip_prefix('='))
}

fn parse_decimal(field: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| Error::Yenc(format!("invalid {field} value: {value}")))
}

fn parse_crc(value: &str) -> Result<u32> {
    u32::from_str_radix(value, 16).map_err(|_| Error::Yenc(format!("invalid CRC value: {value}")))
}
