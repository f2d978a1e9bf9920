//! Dot-terminated multi-line response bodies.
//!
//! A [`BodyReader`] streams one multi-line block off the session, one line
//! at a time, undoing dot-stuffing and stopping at the lone "." line. It
//! mutably borrows the session, so the session cannot be used while the
//! reader is alive; if the reader is dropped early the session drains the
//! rest of the block before it sends the next command.

use crate::net_client::NntpClient;
use crate::pipeline::ChunkSource;
use crate::response::{decode_text, trim_line_end};
use crate::runtime::AsyncStream;
use crate::Result;
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};

/// Line terminator handling for a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineMode {
    /// Text: CRLF is reduced to LF
    Text,
    /// Binary payload: line bytes are passed through untouched
    Binary,
}

/// Lazy, forward-only reader over one dot-terminated block.
pub struct BodyReader<'a, S: AsyncStream> {
    session: &'a mut NntpClient<S>,
    mode: LineMode,
    eof: bool,
}

impl<'a, S: AsyncStream> BodyReader<'a, S> {
    /// Start reading the block that follows the last status line.
    pub(crate) fn new(session: &'a mut NntpClient<S>, mode: LineMode) -> Self {
        session.client_mut().begin_body();
        Self {
            session,
            mode,
            eof: false,
        }
    }

    /// Next line of the body, terminator included, or `None` at the end.
    ///
    /// The "." line is consumed but never returned, and every later call
    /// returns `None` without touching the connection.
    pub async fn next_line(&mut self) -> Result<Option<Bytes>> {
        if self.eof {
            return Ok(None);
        }
        let raw = self.session.read_line().await?;
        if is_terminator(&raw) {
            self.eof = true;
            self.session.client_mut().end_body();
            return Ok(None);
        }
        let line = match self.mode {
            LineMode::Text => normalize_crlf(raw),
            LineMode::Binary => raw,
        };
        if line.starts_with(b"..") {
            Ok(Some(line.slice(1..)))
        } else {
            Ok(Some(line))
        }
    }

    /// Collect the remaining body.
    pub async fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(line) = self.next_line().await? {
            out.extend_from_slice(&line);
        }
        Ok(out)
    }

    /// Collect the remaining body as text lines without terminators.
    pub async fn read_lines(&mut self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        while let Some(line) = self.next_line().await? {
            lines.push(trim_line_end(&decode_text(&line)).to_string());
        }
        Ok(lines)
    }

    /// Collect the remaining body as text, decoded and LF separated.
    pub async fn read_to_string(&mut self) -> Result<String> {
        Ok(decode_text(&self.read_to_end().await?))
    }

    /// Read and drop everything up to the terminator.
    pub async fn discard(&mut self) -> Result<()> {
        while self.next_line().await?.is_some() {}
        Ok(())
    }

    /// Whether the terminator has been read.
    pub fn is_finished(&self) -> bool {
        self.eof
    }
}

#[async_trait]
impl<'a, S: AsyncStream> ChunkSource for BodyReader<'a, S> {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        self.next_line().await
    }
}

fn is_terminator(line: &[u8]) -> bool {
    line == b".\r\n" || line == b".\n"
}

fn normalize_crlf(line: Bytes) -> Bytes {
    if line.ends_with(b"\r\n") {
        let mut out = BytesMut::with_capacity(line.len() - 1);
        out.put_slice(&line[..line.len() - 2]);
        out.put_u8(b'\n');
        out.freeze()
    } else {
        line
    }
}
