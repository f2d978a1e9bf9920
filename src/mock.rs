//! Scripted in-memory NNTP server for tests.
//!
//! [`MockStream`] implements [`AsyncStream`] and plays back a script of
//! expected command lines and canned responses. A [`MockHandle`] kept by
//! the test inspects what the client wrote after the stream has been moved
//! into a session.
//!
//! ```
//! use nntp_session::mock::MockStream;
//! use nntp_session::net_client::NntpClient;
//!
//! # tokio_test_block_on(async {
//! let stream = MockStream::new()
//!     .greeting("200 news.example.com ready")
//!     .expect("DATE", "111 20240315123456\r\n");
//! let handle = stream.handle();
//! let mut client = NntpClient::from_stream(stream).await?;
//! let date = client.date().await?;
//! assert_eq!(date.to_rfc3339(), "2024-03-15T12:34:56+00:00");
//! assert_eq!(handle.written(), ["DATE"]);
//! # Ok::<(), nntp_session::Error>(())
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use crate::runtime::AsyncStream;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug)]
enum Step {
    /// Bytes the server sends without being asked
    Send(Vec<u8>),
    /// A command line the client must send, and the reply to it
    Expect { command: String, reply: Vec<u8> },
    /// Swallow lines up to a lone "." and then reply
    Absorb { reply: Vec<u8> },
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<Step>,
    incoming: Vec<u8>,
    outgoing: VecDeque<u8>,
    written: Vec<String>,
    read_limit: Option<usize>,
    reads: usize,
    shutdowns: usize,
}

impl MockState {
    fn flush_unsolicited(&mut self) {
        while let Some(Step::Send(_)) = self.script.front() {
            if let Some(Step::Send(bytes)) = self.script.pop_front() {
                self.outgoing.extend(bytes);
            }
        }
    }

    fn handle_line(&mut self, line: String) -> io::Result<()> {
        self.written.push(line.clone());
        match self.script.pop_front() {
            Some(Step::Expect { command, reply }) => {
                if line != command {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("expected command {command:?}, got {line:?}"),
                    ));
                }
                self.outgoing.extend(reply);
            }
            Some(Step::Absorb { reply }) => {
                if line == "." {
                    self.outgoing.extend(reply);
                } else {
                    self.script.push_front(Step::Absorb { reply });
                }
            }
            Some(step @ Step::Send(_)) => {
                self.script.push_front(step);
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("client wrote {line:?} while the server was still talking"),
                ));
            }
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unexpected command after end of script: {line:?}"),
                ))
            }
        }
        self.flush_unsolicited();
        Ok(())
    }
}

/// In-memory stream that answers a fixed script.
#[derive(Debug, Default)]
pub struct MockStream {
    state: Arc<Mutex<MockState>>,
}

/// Observer for a [`MockStream`] that has been handed to a session.
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockStream {
    /// Empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Send a greeting status line, CRLF appended.
    pub fn greeting(self, line: &str) -> Self {
        self.send(format!("{line}\r\n"))
    }

    /// Send raw bytes without waiting for a command.
    pub fn send(self, bytes: impl Into<Vec<u8>>) -> Self {
        lock(&self.state).script.push_back(Step::Send(bytes.into()));
        self
    }

    /// Expect `command` (without CRLF) and answer with raw `reply` bytes.
    pub fn expect(self, command: &str, reply: impl Into<Vec<u8>>) -> Self {
        lock(&self.state).script.push_back(Step::Expect {
            command: command.to_string(),
            reply: reply.into(),
        });
        self
    }

    /// Read an article payload up to its "." line, then answer with `reply`.
    pub fn absorb_article(self, reply: impl Into<Vec<u8>>) -> Self {
        lock(&self.state)
            .script
            .push_back(Step::Absorb { reply: reply.into() });
        self
    }

    /// Hand out at most `limit` bytes per read, to exercise buffering.
    pub fn with_read_limit(self, limit: usize) -> Self {
        lock(&self.state).read_limit = Some(limit.max(1));
        self
    }

    /// Handle for inspecting the exchange later.
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl MockHandle {
    /// Every line the client wrote, without CRLF, in order.
    pub fn written(&self) -> Vec<String> {
        lock(&self.state).written.clone()
    }

    /// Lines written that start with `verb`.
    pub fn commands_starting_with(&self, verb: &str) -> Vec<String> {
        lock(&self.state)
            .written
            .iter()
            .filter(|line| line.starts_with(verb))
            .cloned()
            .collect()
    }

    /// Whether every scripted step has been played.
    pub fn is_finished(&self) -> bool {
        let state = lock(&self.state);
        state.script.is_empty() && state.outgoing.is_empty()
    }

    /// Response bytes not yet read by the client.
    pub fn unread(&self) -> usize {
        lock(&self.state).outgoing.len()
    }

    /// Number of reads the client performed.
    pub fn reads(&self) -> usize {
        lock(&self.state).reads
    }

    /// Whether the client shut the stream down.
    pub fn is_shutdown(&self) -> bool {
        lock(&self.state).shutdowns > 0
    }

    /// Number of `shutdown` calls seen.
    pub fn shutdowns(&self) -> usize {
        lock(&self.state).shutdowns
    }
}

#[async_trait]
impl AsyncStream for MockStream {
    async fn connect(addr: &str) -> io::Result<Self>
    where
        Self: Sized,
    {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("mock stream cannot dial {addr}"),
        ))
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = lock(&self.state);
        state.flush_unsolicited();
        state.reads += 1;
        let limit = state.read_limit.unwrap_or(usize::MAX).min(buf.len());
        let n = limit.min(state.outgoing.len());
        for (slot, byte) in buf.iter_mut().zip(state.outgoing.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let mut state = lock(&self.state);
        if state.shutdowns > 0 {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "stream shut down"));
        }
        state.incoming.extend_from_slice(buf);
        while let Some(pos) = state.incoming.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = state.incoming.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw)
                .trim_end_matches(['\r', '\n'])
                .to_string();
            state.handle_line(line)?;
        }
        Ok(())
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        lock(&self.state).shutdowns += 1;
        Ok(())
    }
}

/// Wire fixture builders for multi-line responses.
pub mod encode {
    use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
    use flate2::Compression;
    use std::io::Write;

    /// Status line plus text lines, dot-stuffed and terminated by ".".
    pub fn dot_block(status: &str, lines: &[&str]) -> Vec<u8> {
        let mut out = format!("{status}\r\n").into_bytes();
        for line in lines {
            if line.starts_with('.') {
                out.push(b'.');
            }
            out.extend_from_slice(line.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b".\r\n");
        out
    }

    /// Status line plus zlib-compressed `lines`, framed as a binary block.
    pub fn zlib_block(status: &str, lines: &[&str]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        compress(&mut encoder, lines);
        frame_binary(status, &finish(encoder.finish()))
    }

    /// Status line plus gzip-compressed `lines`, framed as a binary block.
    pub fn gzip_block(status: &str, lines: &[&str]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        compress(&mut encoder, lines);
        frame_binary(status, &finish(encoder.finish()))
    }

    /// Status line plus `lines` deflated, yEnc encoded and dot terminated,
    /// the way XZVER answers.
    pub fn yenc_deflate_block(status: &str, lines: &[&str]) -> Vec<u8> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        compress(&mut encoder, lines);
        let data = finish(encoder.finish());

        let mut out = format!("{status}\r\n").into_bytes();
        out.extend_from_slice(
            format!("=ybegin line=128 size={} name=xzver\r\n", data.len()).as_bytes(),
        );
        for chunk in data.chunks(128) {
            let encoded = yenc_line(chunk);
            if encoded.first() == Some(&b'.') {
                out.push(b'.');
            }
            out.extend_from_slice(&encoded);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(
            format!(
                "=yend size={} crc32={:08x}\r\n",
                data.len(),
                crc32fast::hash(&data)
            )
            .as_bytes(),
        );
        out.extend_from_slice(b".\r\n");
        out
    }

    fn compress<W: Write>(encoder: &mut W, lines: &[&str]) {
        for line in lines {
            // Writing into a Vec cannot fail.
            let _ = encoder.write_all(line.as_bytes());
            let _ = encoder.write_all(b"\r\n");
        }
    }

    fn finish(result: std::io::Result<Vec<u8>>) -> Vec<u8> {
        result.unwrap_or_default()
    }

    fn frame_binary(status: &str, data: &[u8]) -> Vec<u8> {
        let mut out = format!("{status}\r\n").into_bytes();
        for piece in data.split_inclusive(|&b| b == b'\n') {
            if piece.first() == Some(&b'.') {
                out.push(b'.');
            }
            out.extend_from_slice(piece);
        }
        out.extend_from_slice(b"\r\n.\r\n");
        out
    }

    fn yenc_line(data: &[u8]) -> Vec<u8> {
        let mut line = Vec::with_capacity(data.len() + data.len() / 16);
        for &byte in data {
            let c = byte.wrapping_add(42);
            if matches!(c, 0 | b'\n' | b'\r' | b'=') {
                line.push(b'=');
                line.push(c.wrapping_add(64));
            } else {
                line.push(c);
            }
        }
        line
    }
}
