//! Sans-IO NNTP session state.
//!
//! [`Client`] owns everything about a session that does not need a socket:
//! the receive buffer and line framing, whether a multi-line body is still
//! unread on the wire, whether QUIT has been sent, and the per-connection
//! capability flags learned by overview negotiation.

use crate::config::ClientConfig;
use crate::{Command, Error, Result};
use bytes::{BufMut, Bytes, BytesMut};

/// Sans-IO NNTP client.
///
/// This client handles protocol logic without performing any I/O operations.
/// [`NntpClient`](crate::net_client::NntpClient) drives it over a stream.
pub struct Client {
    read_buffer: BytesMut,
    state: ClientState,
    body_pending: bool,
    quirks: Quirks,
    max_line_length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ClientState {
    /// Commands may be sent
    Ready,
    /// QUIT was sent
    Closed,
}

/// Per-connection knowledge about the XZVER extension.
///
/// Both flags start false. A failed XZVER attempt sets
/// `xzver_unsupported`, a successful one `xzver_supported`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Quirks {
    /// XZVER was tried on this connection and refused
    pub xzver_unsupported: bool,
    /// XZVER was tried on this connection and worked
    pub xzver_supported: bool,
}

impl Quirks {
    /// Whether the next overview request should try XZVER first.
    pub fn should_try_xzver(&self) -> bool {
        !self.xzver_unsupported || self.xzver_supported
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Create a new NNTP client instance.
    pub fn new() -> Self {
        Self::with_config(&ClientConfig::default())
    }

    /// Create a client using the limits in `config`.
    pub fn with_config(config: &ClientConfig) -> Self {
        Self {
            read_buffer: BytesMut::new(),
            state: ClientState::Ready,
            body_pending: false,
            quirks: Quirks {
                xzver_unsupported: !config.try_xzver,
                xzver_supported: false,
            },
            max_line_length: config.max_line_length,
        }
    }

    /// Encode a command for transmission to the server.
    ///
    /// Fails with [`Error::Closed`] once QUIT has been encoded, and refuses
    /// to run while a multi-line body is still unread.
    pub fn encode_command(&mut self, command: &Command) -> Result<Bytes> {
        self.ensure_open()?;
        if self.body_pending {
            return Err(Error::Protocol(
                "previous response body has not been drained".to_string(),
            ));
        }
        let bytes = command.encode()?;
        if matches!(command, Command::Quit) {
            self.state = ClientState::Closed;
        }
        Ok(Bytes::from(bytes))
    }

    /// Fail with [`Error::Closed`] if QUIT has been sent.
    pub fn ensure_open(&self) -> Result<()> {
        if self.state == ClientState::Closed {
            return Err(Error::Closed);
        }
        Ok(())
    }

    /// Enter the closed state without sending anything.
    pub fn close(&mut self) {
        self.state = ClientState::Closed;
        self.body_pending = false;
    }

    /// Feed received data from the server into the client.
    ///
    /// Call this method with data received from the network connection.
    pub fn feed_bytes(&mut self, data: &[u8]) {
        self.read_buffer.put_slice(data);
    }

    /// Take one complete line, terminator included, from the buffer.
    ///
    /// Returns `Ok(None)` if more data is needed, or a protocol error when
    /// the buffered partial line has grown past the configured limit.
    pub fn take_line(&mut self) -> Result<Option<Bytes>> {
        match self.read_buffer.iter().position(|&b| b == b'\n') {
            Some(pos) => Ok(Some(self.read_buffer.split_to(pos + 1).freeze())),
            None if self.read_buffer.len() > self.max_line_length => Err(Error::Protocol(
                format!("line exceeds {} bytes", self.max_line_length),
            )),
            None => Ok(None),
        }
    }

    /// Number of received bytes not yet consumed.
    pub fn buffered(&self) -> usize {
        self.read_buffer.len()
    }

    /// Record that a multi-line body follows the last status line.
    pub fn begin_body(&mut self) {
        self.body_pending = true;
    }

    /// Record that the body terminator has been consumed.
    pub fn end_body(&mut self) {
        self.body_pending = false;
    }

    /// Whether a body is still unread on the wire.
    pub fn body_pending(&self) -> bool {
        self.body_pending
    }

    /// Capability flags for this connection.
    pub fn quirks(&self) -> Quirks {
        self.quirks
    }

    /// Mutable capability flags for this connection.
    pub fn quirks_mut(&mut self) -> &mut Quirks {
        &mut self.quirks
    }

    /// Get the current client state.
    pub fn state(&self) -> &str {
        match self.state {
            ClientState::Ready if self.body_pending => "body_pending",
            ClientState::Ready => "ready",
            ClientState::Closed => "closed",
        }
    }

    /// Check if the client is ready to send commands.
    pub fn is_ready(&self) -> bool {
        self.state == ClientState::Ready && !self.body_pending
    }

    /// Check if QUIT has been sent.
    pub fn is_closed(&self) -> bool {
        self.state == ClientState::Closed
    }
}
