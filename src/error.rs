//! Error types for the NNTP client library.

use crate::response::GroupStatus;

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur when using the NNTP client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport failure, passed through unchanged
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed wire data from the server
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Well-formed response whose code did not match what the caller expected
    #[error("{code:03} {message}")]
    Status {
        /// Response code from server
        code: u16,
        /// Response text from server
        message: String,
    },

    /// The session was closed with QUIT
    #[error("Connection closed")]
    Closed,

    /// The server closed the connection in the middle of a response
    #[error("Connection lost: server closed the connection")]
    ConnectionLost,

    /// Connection could not be established
    #[error("Connection error: {0}")]
    Connection(String),

    /// Invalid command or parameters
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Group status line could not be parsed.
    ///
    /// Carries whatever was parsed before the failure, named after the
    /// group the caller asked for.
    #[error("Protocol error: bad group response: {line}")]
    GroupStatus {
        /// Partially populated status
        partial: Box<GroupStatus>,
        /// The offending status text
        line: String,
    },

    /// yEnc framing inside a compressed overview was broken
    #[error("yEnc error: {0}")]
    Yenc(String),

    /// A compressed block could not be inflated
    #[error("Decompression error: {0}")]
    Decompress(String),
}

impl Error {
    /// Creates a status error from a response code and text.
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }

    /// Response code carried by a status error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True for errors caused by malformed server data.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Self::Protocol(_) | Self::GroupStatus { .. } | Self::Yenc(_) | Self::Decompress(_)
        )
    }

    /// True when the server answered 500 (command not recognized).
    pub fn is_command_not_recognized(&self) -> bool {
        self.status_code() == Some(500)
    }

    /// True for 4xx status errors.
    pub fn is_transient(&self) -> bool {
        matches!(self.status_code(), Some(400..=499))
    }

    /// True for 5xx status errors.
    pub fn is_permanent(&self) -> bool {
        matches!(self.status_code(), Some(500..=599))
    }
}
