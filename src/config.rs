//! Session configuration.

/// Default number of bytes requested from the transport per read.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 4096;

/// Default upper bound on a single response line.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// Tunables for an [`NntpClient`](crate::net_client::NntpClient) session.
///
/// # Example
///
/// ```
/// use nntp_session::ClientConfig;
///
/// let config = ClientConfig::default()
///     .with_read_chunk_size(16 * 1024)
///     .with_xzver(false);
/// assert!(!config.try_xzver);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Bytes requested from the transport per read
    pub read_chunk_size: usize,
    /// Longest line accepted before the response is rejected as malformed
    pub max_line_length: usize,
    /// Whether overview retrieval may probe the XZVER extension
    pub try_xzver: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            try_xzver: true,
        }
    }
}

impl ClientConfig {
    /// Set the transport read size. Zero is treated as one byte.
    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size.max(1);
        self
    }

    /// Set the maximum accepted line length.
    pub fn with_max_line_length(mut self, length: usize) -> Self {
        self.max_line_length = length;
        self
    }

    /// Enable or disable the XZVER probe.
    pub fn with_xzver(mut self, enabled: bool) -> Self {
        self.try_xzver = enabled;
        self
    }
}
