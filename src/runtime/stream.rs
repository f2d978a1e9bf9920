//! The byte stream a session runs over.
//!
//! Each runtime has a feature-gated TCP newtype implementing [`AsyncStream`].
//!
//! # Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "tokio-runtime")]
//! # {
//! use nntp_session::runtime::stream::{AsyncStream, TokioStream};
//!
//! # #[tokio::main]
//! # async fn main() -> std::io::Result<()> {
//! let mut stream = TokioStream::connect("news.example.com:119").await?;
//! stream.write_all(b"DATE\r\n").await?;
//! let mut buf = [0u8; 1024];
//! let n = stream.read(&mut buf).await?;
//! # Ok(())
//! # }
//! # }
//! ```

use async_trait::async_trait;

/// Minimal async byte stream used by [`NntpClient`](crate::net_client::NntpClient).
///
/// Implementations must be `Send + Unpin + 'static` so sessions and their
/// decoder pipelines can move between tasks.
#[async_trait]
pub trait AsyncStream: Send + Unpin + 'static {
    /// Connect to `addr` ("host:port").
    ///
    /// Streams that cannot dial, like pre-established TLS wrappers, return
    /// an `Unsupported` error and are used through `from_stream`.
    async fn connect(addr: &str) -> std::io::Result<Self>
    where
        Self: Sized;

    /// Read into `buf`, returning the byte count. `Ok(0)` means the peer
    /// closed the connection.
    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;

    /// Write all of `buf`.
    async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()>;

    /// Close the write half after QUIT.
    async fn shutdown(&mut self) -> std::io::Result<()>;
}

/// TCP transport for tokio.
#[cfg(feature = "tokio-runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio-runtime")))]
pub struct TokioStream(pub tokio::net::TcpStream);

#[cfg(feature = "tokio-runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio-runtime")))]
#[async_trait]
impl AsyncStream for TokioStream {
    async fn connect(addr: &str) -> std::io::Result<Self>
    where
        Self: Sized,
    {
        let stream = tokio::net::TcpStream::connect(addr).await?;
        Ok(TokioStream(stream))
    }

    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        use tokio::io::AsyncReadExt;
        self.0.read(buf).await
    }

    async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        tokio::io::AsyncWriteExt::write_all(&mut self.0, buf).await
    }

    async fn shutdown(&mut self) -> std::io::Result<()> {
        tokio::io::AsyncWriteExt::shutdown(&mut self.0).await
    }
}

/// TCP transport for async-std.
#[cfg(feature = "async-std-runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "async-std-runtime")))]
pub struct AsyncStdStream(pub async_std::net::TcpStream);

#[cfg(feature = "async-std-runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "async-std-runtime")))]
#[async_trait]
impl AsyncStream for AsyncStdStream {
    async fn connect(addr: &str) -> std::io::Result<Self>
    where
        Self: Sized,
    {
        let stream = async_std::net::TcpStream::connect(addr).await?;
        Ok(AsyncStdStream(stream))
    }

    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        async_std::io::ReadExt::read(&mut self.0, buf).await
    }

    async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        async_std::io::WriteExt::write_all(&mut self.0, buf).await
    }

    async fn shutdown(&mut self) -> std::io::Result<()> {
        self.0.shutdown(std::net::Shutdown::Write)?;
        Ok(())
    }
}

/// TCP transport for smol.
#[cfg(feature = "smol-runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "smol-runtime")))]
pub struct SmolStream(pub smol::net::TcpStream);

#[cfg(feature = "smol-runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "smol-runtime")))]
#[async_trait]
impl AsyncStream for SmolStream {
    async fn connect(addr: &str) -> std::io::Result<Self>
    where
        Self: Sized,
    {
        let stream = smol::net::TcpStream::connect(addr).await?;
        Ok(SmolStream(stream))
    }

    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        use smol::io::AsyncReadExt;
        self.0.read(buf).await
    }

    async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        smol::io::AsyncWriteExt::write_all(&mut self.0, buf).await
    }

    async fn shutdown(&mut self) -> std::io::Result<()> {
        smol::io::AsyncWriteExt::close(&mut self.0).await
    }
}
