//! async-std session alias.
//!
//! # Example
//!
//! ```no_run
//! use nntp_session::runtime::async_std::NntpClient;
//!
//! #[async_std::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = NntpClient::connect("news.example.com:119").await?;
//!     for line in client.capabilities().await? {
//!         println!("{line}");
//!     }
//!     client.quit().await?;
//!     Ok(())
//! }
//! ```

/// Session over [`AsyncStdStream`](crate::runtime::stream::AsyncStdStream).
///
/// See [`crate::net_client::NntpClient`] for the available operations.
pub type NntpClient = crate::net_client::NntpClient<crate::runtime::stream::AsyncStdStream>;
