//! Tokio session alias.
//!
//! # Example
//!
//! ```no_run
//! use nntp_session::runtime::tokio::NntpClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = NntpClient::connect("news.example.com:119").await?;
//!     let group = client.group("misc.test").await?;
//!     let records = client.overview(group.high.saturating_sub(100), group.high).await?;
//!     println!("{} overview records", records.len());
//!     client.quit().await?;
//!     Ok(())
//! }
//! ```

/// Session over [`TokioStream`](crate::runtime::stream::TokioStream).
///
/// See [`crate::net_client::NntpClient`] for the available operations.
pub type NntpClient = crate::net_client::NntpClient<crate::runtime::stream::TokioStream>;
