//! smol session alias.
//!
//! # Example
//!
//! ```no_run
//! use nntp_session::runtime::smol::NntpClient;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     smol::block_on(async {
//!         let mut client = NntpClient::connect("news.example.com:119").await?;
//!         let date = client.date().await?;
//!         println!("server time: {date}");
//!         client.quit().await?;
//!         Ok(())
//!     })
//! }
//! ```

/// Session over [`SmolStream`](crate::runtime::stream::SmolStream).
///
/// See [`crate::net_client::NntpClient`] for the available operations.
pub type NntpClient = crate::net_client::NntpClient<crate::runtime::stream::SmolStream>;
