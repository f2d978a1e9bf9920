//! # nntp-session
//!
//! An async NNTP (Network News Transfer Protocol) client for Rust.
//!
//! Protocol state lives in a sans-io [`Client`]; [`NntpClient`] drives it
//! over any [`AsyncStream`], so the same session runs on tokio, async-std,
//! smol or an in-memory [`mock::MockStream`].
//!
//! ## Highlights
//!
//! - Multi-line responses are streamed through a [`BodyReader`] that
//!   borrows the session; a body dropped half read is drained before the
//!   next command.
//! - Article headers are parsed into an ordered multi-map, [`Headers`].
//! - [`NntpClient::overview`] negotiates between XZVER (yEnc framed
//!   DEFLATE), `[COMPRESS=GZIP]` blocks and plain OVER/XOVER, remembering
//!   per connection whether XZVER works.
//!
//! ## Sans-IO Usage
//!
//! ```rust
//! use nntp_session::{Client, Command};
//!
//! let mut client = Client::new();
//! let request_bytes = client.encode_command(&Command::Capabilities).unwrap();
//! assert_eq!(&request_bytes[..], b"CAPABILITIES\r\n");
//! // Send request_bytes through your I/O layer, then feed the reply back
//! client.feed_bytes(b"101 Capability list:\r\n");
//! let line = client.take_line().unwrap().unwrap();
//! assert!(line.starts_with(b"101"));
//! ```
//!
//! ## With Runtime Integration
//!
//! ```rust,no_run
//! # #[cfg(feature = "tokio-runtime")]
//! # {
//! use nntp_session::runtime::tokio::NntpClient;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = NntpClient::connect("news.example.com:119").await?;
//! client.mode_reader().await?;
//! let group = client.group("comp.lang.rust").await?;
//! let mut article = client.article(group.high).await?;
//! println!("{:?}", article.headers.get("Subject"));
//! let text = article.body.read_to_string().await?;
//! println!("{text}");
//! client.quit().await?;
//! # Ok(())
//! # }
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod body;
pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod header;
pub mod net_client;
pub mod overview;
pub mod pipeline;
pub mod response;
pub mod runtime;
pub mod status;

// Mock server for testing
pub mod mock;

pub use body::{BodyReader, LineMode};
pub use client::{Client, Quirks};
pub use command::{ArticleRange, ArticleSpec, Command};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use header::Headers;
pub use net_client::NntpClient;
pub use overview::OverviewRecord;
pub use response::{Article, ArticlePointer, GroupListing, GroupStatus};
pub use runtime::AsyncStream;
pub use status::{ExpectedCode, StatusLine};
