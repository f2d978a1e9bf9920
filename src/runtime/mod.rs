//! Transport abstraction and runtime integrations.
//!
//! The session only needs the four operations of [`AsyncStream`]. Each
//! runtime feature adds a TCP newtype implementing it and a submodule with
//! an `NntpClient` alias bound to that newtype:
//!
//! - `tokio` (feature `tokio-runtime`)
//! - `async_std` (feature `async-std-runtime`)
//! - `smol` (feature `smol-runtime`)
//!
//! Anything else, such as a TLS stream or the in-memory
//! [`MockStream`](crate::mock::MockStream), plugs in by implementing
//! [`AsyncStream`] and calling
//! [`NntpClient::from_stream`](crate::net_client::NntpClient::from_stream).

pub mod stream;

pub use stream::AsyncStream;

#[cfg(feature = "tokio-runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio-runtime")))]
pub use stream::TokioStream;

#[cfg(feature = "async-std-runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "async-std-runtime")))]
pub use stream::AsyncStdStream;

#[cfg(feature = "smol-runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "smol-runtime")))]
pub use stream::SmolStream;

#[cfg(feature = "tokio-runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio-runtime")))]
pub mod tokio;

#[cfg(feature = "async-std-runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "async-std-runtime")))]
pub mod async_std;

#[cfg(feature = "smol-runtime")]
#[cfg_attr(docsrs, doc(cfg(feature = "smol-runtime")))]
pub mod smol;
