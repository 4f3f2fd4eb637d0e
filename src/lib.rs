//! # Stream Protocol
//!
//! A minimal binary request/response protocol over a reliable byte stream:
//! length-delimited framing plus a tag-dispatched packet codec, with a TCP
//! server and client built on top.
//!
//! ## Layering
//! Strictly one-directional, leaf-first:
//! - [`core::frame`] turns the byte stream into discrete payload buffers
//!   (and back) and knows nothing about their contents.
//! - [`core::packet`] maps a payload buffer to a typed [`Packet`] (and
//!   back) and never touches the stream or the length prefix.
//! - [`service`] runs the per-connection read/decode/dispatch/encode/write
//!   loop; one task owns each connection, so the stateless codecs need no
//!   synchronization.
//!
//! ## Wire Format
//! ```text
//! [TotalLength(4, big-endian, counts itself)] [Tag(1)] [Body(fixed width)]
//! ```
//!
//! ## Example
//! ```no_run
//! use stream_protocol::service::client::Client;
//!
//! #[tokio::main]
//! async fn main() -> stream_protocol::error::Result<()> {
//!     let mut client = Client::connect("127.0.0.1:8888").await?;
//!     client.handshake().await?;
//!     let result = client.submit("ABCDEFGH").await?;
//!     assert_eq!(result, 0);
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod utils;

// Re-export the types most embedders touch.
pub use crate::core::frame::FrameCodec;
pub use crate::core::packet::{Packet, PacketId};
pub use crate::error::{FrameError, PacketError, ProtocolError, Result};
