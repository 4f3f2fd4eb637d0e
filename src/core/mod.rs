//! # Core Protocol Components
//!
//! Low-level framing and packet encoding for the wire protocol.
//!
//! This module provides the foundation of the protocol: message boundaries
//! over an unbounded byte stream, and the typed command set carried inside
//! each frame.
//!
//! ## Components
//! - **Frame**: length-delimited framing over byte streams (tokio codec)
//! - **Packet**: tag-dispatched command encoding with fixed-width fields
//!
//! ## Wire Format
//! ```text
//! [TotalLength(4, big-endian)] [Payload(TotalLength - 4)]
//! Payload: [Tag(1)] [Body(fixed width per tag)]
//! ```
//!
//! The length prefix counts itself: a frame carrying an N-byte payload
//! declares `N + 4`. This is the interoperability contract; writing only
//! the payload length would produce a wire-incompatible protocol.
//!
//! ## Security
//! - Declared lengths are validated against a configurable ceiling
//!   before any allocation (prevents memory exhaustion by a hostile peer)
//! - Unknown type tags are reported, never panicked on

pub mod frame;
pub mod packet;
