//! # Error Types
//!
//! Error handling for the framing and packet layers.
//!
//! This module defines all error variants that can occur during protocol
//! operations, from low-level I/O failures to malformed packet bodies.
//!
//! ## Error Categories
//! - **Frame errors**: bad or oversized length prefixes, truncated streams
//! - **Packet errors**: unknown type tags, short bodies, oversized identifiers
//! - **I/O errors**: network failures surfaced verbatim from the stream
//!
//! A clean peer close at a frame boundary is *not* an error: the framed
//! stream simply ends. All errors implement `std::error::Error`.
//!
//! ## Example Usage
//! ```rust
//! use stream_protocol::core::packet::Packet;
//! use stream_protocol::error::PacketError;
//!
//! match Packet::decode(&[0x7F]) {
//!     Err(PacketError::UnknownType(tag)) => assert_eq!(tag, 0x7F),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
/// Static strings are borrowed, avoiding heap allocations for common error cases.
pub mod constants {
    /// Dispatcher-related error messages
    pub const ERR_DISPATCHER_WRITE_LOCK: &str = "Failed to acquire write lock on dispatcher";
    pub const ERR_DISPATCHER_READ_LOCK: &str = "Failed to acquire read lock on dispatcher";
    pub const ERR_HANDLER_PANIC: &str = "Handler panicked while processing packet";

    /// Connection errors
    pub const ERR_CONNECTION_CLOSED: &str = "Connection closed";
    pub const ERR_TIMEOUT: &str = "Operation timed out";
}

/// Errors produced by the framing layer.
///
/// All three variants are unrecoverable for the current frame; the
/// connection handler is expected to close the connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The declared total length is smaller than the 4-byte prefix itself.
    #[error("invalid frame length {0} (minimum is the 4-byte prefix)")]
    InvalidLength(u32),

    /// The declared total length exceeds the configured ceiling.
    /// Raised before any allocation or payload read is attempted.
    #[error("declared frame length {declared} exceeds maximum {max}")]
    TooLarge { declared: u32, max: u32 },

    /// The stream ended mid-frame: fewer bytes arrived than the frame
    /// promised. Distinct from a clean close at a frame boundary.
    #[error("stream ended mid-frame ({got} of {expected} bytes)")]
    Truncated { expected: usize, got: usize },
}

/// Errors produced by the packet layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// The type tag is not in the registry. Structurally valid frame,
    /// unrecognized command; the handler decides whether to answer or close.
    #[error("unknown packet type tag {0:#04x}")]
    UnknownType(u8),

    /// The payload is shorter than the variant's fixed body requires.
    #[error("malformed packet body: needed {needed} bytes, got {got}")]
    Malformed { needed: usize, got: usize },

    /// A caller-supplied identifier does not fit its fixed wire width.
    #[error("identifier {0:?} exceeds the 8-byte field width")]
    IdTooLong(String),
}

/// ProtocolError is the primary error type for all protocol operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Packet(#[from] PacketError),

    #[error("no handler registered for packet tag {0:#04x}")]
    Unhandled(u8),

    #[error("unexpected packet type in response")]
    UnexpectedPacket,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timeout occurred")]
    Timeout,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
