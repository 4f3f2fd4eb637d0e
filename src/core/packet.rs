//! # Packet Codec
//!
//! Bidirectional mapping between the closed set of typed commands and their
//! flat binary encodings, plus type-tag dispatch.
//!
//! A packet payload starts with a 1-byte type tag followed by that
//! variant's fixed-width body. Requests use the low tag range; each
//! acknowledgement tag is its request tag with the high bit set:
//!
//! ```text
//! 0x01 Conn       (empty body)
//! 0x02 Submit     [id: 8 bytes, NUL-padded ASCII]
//! 0x03 Bye        (empty body)
//! 0x81 ConnAck    [result: u8]
//! 0x82 SubmitAck  [id: 8 bytes] [result: u8]
//! 0x83 ByeAck     [result: u8]
//! ```
//!
//! Decoding is total over the tag space: an unrecognized tag yields
//! [`PacketError::UnknownType`], never a panic, so future command tags can
//! be registered without breaking existing peers. The codec is stateless
//! and never touches the stream or the length prefix; framing belongs to
//! [`crate::core::frame`].

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::PacketError;

/// Type tag for a connection-establishment request.
pub const TAG_CONN: u8 = 0x01;
/// Type tag for a submit request.
pub const TAG_SUBMIT: u8 = 0x02;
/// Type tag for a termination request.
pub const TAG_BYE: u8 = 0x03;
/// Acknowledgement tags carry the request tag with the high bit set.
pub const TAG_ACK_BIT: u8 = 0x80;
/// Type tag for a connection-establishment acknowledgement.
pub const TAG_CONN_ACK: u8 = TAG_CONN | TAG_ACK_BIT;
/// Type tag for a submit acknowledgement.
pub const TAG_SUBMIT_ACK: u8 = TAG_SUBMIT | TAG_ACK_BIT;
/// Type tag for a termination acknowledgement.
pub const TAG_BYE_ACK: u8 = TAG_BYE | TAG_ACK_BIT;

/// Width of the type tag, in bytes.
pub const TAG_SIZE: usize = 1;
/// Fixed wire width of a packet identifier, in bytes.
pub const ID_SIZE: usize = 8;

/// Result code denoting success in acknowledgement packets.
pub const RESULT_OK: u8 = 0;

/// An 8-byte fixed-width packet identifier, NUL-padded on the wire.
///
/// The width invariant is enforced at construction: [`PacketId::new`]
/// rejects identifiers longer than eight bytes instead of truncating, so
/// encoding an existing `PacketId` can never fail. Equality compares the
/// padded wire form, which makes round-trip fidelity byte-exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketId([u8; ID_SIZE]);

impl PacketId {
    /// Build an identifier from a short string, right-padding with NUL.
    ///
    /// Returns [`PacketError::IdTooLong`] if `id` exceeds eight bytes;
    /// the value is never silently truncated.
    pub fn new(id: &str) -> Result<Self, PacketError> {
        let raw = id.as_bytes();
        if raw.len() > ID_SIZE {
            return Err(PacketError::IdTooLong(id.to_string()));
        }
        let mut padded = [0u8; ID_SIZE];
        padded[..raw.len()].copy_from_slice(raw);
        Ok(Self(padded))
    }

    /// Reconstruct an identifier from its padded wire form.
    pub fn from_wire(raw: [u8; ID_SIZE]) -> Self {
        Self(raw)
    }

    /// The padded 8-byte wire form.
    pub fn as_wire(&self) -> &[u8; ID_SIZE] {
        &self.0
    }

    /// The identifier with trailing padding stripped.
    ///
    /// Wire bytes are not required to be valid UTF-8; undecodable bytes
    /// are replaced rather than rejected, since the padded form is what
    /// equality and re-encoding operate on.
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        let end = self
            .0
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |pos| pos + 1);
        String::from_utf8_lossy(&self.0[..end])
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

/// A typed, decoded interpretation of a frame's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packet {
    /// Connection-establishment request.
    Conn,
    /// Connection-establishment acknowledgement.
    ConnAck { result: u8 },
    /// A request identified by an 8-byte identifier.
    Submit { id: PacketId },
    /// Acknowledgement for a submit; `result == 0` denotes success.
    SubmitAck { id: PacketId, result: u8 },
    /// Termination request.
    Bye,
    /// Termination acknowledgement.
    ByeAck { result: u8 },
}

impl Packet {
    /// The wire tag identifying this packet's variant.
    pub fn tag(&self) -> u8 {
        match self {
            Packet::Conn => TAG_CONN,
            Packet::ConnAck { .. } => TAG_CONN_ACK,
            Packet::Submit { .. } => TAG_SUBMIT,
            Packet::SubmitAck { .. } => TAG_SUBMIT_ACK,
            Packet::Bye => TAG_BYE,
            Packet::ByeAck { .. } => TAG_BYE_ACK,
        }
    }

    /// Human-readable variant name, for logging.
    pub fn tag_name(&self) -> &'static str {
        match self {
            Packet::Conn => "CONN",
            Packet::ConnAck { .. } => "CONN_ACK",
            Packet::Submit { .. } => "SUBMIT",
            Packet::SubmitAck { .. } => "SUBMIT_ACK",
            Packet::Bye => "BYE",
            Packet::ByeAck { .. } => "BYE_ACK",
        }
    }

    /// Decode a frame payload into a typed packet.
    ///
    /// Dispatches on the leading tag byte through the per-variant body
    /// decoders. Bytes beyond a variant's fixed body are ignored; a body
    /// shorter than the variant requires is [`PacketError::Malformed`],
    /// and an unregistered tag is [`PacketError::UnknownType`]. A failed
    /// decode leaves no partially constructed packet observable.
    pub fn decode(payload: &[u8]) -> Result<Packet, PacketError> {
        let (&tag, body) = payload.split_first().ok_or(PacketError::Malformed {
            needed: TAG_SIZE,
            got: 0,
        })?;

        match tag {
            TAG_CONN => Ok(Packet::Conn),
            TAG_CONN_ACK => decode_result_body(body).map(|result| Packet::ConnAck { result }),
            TAG_SUBMIT => decode_id_body(body).map(|id| Packet::Submit { id }),
            TAG_SUBMIT_ACK => decode_id_result_body(body)
                .map(|(id, result)| Packet::SubmitAck { id, result }),
            TAG_BYE => Ok(Packet::Bye),
            TAG_BYE_ACK => decode_result_body(body).map(|result| Packet::ByeAck { result }),
            unknown => Err(PacketError::UnknownType(unknown)),
        }
    }

    /// Encode this packet into a frame payload: tag byte, then the
    /// variant's fixed-width body in decode order.
    ///
    /// Infallible: the only caller-violable invariant (an identifier wider
    /// than its field) is rejected by [`PacketId::new`] before a packet
    /// can be built.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(TAG_SIZE + ID_SIZE + 1);
        buf.put_u8(self.tag());
        match self {
            Packet::Conn | Packet::Bye => {}
            Packet::ConnAck { result } | Packet::ByeAck { result } => {
                buf.put_u8(*result);
            }
            Packet::Submit { id } => {
                buf.put_slice(id.as_wire());
            }
            Packet::SubmitAck { id, result } => {
                buf.put_slice(id.as_wire());
                buf.put_u8(*result);
            }
        }
        buf.freeze()
    }
}

// Per-variant body decoders: pure fixed-offset extraction.

fn decode_result_body(body: &[u8]) -> Result<u8, PacketError> {
    body.first().copied().ok_or(PacketError::Malformed {
        needed: 1,
        got: body.len(),
    })
}

fn decode_id_body(body: &[u8]) -> Result<PacketId, PacketError> {
    if body.len() < ID_SIZE {
        return Err(PacketError::Malformed {
            needed: ID_SIZE,
            got: body.len(),
        });
    }
    let mut raw = [0u8; ID_SIZE];
    raw.copy_from_slice(&body[..ID_SIZE]);
    Ok(PacketId::from_wire(raw))
}

fn decode_id_result_body(body: &[u8]) -> Result<(PacketId, u8), PacketError> {
    if body.len() < ID_SIZE + 1 {
        return Err(PacketError::Malformed {
            needed: ID_SIZE + 1,
            got: body.len(),
        });
    }
    let id = decode_id_body(body)?;
    Ok((id, body[ID_SIZE]))
}
