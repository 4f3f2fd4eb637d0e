//! # Frame Codec
//!
//! Imposes message boundaries on a byte stream, independent of payload
//! contents. Each frame is a 4-byte big-endian total length (which counts
//! the prefix itself) followed by the opaque payload.
//!
//! `FrameCodec` implements [`Decoder`] and [`Encoder`] so it can be used
//! with `tokio_util::codec::Framed` over any `AsyncRead + AsyncWrite`
//! stream. Decoding is zero-copy where the buffer allows: a complete frame
//! is split off the read buffer rather than copied.
//!
//! The codec owns no protocol semantics beyond length-prefixing; payload
//! interpretation belongs to [`crate::core::packet`].

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::config::DEFAULT_MAX_FRAME_SIZE;
use crate::error::{FrameError, ProtocolError};

/// Width of the length prefix, in bytes.
pub const LEN_PREFIX_SIZE: usize = 4;

/// Length-delimited frame codec with a configurable size ceiling.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl FrameCodec {
    /// Create a codec that rejects frames whose declared total length
    /// exceeds `max_frame_size`.
    ///
    /// The ceiling is clamped to `u32::MAX`: the prefix is a u32, so a
    /// larger frame could never be encoded honestly.
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            max_frame_size: max_frame_size.min(u32::MAX as usize),
        }
    }

    /// The configured ceiling on a frame's declared total length.
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, ProtocolError> {
        if src.len() < LEN_PREFIX_SIZE {
            // Partial prefix: leave the buffer untouched and wait for more.
            return Ok(None);
        }

        // Peek the prefix without consuming it, so an incomplete frame
        // keeps its header for the next call.
        let mut prefix = [0u8; LEN_PREFIX_SIZE];
        prefix.copy_from_slice(&src[..LEN_PREFIX_SIZE]);
        let declared = u32::from_be_bytes(prefix);

        if (declared as usize) < LEN_PREFIX_SIZE {
            return Err(FrameError::InvalidLength(declared).into());
        }
        if declared as usize > self.max_frame_size {
            // Reject before reserving or reading the claimed size.
            return Err(FrameError::TooLarge {
                declared,
                max: self.max_frame_size as u32,
            }
            .into());
        }

        let total = declared as usize;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(total);
        frame.advance(LEN_PREFIX_SIZE);
        Ok(Some(frame.freeze()))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Bytes>, ProtocolError> {
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            // Clean close at a frame boundary: graceful termination.
            None if buf.is_empty() => Ok(None),
            None => {
                let expected = if buf.len() >= LEN_PREFIX_SIZE {
                    let mut prefix = [0u8; LEN_PREFIX_SIZE];
                    prefix.copy_from_slice(&buf[..LEN_PREFIX_SIZE]);
                    u32::from_be_bytes(prefix) as usize
                } else {
                    LEN_PREFIX_SIZE
                };
                Err(FrameError::Truncated {
                    expected,
                    got: buf.len(),
                }
                .into())
            }
        }
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, payload: Bytes, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let total = payload.len() + LEN_PREFIX_SIZE;
        if total > self.max_frame_size {
            return Err(FrameError::TooLarge {
                declared: total.min(u32::MAX as usize) as u32,
                max: self.max_frame_size as u32,
            }
            .into());
        }

        dst.reserve(total);
        dst.put_u32(total as u32);
        dst.extend_from_slice(&payload);
        Ok(())
    }
}
