//! Length-prefixed frame codec for tokio.
//!
//! Reassembles complete frames from a byte stream using the `total_length`
//! prefix, then hands each one to [`frame::parse`]. A malformed frame is an
//! error for that frame only; the stream position stays consistent because
//! the full frame is always consumed first.

use bytes::{Buf, BytesMut};
use std::sync::Arc;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtocolError;
use crate::frame::{self, Packet, HEADER_LEN};
use crate::schema::{Direction, SchemaRegistry};

/// Default maximum accepted frame size in bytes.
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024;

/// Codec for framing [`Packet`] values over a byte stream.
pub struct FrameCodec {
    registry: Arc<SchemaRegistry>,
    /// Namespace inbound frames are decoded against.
    direction: Direction,
    max_frame_len: usize,
}

impl FrameCodec {
    /// Create a codec decoding inbound frames in the given direction.
    ///
    /// A server decodes `Serverbound`, a client decodes `Clientbound`.
    pub fn new(registry: Arc<SchemaRegistry>, direction: Direction) -> Self {
        Self {
            registry,
            direction,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Create a codec with a custom maximum frame length.
    pub fn with_max_frame_len(
        registry: Arc<SchemaRegistry>,
        direction: Direction,
        max_frame_len: usize,
    ) -> Self {
        Self {
            registry,
            direction,
            max_frame_len,
        }
    }
}

impl Decoder for FrameCodec {
    type Item = Packet;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>, ProtocolError> {
        // Need the length prefix first.
        if src.len() < 4 {
            return Ok(None);
        }

        let declared = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;

        // A frame shorter than its own header can never become valid, and
        // an oversized one would stall the stream while we buffer it.
        if declared < HEADER_LEN {
            return Err(ProtocolError::TooShort {
                actual: declared,
                header: HEADER_LEN,
            });
        }
        if declared > self.max_frame_len {
            return Err(ProtocolError::FrameTooLarge {
                actual: declared,
                limit: self.max_frame_len,
            });
        }

        if src.len() < declared {
            src.reserve(declared - src.len());
            return Ok(None);
        }

        let bytes = src.split_to(declared);
        let packet = frame::parse(&self.registry, self.direction, &bytes)?;
        Ok(Some(packet))
    }
}

impl Encoder<Packet> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, packet: Packet, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let bytes = packet.serialize()?;
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}

impl Encoder<&Packet> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, packet: &Packet, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let bytes = packet.serialize()?;
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}
