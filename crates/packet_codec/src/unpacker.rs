//! Chunked stream unpacker
//!
//! Turns arbitrarily sized byte chunks (file reads, stream-framed transport
//! messages) into whole packets. Chunk boundaries never need to line up with
//! packet boundaries.

use bytes::{Bytes, BytesMut};
use contracts::Packet;

use crate::codec::{split_alias, PacketCodec, ALIAS_TAG_BYTES};
use crate::error::Result;

/// Accumulates chunks and yields complete packets
#[derive(Debug)]
pub struct ChunkedUnpacker {
    codec: PacketCodec,
    trailer: usize,
    buffer: BytesMut,
}

impl ChunkedUnpacker {
    /// Unpacker for untagged packet streams
    pub fn new(codec: PacketCodec) -> Self {
        Self {
            codec,
            trailer: 0,
            buffer: BytesMut::new(),
        }
    }

    /// Unpacker for streams where every packet is followed by a GOP alias tag
    pub fn with_alias_trailer(codec: PacketCodec) -> Self {
        Self {
            trailer: ALIAS_TAG_BYTES,
            ..Self::new(codec)
        }
    }

    pub fn codec(&self) -> &PacketCodec {
        &self.codec
    }

    /// Append raw bytes
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Bytes buffered but not yet consumed
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Take the next complete raw frame, trailer included
    ///
    /// `Ok(None)` means more bytes are needed.
    pub fn try_unpack_frame(&mut self) -> Result<Option<Bytes>> {
        let Some(packet_len) = self.codec.frame_len(&self.buffer)? else {
            return Ok(None);
        };
        let frame_len = packet_len + self.trailer;
        if self.buffer.len() < frame_len {
            return Ok(None);
        }
        Ok(Some(self.buffer.split_to(frame_len).freeze()))
    }

    /// Decode the next complete packet
    ///
    /// `Ok(None)` means more bytes are needed. Alias tags, if configured, are
    /// discarded; use [`try_unpack_frame`](Self::try_unpack_frame) to inspect them.
    pub fn try_unpack(&mut self) -> Result<Option<Packet>> {
        let Some(frame) = self.try_unpack_frame()? else {
            return Ok(None);
        };
        let raw = if self.trailer > 0 {
            split_alias(frame)?.1
        } else {
            frame
        };
        self.codec.decode(raw).map(Some)
    }
}
