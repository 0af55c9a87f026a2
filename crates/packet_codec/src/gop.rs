//! GOP alias tagging and genlock
//!
//! Video payloads only decode from a keyframe. The uploader appends a cyclic
//! index to every video packet; index 0 is always the first sample of a GOP,
//! so a consumer joining mid-stream waits for tag 0 before surfacing data.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::codec::split_alias;
use crate::error::Result;

/// Appends the cyclic GOP index to outgoing packets
///
/// One encoder lives for exactly one upload session, so the index restarts
/// at 0 whenever a session is reopened.
#[derive(Debug, Clone)]
pub struct GopAliasEncoder {
    gop_size: u8,
    index: u8,
}

impl GopAliasEncoder {
    /// `gop_size == 0` disables tagging
    pub fn new(gop_size: u8) -> Self {
        Self { gop_size, index: 0 }
    }

    pub fn gop_size(&self) -> u8 {
        self.gop_size
    }

    pub fn is_enabled(&self) -> bool {
        self.gop_size > 0
    }

    /// Tag that the next packet will receive
    pub fn next_index(&self) -> u8 {
        self.index
    }

    /// Append the current index to `buf` and advance
    ///
    /// Returns the tag written, or `None` when tagging is disabled.
    pub fn tag(&mut self, buf: &mut BytesMut) -> Option<u8> {
        if !self.is_enabled() {
            return None;
        }
        let tag = self.index;
        buf.put_u8(tag);
        self.index = ((u16::from(tag) + 1) % u16::from(self.gop_size)) as u8;
        Some(tag)
    }
}

/// Strips alias tags and discards samples until the first GOP boundary
///
/// Lock is acquired once and never re-evaluated, even across later GOP
/// boundaries. A fresh decoder must be created for every session.
#[derive(Debug, Default, Clone)]
pub struct GenlockDecoder {
    locked: bool,
    dropped: u64,
}

impl GenlockDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Packets discarded while waiting for lock
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Decide whether a packet with `tag` reaches the consumer
    pub fn admit(&mut self, tag: u8) -> bool {
        if self.locked {
            return true;
        }
        if tag == 0 {
            self.locked = true;
            debug!(dropped = self.dropped, "genlock acquired");
            return true;
        }
        self.dropped += 1;
        trace!(tag, "discarding packet before GOP boundary");
        false
    }

    /// Strip the tag from a raw message and filter it
    ///
    /// Returns the untagged packet bytes when the packet is surfaced.
    pub fn accept(&mut self, data: Bytes) -> Result<Option<Bytes>> {
        let (tag, raw) = split_alias(data)?;
        Ok(self.admit(tag).then_some(raw))
    }
}
