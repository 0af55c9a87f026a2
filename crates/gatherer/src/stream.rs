//! PacketStream - common pull interface

use std::future::Future;

use contracts::{Packet, StreamHeader};

use crate::error::Result;

/// Anything that yields packets for one stream
pub trait PacketStream: Send {
    /// Header describing the packets, known once the stream is open
    fn header(&self) -> Option<StreamHeader>;

    /// Next packet, or `Ok(None)` when the stream has ended normally
    fn next_packet(&mut self) -> impl Future<Output = Result<Option<Packet>>> + Send;
}
