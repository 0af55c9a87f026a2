//! Message channel abstraction
//!
//! A channel moves whole, discrete messages: each one is delivered intact or
//! not at all, in order relative to the other messages on the same channel.

use std::future::Future;

use bytes::Bytes;

use crate::endpoint::Endpoint;
use crate::error::Result;

/// One connected message channel
pub trait MessageChannel: Send {
    /// Send one whole message
    ///
    /// Blocks while the channel applies backpressure.
    fn send(&mut self, message: Bytes) -> impl Future<Output = Result<()>> + Send;

    /// Receive the next whole message
    ///
    /// # Errors
    /// `ChannelClosed` once the connection is gone
    fn recv(&mut self) -> impl Future<Output = Result<Bytes>> + Send;

    /// Close the channel
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Opens message channels to relay endpoints
pub trait ChannelConnector: Send + Sync {
    /// Channel type produced by this connector
    type Channel: MessageChannel;

    /// Connect to `endpoint`
    fn connect(&self, endpoint: &Endpoint) -> impl Future<Output = Result<Self::Channel>> + Send;
}
