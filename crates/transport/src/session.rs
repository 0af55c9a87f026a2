//! TransportSession - one logical channel per stream and direction

use bytes::Bytes;
use tracing::{debug, instrument, trace, warn};

use crate::channel::{ChannelConnector, MessageChannel};
use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};

/// Owns the channel for one endpoint
///
/// A session is opened once and closed once. After any transport error the
/// owner is expected to close it and open a fresh one.
pub struct TransportSession<C> {
    endpoint: Endpoint,
    channel: Option<C>,
}

impl<C: MessageChannel> TransportSession<C> {
    /// Connect to `endpoint`
    #[instrument(name = "transport_open", skip(connector, endpoint), fields(endpoint = %endpoint))]
    pub async fn open<K>(connector: &K, endpoint: Endpoint) -> Result<Self>
    where
        K: ChannelConnector<Channel = C>,
    {
        let channel = connector.connect(&endpoint).await?;
        debug!("transport session opened");
        Ok(Self {
            endpoint,
            channel: Some(channel),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    /// Send one whole message
    pub async fn send(&mut self, message: Bytes) -> Result<()> {
        self.channel_mut()?.send(message).await
    }

    /// Receive the next non-empty message
    ///
    /// Zero-length messages are keepalives and never surface.
    pub async fn receive(&mut self) -> Result<Bytes> {
        let channel = self.channel_mut()?;
        loop {
            let message = channel.recv().await?;
            if message.is_empty() {
                trace!("skipping empty message");
                continue;
            }
            return Ok(message);
        }
    }

    /// Close the channel; closing twice is a no-op
    #[instrument(name = "transport_close", skip(self), fields(endpoint = %self.endpoint))]
    pub async fn close(&mut self) -> Result<()> {
        let Some(mut channel) = self.channel.take() else {
            return Ok(());
        };
        match channel.close().await {
            Ok(()) => {
                debug!("transport session closed");
                Ok(())
            }
            Err(e) if e.is_channel_closed() => {
                debug!(reason = %e, "transport already closed by peer");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "transport close failed");
                Err(e)
            }
        }
    }

    fn channel_mut(&mut self) -> Result<&mut C> {
        let endpoint = &self.endpoint;
        self.channel.as_mut().ok_or_else(|| TransportError::NotOpen {
            endpoint: endpoint.url(),
        })
    }
}

impl<C> Drop for TransportSession<C> {
    fn drop(&mut self) {
        if self.channel.is_some() {
            debug!(endpoint = %self.endpoint, "transport session dropped while open");
        }
    }
}
