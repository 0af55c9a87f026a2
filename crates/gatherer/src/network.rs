//! PacketGatherer - relay pull side

use bytes::Bytes;
use contracts::{
    Framing, GathererKind, Packet, RelayConfig, StreamConfig, StreamHeader, StreamRole,
};
use packet_codec::{ChunkedUnpacker, CodecError, GenlockDecoder, PacketCodec};
use tracing::{debug, info, instrument, trace, warn};
use transport::{ChannelConnector, Endpoint, TransportSession};

use crate::error::{GathererError, Result};
use crate::stream::PacketStream;

/// Pulls packets for one stream from the relay
///
/// `GathererKind::Video` streams carry a GOP alias tag and are genlocked;
/// `GathererKind::Basic` streams surface every packet. All per-session state
/// (genlock, partial chunks) is rebuilt on every [`open`](Self::open).
pub struct PacketGatherer<C: ChannelConnector> {
    connector: C,
    endpoint: Endpoint,
    stream: StreamConfig,
    framing: Framing,
    codec: PacketCodec,
    session: Option<TransportSession<C::Channel>>,
    unpacker: Option<ChunkedUnpacker>,
    genlock: Option<GenlockDecoder>,
}

impl<C: ChannelConnector> PacketGatherer<C> {
    pub fn new(connector: C, endpoint: Endpoint, stream: StreamConfig) -> Self {
        let codec = PacketCodec::new(stream.mode);
        Self {
            connector,
            endpoint,
            stream,
            framing: Framing::Message,
            codec,
            session: None,
            unpacker: None,
            genlock: None,
        }
    }

    /// Gatherer for `stream` using the relay, gatherer and file settings
    pub fn from_config(connector: C, config: &RelayConfig, stream: &StreamConfig) -> Self {
        let endpoint = Endpoint::for_stream(&config.relay, stream, StreamRole::Pull);
        Self::new(connector, endpoint, stream.clone())
            .with_framing(config.gatherer.framing)
            .with_max_payload(config.file.max_payload_bytes)
    }

    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.codec = self.codec.with_max_payload(max_payload);
        self
    }

    pub fn stream(&self) -> &StreamConfig {
        &self.stream
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    fn is_video(&self) -> bool {
        self.stream.kind == GathererKind::Video
    }

    /// Whether genlock has been acquired in the current session
    ///
    /// Always `true` for basic streams.
    pub fn is_locked(&self) -> bool {
        self.genlock.as_ref().map_or(true, GenlockDecoder::is_locked)
    }

    /// Packets discarded by genlock in the current session
    pub fn genlock_dropped(&self) -> u64 {
        self.genlock.as_ref().map_or(0, GenlockDecoder::dropped)
    }

    /// Connect and reset all per-session state
    ///
    /// Opening an already open gatherer closes the previous session first.
    #[instrument(
        name = "gatherer_open",
        skip(self),
        fields(stream = %self.stream.name, kind = ?self.stream.kind, framing = ?self.framing)
    )]
    pub async fn open(&mut self) -> Result<()> {
        if self.session.is_some() {
            self.close().await?;
        }

        let session = TransportSession::open(&self.connector, self.endpoint.clone()).await?;
        self.session = Some(session);
        self.genlock = self.is_video().then(GenlockDecoder::new);
        self.unpacker = match self.framing {
            Framing::Message => None,
            Framing::Chunked if self.is_video() => {
                Some(ChunkedUnpacker::with_alias_trailer(self.codec))
            }
            Framing::Chunked => Some(ChunkedUnpacker::new(self.codec)),
        };

        observability::record_session_opened(&self.stream.name, StreamRole::Pull.as_str());
        info!(endpoint = %self.endpoint, "gatherer opened");
        Ok(())
    }

    /// Next decoded packet
    ///
    /// For video streams, packets received before the first GOP boundary are
    /// discarded here and never surface.
    ///
    /// # Errors
    /// - `Transport(ChannelClosed)` when the relay connection ends, including
    ///   before genlock is acquired
    /// - `Codec` when a message cannot be framed as a packet
    pub async fn get_next_packet(&mut self) -> Result<Packet> {
        loop {
            let frame = self.next_frame().await?;

            let raw = match self.genlock.as_mut() {
                Some(genlock) => {
                    let was_locked = genlock.is_locked();
                    let admitted = genlock
                        .accept(frame)
                        .map_err(|e| GathererError::codec(self.stream.name.as_str(), e))?;
                    if !was_locked && genlock.is_locked() {
                        info!(stream = %self.stream.name, dropped = genlock.dropped(), "genlock acquired");
                        observability::record_genlock_dropped(&self.stream.name, genlock.dropped());
                    }
                    match admitted {
                        Some(raw) => raw,
                        None => continue,
                    }
                }
                None => frame,
            };

            let packet = self.decode(raw)?;
            observability::record_packet_received(&self.stream.name, packet.payload.len());
            return Ok(packet);
        }
    }

    /// Close the session; always releases the channel
    #[instrument(name = "gatherer_close", skip(self), fields(stream = %self.stream.name))]
    pub async fn close(&mut self) -> Result<()> {
        self.unpacker = None;
        self.genlock = None;
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        observability::record_session_closed(&self.stream.name, StreamRole::Pull.as_str());
        session.close().await?;
        debug!("gatherer closed");
        Ok(())
    }

    /// One raw packet frame, alias tag included for video
    async fn next_frame(&mut self) -> Result<Bytes> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| GathererError::not_open(self.stream.name.as_str()))?;

        let Some(unpacker) = self.unpacker.as_mut() else {
            return Ok(session.receive().await?);
        };
        loop {
            let frame = unpacker
                .try_unpack_frame()
                .map_err(|e| GathererError::codec(self.stream.name.as_str(), e))?;
            if let Some(frame) = frame {
                return Ok(frame);
            }
            let chunk = session.receive().await?;
            trace!(len = chunk.len(), buffered = unpacker.buffered_len(), "chunk received");
            unpacker.extend(&chunk);
        }
    }

    fn decode(&self, raw: Bytes) -> Result<Packet> {
        self.codec.decode(raw).map_err(|e| {
            // a whole message that is too short is corrupt, not incomplete
            let e = match e {
                CodecError::IncompleteData { needed, available } => CodecError::corrupt(format!(
                    "message holds {available} bytes, packet needs {needed}"
                )),
                other => other,
            };
            GathererError::codec(self.stream.name.as_str(), e)
        })
    }
}

impl<C: ChannelConnector> PacketStream for PacketGatherer<C> {
    fn header(&self) -> Option<StreamHeader> {
        Some(self.stream.header())
    }

    async fn next_packet(&mut self) -> Result<Option<Packet>> {
        self.get_next_packet().await.map(Some)
    }
}

impl<C: ChannelConnector> Drop for PacketGatherer<C> {
    fn drop(&mut self) {
        if self.session.is_some() {
            warn!(stream = %self.stream.name, "gatherer dropped without close");
        }
    }
}
