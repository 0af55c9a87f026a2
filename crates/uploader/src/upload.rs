//! Upload loop
//!
//! ```text
//!             ok                      failure
//! Connecting ----> Streaming --------------------+
//!     ^  | failure                               v
//!     |  +-------------------------------------> Backoff
//!     +-------------- delay elapsed -------------+
//! ```
//!
//! The cancellation token is checked on every transition and between
//! samples. An in-flight send is never interrupted.

use std::time::Duration;

use contracts::{CaptureSource, RelayConfig, StreamConfig, StreamRole, UploadSettings};
use packet_codec::{GopAliasEncoder, PacketCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};
use transport::{ChannelConnector, Endpoint, TransportSession};

use crate::error::{Result, UploadError};

/// Upload loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Connecting,
    Streaming,
    Backoff,
}

/// Counters reported by [`Uploader::run`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadStats {
    /// Sessions that reached `Streaming`
    pub sessions_opened: u64,
    pub packets_sent: u64,
    /// Sessions torn down by an error, including failed connects
    pub failures: u64,
}

/// Drives one capture source into one relay push endpoint
pub struct Uploader<S, C: ChannelConnector> {
    source: S,
    connector: C,
    endpoint: Endpoint,
    stream: StreamConfig,
    settings: UploadSettings,
    cancel: CancellationToken,
    session: Option<TransportSession<C::Channel>>,
    state: UploadState,
    stats: UploadStats,
}

impl<S: CaptureSource, C: ChannelConnector> Uploader<S, C> {
    pub fn new(
        source: S,
        connector: C,
        endpoint: Endpoint,
        stream: StreamConfig,
        settings: UploadSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            connector,
            endpoint,
            stream,
            settings,
            cancel,
            session: None,
            state: UploadState::Connecting,
            stats: UploadStats::default(),
        }
    }

    /// Uploader for `stream` using the relay and upload settings
    pub fn from_config(
        source: S,
        connector: C,
        config: &RelayConfig,
        stream: &StreamConfig,
        cancel: CancellationToken,
    ) -> Self {
        let endpoint = Endpoint::for_stream(&config.relay, stream, StreamRole::Push);
        Self::new(
            source,
            connector,
            endpoint,
            stream.clone(),
            config.upload.clone(),
            cancel,
        )
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    pub fn stats(&self) -> UploadStats {
        self.stats
    }

    fn backoff(&self) -> Duration {
        Duration::from_millis(self.settings.backoff_ms)
    }

    /// Run until cancelled
    #[instrument(name = "upload_run", skip(self), fields(stream = %self.stream.name, endpoint = %self.endpoint))]
    pub async fn run(mut self) -> UploadStats {
        info!(gop_size = self.stream.gop_size, "upload loop started");

        while !self.cancel.is_cancelled() {
            match self.state {
                UploadState::Connecting => match self.connect().await {
                    Ok(()) => {
                        self.stats.sessions_opened += 1;
                        self.transition(UploadState::Streaming);
                    }
                    Err(e) => self.fail(e).await,
                },
                UploadState::Streaming => match self.stream_packets().await {
                    Ok(()) => break,
                    Err(e) => self.fail(e).await,
                },
                UploadState::Backoff => {
                    let delay = self.backoff();
                    let cancelled = tokio::select! {
                        _ = self.cancel.cancelled() => true,
                        _ = tokio::time::sleep(delay) => false,
                    };
                    if cancelled {
                        break;
                    }
                    self.transition(UploadState::Connecting);
                }
            }
        }

        self.teardown().await;
        info!(
            sessions = self.stats.sessions_opened,
            packets = self.stats.packets_sent,
            failures = self.stats.failures,
            "upload loop stopped"
        );
        self.stats
    }

    fn transition(&mut self, next: UploadState) {
        debug!(from = ?self.state, to = ?next, "upload state transition");
        self.state = next;
    }

    /// Acquire the capture resource, then the transport
    async fn connect(&mut self) -> Result<()> {
        self.source.open().await?;
        match TransportSession::open(&self.connector, self.endpoint.clone()).await {
            Ok(session) => {
                self.session = Some(session);
                observability::record_session_opened(&self.stream.name, StreamRole::Push.as_str());
                info!("upload session opened");
                Ok(())
            }
            Err(e) => {
                if let Err(close) = self.source.close().await {
                    warn!(error = %close, "capture close after failed connect");
                }
                Err(e.into())
            }
        }
    }

    /// Capture, encode, tag, send until cancelled
    ///
    /// A fresh GOP encoder per session restarts the alias index at 0.
    async fn stream_packets(&mut self) -> Result<()> {
        let codec = PacketCodec::new(self.stream.mode);
        let mut encoder = GopAliasEncoder::new(self.stream.gop_size);

        while !self.cancel.is_cancelled() {
            let packet = self.source.next_packet().await?;
            let mut buf = codec.encode(&packet)?;
            let tag = encoder.tag(&mut buf);
            let len = buf.len();

            let Some(session) = self.session.as_mut() else {
                return Err(transport::TransportError::NotOpen {
                    endpoint: self.endpoint.url(),
                }
                .into());
            };
            session.send(buf.freeze()).await?;

            self.stats.packets_sent += 1;
            observability::record_packet_sent(&self.stream.name, len);
            trace!(timestamp = packet.timestamp, len, tag = ?tag, "packet sent");

            if self.settings.yield_between_sends {
                tokio::task::yield_now().await;
            }
        }
        Ok(())
    }

    /// Log, count, tear down and move to back-off
    async fn fail(&mut self, err: UploadError) {
        error!(error = %err, stage = err.stage(), backoff_ms = self.settings.backoff_ms, "upload session failed");
        self.stats.failures += 1;
        observability::record_session_failure(&self.stream.name, err.stage());
        self.teardown().await;
        self.transition(UploadState::Backoff);
    }

    /// Release the transport and the capture resource
    async fn teardown(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        observability::record_session_closed(&self.stream.name, StreamRole::Push.as_str());
        if let Err(e) = session.close().await {
            warn!(error = %e, "transport close failed during teardown");
        }
        if let Err(e) = self.source.close().await {
            warn!(error = %e, "capture close failed during teardown");
        }
        debug!("upload session torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCaptureConfig, MockCaptureSource};
    use contracts::{Packet, StreamMode};
    use packet_codec::split_alias;
    use transport::{MemoryRelay, MessageChannel};

    fn settings(backoff_ms: u64) -> UploadSettings {
        UploadSettings {
            backoff_ms,
            yield_between_sends: true,
        }
    }

    fn endpoint(stream: &StreamConfig, role: StreamRole) -> Endpoint {
        Endpoint::new("memory", stream.name.clone(), role)
    }

    #[tokio::test]
    async fn test_streams_tagged_packets() {
        let relay = MemoryRelay::new(64);
        let stream = StreamConfig::video("pv", 3810, StreamMode::Mode1, 3);
        let mut pull = relay
            .connect(&endpoint(&stream, StreamRole::Pull))
            .await
            .unwrap();

        let source = MockCaptureSource::new(MockCaptureConfig {
            mode: StreamMode::Mode1,
            ..MockCaptureConfig::default()
        });
        let cancel = CancellationToken::new();
        let uploader = Uploader::new(
            source,
            relay.clone(),
            endpoint(&stream, StreamRole::Push),
            stream.clone(),
            settings(10),
            cancel.clone(),
        );
        let task = tokio::spawn(uploader.run());

        let codec = PacketCodec::new(StreamMode::Mode1);
        let mut tags = Vec::new();
        let mut last = None;
        for _ in 0..7 {
            let (tag, raw) = split_alias(pull.recv().await.unwrap()).unwrap();
            let packet: Packet = codec.decode(raw).unwrap();
            assert!(packet.pose.is_some());
            if let Some(prev) = last {
                assert!(packet.timestamp > prev);
            }
            last = Some(packet.timestamp);
            tags.push(tag);
        }
        assert_eq!(tags, vec![0, 1, 2, 0, 1, 2, 0]);

        drop(pull);
        cancel.cancel();
        let stats = task.await.unwrap();
        assert_eq!(stats.sessions_opened, 1);
        assert_eq!(stats.failures, 0);
        assert!(stats.packets_sent >= 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_fault_restarts_session_with_fresh_index() {
        let relay = MemoryRelay::new(64);
        let stream = StreamConfig::video("pv", 3810, StreamMode::Mode0, 4);
        let mut pull = relay
            .connect(&endpoint(&stream, StreamRole::Pull))
            .await
            .unwrap();

        let source = MockCaptureSource::new(MockCaptureConfig {
            fail_after: Some(3),
            ..MockCaptureConfig::default()
        });
        let probe = source.probe();
        let cancel = CancellationToken::new();
        let uploader = Uploader::new(
            source,
            relay.clone(),
            endpoint(&stream, StreamRole::Push),
            stream.clone(),
            settings(3000),
            cancel.clone(),
        );
        let task = tokio::spawn(uploader.run());

        let mut tags = Vec::new();
        for _ in 0..6 {
            let (tag, _) = split_alias(pull.recv().await.unwrap()).unwrap();
            tags.push(tag);
        }
        // each session fails after 3 packets; the index restarts at 0
        assert_eq!(tags, vec![0, 1, 2, 0, 1, 2]);

        drop(pull);
        cancel.cancel();
        let stats = task.await.unwrap();
        assert!(stats.sessions_opened >= 2);
        assert!(stats.failures >= 1);
        assert_eq!(probe.opens(), probe.closes());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_failure_backs_off() {
        let relay = MemoryRelay::new(4);
        relay.shutdown();
        let stream = StreamConfig::basic("rm_imu_gyroscope", 3807, StreamMode::Mode1);

        let source = MockCaptureSource::new(MockCaptureConfig {
            mode: StreamMode::Mode1,
            ..MockCaptureConfig::default()
        });
        let probe = source.probe();
        let cancel = CancellationToken::new();
        let uploader = Uploader::new(
            source,
            relay,
            endpoint(&stream, StreamRole::Push),
            stream.clone(),
            settings(3000),
            cancel.clone(),
        );
        let task = tokio::spawn(uploader.run());

        // two connect attempts fit in 3.5 s with a 3 s back-off
        tokio::time::sleep(Duration::from_millis(3500)).await;
        cancel.cancel();
        let stats = task.await.unwrap();

        assert_eq!(stats.sessions_opened, 0);
        assert_eq!(stats.failures, 2);
        assert_eq!(probe.opens(), 2);
        assert_eq!(probe.closes(), 2);
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let relay = MemoryRelay::new(4);
        let stream = StreamConfig::basic("microphone", 3811, StreamMode::Mode0);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let source = MockCaptureSource::new(MockCaptureConfig::default());
        let probe = source.probe();
        let uploader = Uploader::new(
            source,
            relay,
            endpoint(&stream, StreamRole::Push),
            stream,
            settings(10),
            cancel,
        );
        let stats = uploader.run().await;
        assert_eq!(stats, UploadStats::default());
        assert_eq!(probe.opens(), 0);
    }
}
