//! Mock capture source
//!
//! Deterministic packets for tests and demos, no device required.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use contracts::{
    CaptureSource, ContractError, Packet, StreamMode, POSE_VALUES, TICKS_PER_SECOND,
};
use tracing::{debug, trace};

/// Mock capture configuration
#[derive(Debug, Clone)]
pub struct MockCaptureConfig {
    /// Sensor port reported by the source
    pub port: u16,

    /// Mode 1 sources attach a pose to every packet
    pub mode: StreamMode,

    /// Sample rate (Hz); `0.0` produces samples as fast as they are pulled
    pub frequency_hz: f64,

    /// Payload bytes per packet (at least 8, the sequence number)
    pub payload_len: usize,

    /// Fail every session after this many packets
    pub fail_after: Option<u64>,

    /// Fail this many `open` calls before succeeding
    pub failed_opens: u64,
}

impl Default for MockCaptureConfig {
    fn default() -> Self {
        Self {
            port: 3810,
            mode: StreamMode::Mode0,
            frequency_hz: 100.0,
            payload_len: 64,
            fail_after: None,
            failed_opens: 0,
        }
    }
}

/// Open/close counters shared with the test that built the source
#[derive(Debug, Clone, Default)]
pub struct CaptureProbe {
    opens: Arc<AtomicU64>,
    closes: Arc<AtomicU64>,
    packets: Arc<AtomicU64>,
}

impl CaptureProbe {
    /// Successful `open` calls
    pub fn opens(&self) -> u64 {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> u64 {
        self.closes.load(Ordering::SeqCst)
    }

    /// Packets produced across all sessions
    pub fn packets(&self) -> u64 {
        self.packets.load(Ordering::SeqCst)
    }
}

/// Mock capture source
///
/// Timestamps advance by one sample period (in 100 ns ticks) per packet and
/// keep increasing across sessions, like a device clock would.
pub struct MockCaptureSource {
    config: MockCaptureConfig,
    probe: CaptureProbe,
    open: bool,
    open_attempts: u64,
    sequence: u64,
    session_packets: u64,
}

impl MockCaptureSource {
    pub fn new(config: MockCaptureConfig) -> Self {
        Self {
            config,
            probe: CaptureProbe::default(),
            open: false,
            open_attempts: 0,
            sequence: 0,
            session_packets: 0,
        }
    }

    /// Mock IMU-style source: pose-carrying, small payloads
    pub fn imu(port: u16, frequency_hz: f64) -> Self {
        Self::new(MockCaptureConfig {
            port,
            mode: StreamMode::Mode1,
            frequency_hz,
            payload_len: 28,
            ..Default::default()
        })
    }

    /// Mock video-style source
    pub fn video(port: u16, frequency_hz: f64, payload_len: usize) -> Self {
        Self::new(MockCaptureConfig {
            port,
            mode: StreamMode::Mode1,
            frequency_hz,
            payload_len,
            ..Default::default()
        })
    }

    pub fn probe(&self) -> CaptureProbe {
        self.probe.clone()
    }

    fn interval(&self) -> Option<Duration> {
        (self.config.frequency_hz > 0.0)
            .then(|| Duration::from_secs_f64(1.0 / self.config.frequency_hz))
    }

    fn ticks_per_sample(&self) -> u64 {
        if self.config.frequency_hz > 0.0 {
            (TICKS_PER_SECOND as f64 / self.config.frequency_hz) as u64
        } else {
            1
        }
    }

    fn make_packet(&self) -> Packet {
        let mut payload = BytesMut::with_capacity(self.config.payload_len.max(8));
        payload.put_u64_le(self.sequence);
        payload.resize(self.config.payload_len.max(8), (self.sequence % 251) as u8);

        let timestamp = self.sequence * self.ticks_per_sample();
        if self.config.mode.has_pose() {
            Packet::with_pose(timestamp, payload.freeze(), [self.sequence as f32; POSE_VALUES])
        } else {
            Packet::new(timestamp, payload.freeze())
        }
    }
}

impl CaptureSource for MockCaptureSource {
    fn port(&self) -> u16 {
        self.config.port
    }

    async fn open(&mut self) -> Result<(), ContractError> {
        self.open_attempts += 1;
        if self.open_attempts <= self.config.failed_opens {
            return Err(ContractError::capture_open(self.config.port, "injected open failure"));
        }
        self.open = true;
        self.session_packets = 0;
        self.probe.opens.fetch_add(1, Ordering::SeqCst);
        debug!(port = self.config.port, "mock capture opened");
        Ok(())
    }

    async fn next_packet(&mut self) -> Result<Packet, ContractError> {
        let port = self.config.port;
        if !self.open {
            return Err(ContractError::capture_fault(port, "mock capture is not open"));
        }
        if self
            .config
            .fail_after
            .is_some_and(|limit| self.session_packets >= limit)
        {
            return Err(ContractError::capture_fault(port, "injected capture fault"));
        }
        if let Some(interval) = self.interval() {
            tokio::time::sleep(interval).await;
        }

        let packet = self.make_packet();
        self.sequence += 1;
        self.session_packets += 1;
        self.probe.packets.fetch_add(1, Ordering::SeqCst);
        trace!(port, timestamp = packet.timestamp, "mock packet");
        Ok(packet)
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        if self.open {
            self.open = false;
            self.probe.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Buf;

    #[tokio::test]
    async fn test_sequence_continues_across_sessions() {
        let mut source = MockCaptureSource::new(MockCaptureConfig {
            frequency_hz: 0.0,
            ..Default::default()
        });
        source.open().await.unwrap();
        let a = source.next_packet().await.unwrap();
        source.close().await.unwrap();
        source.open().await.unwrap();
        let b = source.next_packet().await.unwrap();

        assert_eq!(a.payload.clone().get_u64_le(), 0);
        assert_eq!(b.payload.clone().get_u64_le(), 1);
        assert!(b.timestamp > a.timestamp);
        assert_eq!(a.payload.len(), 64);
    }

    #[tokio::test]
    async fn test_pose_follows_mode() {
        let mut source = MockCaptureSource::imu(3806, 0.0);
        source.open().await.unwrap();
        assert!(source.next_packet().await.unwrap().pose.is_some());
    }

    #[tokio::test]
    async fn test_injected_faults() {
        let mut source = MockCaptureSource::new(MockCaptureConfig {
            frequency_hz: 0.0,
            fail_after: Some(1),
            failed_opens: 1,
            ..Default::default()
        });
        assert!(source.open().await.is_err());
        source.open().await.unwrap();
        source.next_packet().await.unwrap();
        assert!(matches!(
            source.next_packet().await,
            Err(ContractError::CaptureFault { .. })
        ));

        let probe = source.probe();
        source.close().await.unwrap();
        source.close().await.unwrap();
        assert_eq!(probe.opens(), 1);
        assert_eq!(probe.closes(), 1);
    }
}
