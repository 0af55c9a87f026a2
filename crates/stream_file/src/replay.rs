//! ReplayCapture - a recorded stream file as a capture source

use std::path::{Path, PathBuf};
use std::time::Duration;

use contracts::{CaptureSource, ContractError, Packet, StreamHeader, TICKS_PER_SECOND};
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::reader::StreamReader;

/// Replays packets from a stream file
///
/// With pacing enabled, packets are released at the rate implied by their
/// timestamps (100 ns ticks). With looping enabled, the file restarts from
/// its first packet at end-of-stream.
pub struct ReplayCapture {
    path: PathBuf,
    header: StreamHeader,
    chunk_size: usize,
    paced: bool,
    looping: bool,
    reader: Option<StreamReader>,
    clock: Option<(Instant, u64)>,
    yielded_since_rewind: u64,
}

impl ReplayCapture {
    /// Read the header of `path`; the file is reopened on every `open`
    pub fn new(path: impl AsRef<Path>, chunk_size: usize) -> crate::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let header = *StreamReader::open(&path, chunk_size)?.header();
        Ok(Self {
            path,
            header,
            chunk_size,
            paced: false,
            looping: false,
            reader: None,
            clock: None,
            yielded_since_rewind: 0,
        })
    }

    pub fn paced(mut self, paced: bool) -> Self {
        self.paced = paced;
        self
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn header(&self) -> &StreamHeader {
        &self.header
    }

    fn rewind(&mut self) -> Result<(), ContractError> {
        let reader = StreamReader::open(&self.path, self.chunk_size)
            .map_err(|e| ContractError::capture_open(self.header.port, e.to_string()))?;
        self.reader = Some(reader);
        self.clock = None;
        self.yielded_since_rewind = 0;
        Ok(())
    }

    async fn pace(&mut self, timestamp: u64) {
        let Some((started, first)) = self.clock else {
            self.clock = Some((Instant::now(), timestamp));
            return;
        };
        let ticks = timestamp.saturating_sub(first);
        let offset = Duration::from_nanos(ticks.saturating_mul(1_000_000_000 / TICKS_PER_SECOND));
        tokio::time::sleep_until(started + offset).await;
    }
}

impl CaptureSource for ReplayCapture {
    fn port(&self) -> u16 {
        self.header.port
    }

    #[instrument(name = "replay_open", skip(self), fields(path = %self.path.display()))]
    async fn open(&mut self) -> Result<(), ContractError> {
        self.rewind()?;
        debug!(port = self.header.port, "replay opened");
        Ok(())
    }

    async fn next_packet(&mut self) -> Result<Packet, ContractError> {
        let port = self.header.port;
        loop {
            let reader = self
                .reader
                .as_mut()
                .ok_or_else(|| ContractError::capture_fault(port, "replay is not open"))?;
            let next = reader
                .read()
                .map_err(|e| ContractError::capture_fault(port, e.to_string()))?;

            match next {
                Some(packet) => {
                    self.yielded_since_rewind += 1;
                    if self.paced {
                        self.pace(packet.timestamp).await;
                    }
                    return Ok(packet);
                }
                None if self.looping && self.yielded_since_rewind > 0 => {
                    debug!(port, "replay reached end of file, rewinding");
                    self.rewind()?;
                }
                None => return Err(ContractError::CaptureExhausted { port }),
            }
        }
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        self.reader = None;
        self.clock = None;
        Ok(())
    }
}
