//! Recorder - drains a packet stream into a stream file

use std::io::Write;

use contracts::Packet;
use observability::{ThroughputAggregator, ThroughputSummary};
use stream_file::StreamWriter;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::error::{GathererError, Result};
use crate::stream::PacketStream;

/// Why a recording stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The source reported end-of-stream
    EndOfStream,
    /// The relay connection closed
    ChannelClosed,
    /// The cancellation token fired
    Cancelled,
    /// The packet limit was reached
    Limit,
}

/// Outcome of [`record`]
#[derive(Debug, Clone)]
pub struct RecordSummary {
    pub packets: u64,
    pub stop: StopReason,
    pub throughput: ThroughputSummary,
}

/// Copy packets from `source` to `writer`
///
/// Cancellation is checked between packets. A closed relay connection ends
/// the recording normally; any other error is returned. The writer is left
/// open for the caller to close.
#[instrument(name = "record", skip_all, fields(port = writer.header().port))]
pub async fn record<S, W>(
    source: &mut S,
    writer: &mut StreamWriter<W>,
    cancel: &CancellationToken,
    limit: Option<u64>,
) -> Result<RecordSummary>
where
    S: PacketStream,
    W: Write + Send,
{
    let mut throughput = ThroughputAggregator::new();
    let stop = loop {
        if cancel.is_cancelled() {
            break StopReason::Cancelled;
        }
        if limit.is_some_and(|limit| throughput.packets() >= limit) {
            break StopReason::Limit;
        }

        let packet: Packet = match source.next_packet().await {
            Ok(Some(packet)) => packet,
            Ok(None) => break StopReason::EndOfStream,
            Err(e) if e.is_channel_closed() => {
                warn!(error = %e, "source closed during recording");
                break StopReason::ChannelClosed;
            }
            Err(e) => return Err(e),
        };
        writer.write(&packet).map_err(GathererError::File)?;
        throughput.observe(&packet);
    };

    let summary = RecordSummary {
        packets: throughput.packets(),
        stop,
        throughput: throughput.summary(),
    };
    info!(packets = summary.packets, stop = ?summary.stop, "recording finished");
    Ok(summary)
}
