//! Loopback Pipeline Example
//!
//! Uploads a mock video stream through the in-process relay, records it with
//! a video gatherer and reads the recording back.
//! This example runs without a relay server or a device.
//!
//! Run with: cargo run -p demos --bin loopback_pipeline

use std::time::Duration;

use contracts::{StreamConfig, StreamMode, StreamRole, UploadSettings};
use gatherer::{record, PacketGatherer};
use observability::{LogFormat, ObservabilityConfig, ThroughputAggregator};
use stream_file::{StreamReader, StreamWriter};
use tokio_util::sync::CancellationToken;
use transport::{Endpoint, MemoryRelay};
use uploader::{MockCaptureSource, Uploader};

const HOST: &str = "loopback";
const PACKETS: u64 = 90;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init_with_config(
        ObservabilityConfig::new("loopback_pipeline")
            .with_format(LogFormat::Compact)
            .without_metrics(),
    )?;

    tracing::info!("Starting Loopback Pipeline Demo");

    let path = std::env::args()
        .nth(1)
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("loopback_pv.bin"));

    // ==== Stage 1: Relay and stream ====
    let relay = MemoryRelay::default();
    let stream = StreamConfig::video("personal_video", 3810, StreamMode::Mode1, 30);

    // ==== Stage 2: Upload ====
    let cancel = CancellationToken::new();
    let source = MockCaptureSource::video(stream.port, 30.0, 4096);
    let probe = source.probe();
    let uploader = Uploader::new(
        source,
        relay.clone(),
        Endpoint::new(HOST, stream.name.clone(), StreamRole::Push),
        stream.clone(),
        UploadSettings::default(),
        cancel.clone(),
    );
    let upload = tokio::spawn(uploader.run());

    // Join mid-stream so genlock has something to skip
    tokio::time::sleep(Duration::from_millis(250)).await;

    // ==== Stage 3: Gather and record ====
    let mut gatherer = PacketGatherer::new(
        relay.clone(),
        Endpoint::new(HOST, stream.name.clone(), StreamRole::Pull),
        stream.clone(),
    );
    gatherer.open().await?;

    let mut writer = StreamWriter::create(&path, stream.header())?;
    let summary = record(&mut gatherer, &mut writer, &cancel, Some(PACKETS)).await?;
    let dropped = gatherer.genlock_dropped();
    gatherer.close().await?;
    writer.close()?;

    cancel.cancel();
    let stats = upload.await?;
    tracing::info!(
        sessions = stats.sessions_opened,
        sent = stats.packets_sent,
        failures = stats.failures,
        captured = probe.packets(),
        "Upload stopped"
    );
    tracing::info!(
        recorded = summary.packets,
        stop = ?summary.stop,
        genlock_dropped = dropped,
        path = %path.display(),
        "Recording finished"
    );

    // ==== Stage 4: Read back ====
    let mut reader = StreamReader::open(&path, 4096)?;
    let header = *reader.header();
    let mut throughput = ThroughputAggregator::new();
    while let Some(packet) = reader.read()? {
        throughput.observe(&packet);
    }

    println!("=== {} (port {}, {:?}) ===", stream.name, header.port, header.mode);
    println!("{}", throughput.summary());

    Ok(())
}
