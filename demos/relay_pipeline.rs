//! Relay Pipeline Example
//!
//! Pushes a mock stream to a running relay server over WebSocket and records
//! what comes back from the pull endpoint.
//!
//! Run with: cargo run -p demos --bin relay_pipeline -- relay.toml [stream] [output]

use std::path::{Path, PathBuf};

use config_loader::ConfigLoader;
use contracts::{RelayConfig, StreamPort};
use gatherer::{record, PacketGatherer};
use observability::{LogFormat, ObservabilityConfig};
use stream_file::StreamWriter;
use tokio_util::sync::CancellationToken;
use transport::WebSocketConnector;
use uploader::{MockCaptureConfig, MockCaptureSource, Uploader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init_with_config(
        ObservabilityConfig::new("relay_pipeline").with_format(LogFormat::Pretty),
    )?;

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => {
            tracing::info!(path = %path, "Loading relay config");
            ConfigLoader::load_from_path(Path::new(&path))?
        }
        None => default_config(),
    };

    let stream = match args.next() {
        Some(name) => config
            .stream(&name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("stream '{name}' not in config"))?,
        None => config
            .streams
            .first()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("config has no streams"))?,
    };
    let output = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("{}.bin", stream.name)));

    tracing::info!(
        relay = %config.relay.host,
        stream = %stream.name,
        output = %output.display(),
        "Starting Relay Pipeline Demo"
    );

    let cancel = CancellationToken::new();
    let source = MockCaptureSource::new(MockCaptureConfig {
        port: stream.port,
        mode: stream.mode,
        ..Default::default()
    });
    let uploader = Uploader::from_config(
        source,
        WebSocketConnector,
        &config,
        &stream,
        cancel.clone(),
    );
    let upload = tokio::spawn(uploader.run());

    let mut gatherer = PacketGatherer::from_config(WebSocketConnector, &config, &stream);
    gatherer.open().await?;
    let mut writer = StreamWriter::create(&output, stream.header())?;

    let stop = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, stopping");
            stop.cancel();
        }
    });

    let summary = record(&mut gatherer, &mut writer, &cancel, None).await?;
    gatherer.close().await?;
    writer.close()?;

    cancel.cancel();
    let stats = upload.await?;

    println!("=== {} -> {} ===", stream.name, output.display());
    println!("Stopped: {:?}", summary.stop);
    println!("Upload sessions: {}, failures: {}", stats.sessions_opened, stats.failures);
    println!("{}", summary.throughput);

    Ok(())
}

fn default_config() -> RelayConfig {
    RelayConfig {
        streams: vec![StreamPort::RmImuAccelerometer.preset()],
        ..Default::default()
    }
}
