//! # Integration Tests
//!
//! End-to-end tests across crates, no relay server or device required.
//!
//! Covers:
//! - Upload → in-memory relay → gatherer → recorder → reader
//! - Genlock when a viewer joins a video stream mid-GOP
//! - Relay loss during a recording
//! - Replaying a recording through the upload path
//! - Config-driven wiring

#[cfg(test)]
mod contract_tests {
    use contracts::{StreamPort, StreamRole};
    use transport::Endpoint;

    #[test]
    fn test_preset_endpoints() {
        for port in StreamPort::ALL {
            let preset = port.preset();
            let endpoint = Endpoint::new("relay:8000", preset.name.clone(), StreamRole::Push);
            assert_eq!(
                endpoint.url(),
                format!("ws://relay:8000/data/{}/push?header=0", port.name())
            );
        }
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::Path;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        Packet, StreamConfig, StreamHeader, StreamMode, StreamRole, UploadSettings,
    };
    use gatherer::{record, FileGatherer, PacketGatherer, StopReason};
    use stream_file::{ReplayCapture, StreamReader, StreamWriter};
    use tokio_util::sync::CancellationToken;
    use transport::{Endpoint, MemoryRelay};
    use uploader::{MockCaptureSource, Uploader};

    const HOST: &str = "memory";

    fn sequence_of(packet: &Packet) -> u64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&packet.payload[..8]);
        u64::from_le_bytes(raw)
    }

    fn read_all(path: &Path) -> (StreamHeader, Vec<Packet>) {
        let mut reader = StreamReader::open(path, 4096).unwrap();
        let header = *reader.header();
        let mut packets = Vec::new();
        while let Some(packet) = reader.read().unwrap() {
            packets.push(packet);
        }
        (header, packets)
    }

    fn uploader_for(
        source: impl contracts::CaptureSource + 'static,
        relay: &MemoryRelay,
        stream: &StreamConfig,
        backoff_ms: u64,
        cancel: &CancellationToken,
    ) -> tokio::task::JoinHandle<uploader::UploadStats> {
        let uploader = Uploader::new(
            source,
            relay.clone(),
            Endpoint::new(HOST, stream.name.clone(), StreamRole::Push),
            stream.clone(),
            UploadSettings {
                backoff_ms,
                yield_between_sends: true,
            },
            cancel.clone(),
        );
        tokio::spawn(uploader.run())
    }

    /// MockCaptureSource -> Uploader -> MemoryRelay -> video gatherer -> file
    ///
    /// The gatherer joins after the upload started, so playback must begin
    /// on a GOP boundary.
    #[tokio::test]
    async fn test_e2e_video_join_mid_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pv.bin");

        let relay = MemoryRelay::new(256);
        let stream = StreamConfig::video("personal_video", 3810, StreamMode::Mode1, 3);
        let cancel = CancellationToken::new();
        let upload = uploader_for(
            MockCaptureSource::video(3810, 500.0, 32),
            &relay,
            &stream,
            50,
            &cancel,
        );

        tokio::time::sleep(Duration::from_millis(25)).await;

        let mut gatherer = PacketGatherer::new(
            relay.clone(),
            Endpoint::new(HOST, stream.name.clone(), StreamRole::Pull),
            stream.clone(),
        );
        gatherer.open().await.unwrap();
        let mut writer = StreamWriter::create(&path, stream.header()).unwrap();
        let summary = record(&mut gatherer, &mut writer, &CancellationToken::new(), Some(12))
            .await
            .unwrap();
        gatherer.close().await.unwrap();
        writer.close().unwrap();

        cancel.cancel();
        let stats = upload.await.unwrap();
        assert_eq!(stats.failures, 0);
        assert_eq!(summary.stop, StopReason::Limit);

        let (header, packets) = read_all(&path);
        assert_eq!(header, stream.header());
        assert_eq!(packets.len(), 12);
        let first = sequence_of(&packets[0]);
        assert_eq!(first % 3, 0, "playback started mid-GOP at {first}");
        for (i, packet) in packets.iter().enumerate() {
            assert_eq!(sequence_of(packet), first + i as u64);
            assert!(packet.pose.is_some());
        }
    }

    /// Relay loss ends the recording cleanly and the uploader keeps retrying
    #[tokio::test]
    async fn test_e2e_relay_loss_during_recording() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("imu.bin");

        let relay = MemoryRelay::new(64);
        let stream = StreamConfig::basic("rm_imu_accelerometer", 3806, StreamMode::Mode1);
        let cancel = CancellationToken::new();

        let mut gatherer = PacketGatherer::new(
            relay.clone(),
            Endpoint::new(HOST, stream.name.clone(), StreamRole::Pull),
            stream.clone(),
        );
        gatherer.open().await.unwrap();
        let upload = uploader_for(
            MockCaptureSource::imu(3806, 400.0),
            &relay,
            &stream,
            20,
            &cancel,
        );

        let shutdown = {
            let relay = relay.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(60)).await;
                relay.shutdown();
            })
        };

        let mut writer = StreamWriter::create(&path, stream.header()).unwrap();
        let summary = record(&mut gatherer, &mut writer, &CancellationToken::new(), None)
            .await
            .unwrap();
        writer.close().unwrap();
        gatherer.close().await.unwrap();
        shutdown.await.unwrap();

        assert_eq!(summary.stop, StopReason::ChannelClosed);
        assert!(summary.packets > 0);

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        let stats = upload.await.unwrap();
        assert!(stats.failures >= 1);

        let (_, packets) = read_all(&path);
        assert_eq!(packets.len() as u64, summary.packets);
    }

    /// Recording -> ReplayCapture -> Uploader -> gatherer reproduces the packets
    #[tokio::test]
    async fn test_e2e_replay_recording() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mic.bin");
        let stream = StreamConfig::basic("microphone", 3811, StreamMode::Mode0);

        let recorded: Vec<Packet> = (0..5u64)
            .map(|i| Packet::new(1_000 + i * 213_333, vec![i as u8; 40 + i as usize]))
            .collect();
        let mut writer = StreamWriter::create(&path, stream.header()).unwrap();
        for packet in &recorded {
            writer.write(packet).unwrap();
        }
        writer.close().unwrap();

        let relay = MemoryRelay::new(16);
        let mut gatherer = PacketGatherer::new(
            relay.clone(),
            Endpoint::new(HOST, stream.name.clone(), StreamRole::Pull),
            stream.clone(),
        );
        gatherer.open().await.unwrap();

        let cancel = CancellationToken::new();
        let replay = ReplayCapture::new(&path, 4096).unwrap();
        let upload = uploader_for(replay, &relay, &stream, 10_000, &cancel);

        let mut received = Vec::new();
        for _ in 0..recorded.len() {
            received.push(gatherer.get_next_packet().await.unwrap());
        }
        assert_eq!(received, recorded);

        gatherer.close().await.unwrap();
        cancel.cancel();
        let stats = upload.await.unwrap();
        assert_eq!(stats.packets_sent, 5);
        assert_eq!(stats.sessions_opened, 1);
    }

    /// Config-driven wiring with chunked framing on the pull side
    #[tokio::test]
    async fn test_e2e_from_config_chunked() {
        let config = ConfigLoader::load_from_str(
            r#"
[relay]
host = "memory"

[upload]
backoff_ms = 100

[gatherer]
framing = "chunked"

[[streams]]
name = "rm_vlc_leftfront"
port = 3800
mode = "mode1"
profile = 1
gop_size = 30
kind = "video"
"#,
            ConfigFormat::Toml,
        )
        .unwrap();
        let stream = config.stream("rm_vlc_leftfront").unwrap().clone();

        let relay = MemoryRelay::new(64);
        let mut gatherer = PacketGatherer::from_config(relay.clone(), &config, &stream);
        gatherer.open().await.unwrap();

        let cancel = CancellationToken::new();
        let uploader = Uploader::from_config(
            MockCaptureSource::video(3800, 1000.0, 128),
            relay.clone(),
            &config,
            &stream,
            cancel.clone(),
        );
        let upload = tokio::spawn(uploader.run());

        let mut last = None;
        for _ in 0..40 {
            let packet = gatherer.get_next_packet().await.unwrap();
            let seq = sequence_of(&packet);
            if let Some(prev) = last {
                assert_eq!(seq, prev + 1);
            }
            last = Some(seq);
        }
        assert_eq!(gatherer.genlock_dropped(), 0);

        gatherer.close().await.unwrap();
        cancel.cancel();
        upload.await.unwrap();
    }

    /// File gatherer and network gatherer share the recorder
    #[tokio::test]
    async fn test_e2e_file_to_file_copy() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.bin");
        let dst = dir.path().join("dst.bin");
        let header = StreamHeader::new(3, StreamMode::Mode1, None);

        let mut writer = StreamWriter::create(&src, header).unwrap();
        for i in 0..5u64 {
            writer
                .write(&Packet::with_pose(i, vec![i as u8; 3], [i as f32; 16]))
                .unwrap();
        }
        writer.close().unwrap();

        let mut source = FileGatherer::new(&src, Default::default());
        let header = source.open().unwrap();
        let mut out = StreamWriter::create(&dst, header).unwrap();
        let summary = record(&mut source, &mut out, &CancellationToken::new(), None)
            .await
            .unwrap();
        out.close().unwrap();

        assert_eq!(summary.stop, StopReason::EndOfStream);
        let (read_header, packets) = read_all(&dst);
        assert_eq!(read_header, StreamHeader::new(3, StreamMode::Mode1, None));
        assert_eq!(packets.len(), 5);
    }
}
