//! RelayConfig - Config Loader output
//!
//! Describes the relay endpoint, upload policy, file I/O and the streams to carry.

use serde::{Deserialize, Serialize};

use crate::{GathererKind, StreamHeader, StreamId, StreamMode, StreamPort};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete relay configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Relay server settings
    #[serde(default)]
    pub relay: RelaySettings,

    /// Upload loop settings
    #[serde(default)]
    pub upload: UploadSettings,

    /// Gatherer settings
    #[serde(default)]
    pub gatherer: GathererSettings,

    /// File reader/writer settings
    #[serde(default)]
    pub file: FileSettings,

    /// Streams carried by this relay
    #[serde(default)]
    pub streams: Vec<StreamConfig>,
}

impl RelayConfig {
    /// Look up a stream by name
    pub fn stream(&self, name: &str) -> Option<&StreamConfig> {
        self.streams.iter().find(|s| s.name == name)
    }
}

/// Relay server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySettings {
    /// Relay host (`host:port`)
    #[serde(default = "default_relay_host")]
    pub host: String,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            host: default_relay_host(),
        }
    }
}

fn default_relay_host() -> String {
    "localhost:8000".to_string()
}

/// Upload loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSettings {
    /// Delay before a torn-down session is reopened (milliseconds)
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Yield to the runtime after every send
    #[serde(default = "default_true")]
    pub yield_between_sends: bool,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            backoff_ms: default_backoff_ms(),
            yield_between_sends: true,
        }
    }
}

fn default_backoff_ms() -> u64 {
    3000
}

fn default_true() -> bool {
    true
}

/// How transport messages map onto packets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// One message carries exactly one packet
    #[default]
    Message,
    /// Messages are arbitrary chunks of a packet byte stream
    Chunked,
}

/// Gatherer settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GathererSettings {
    /// Message framing used by pull channels
    #[serde(default)]
    pub framing: Framing,
}

/// File reader/writer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSettings {
    /// Bytes requested per read
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Largest payload accepted before framing is declared corrupt
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

fn default_chunk_size() -> usize {
    4096
}

fn default_max_payload_bytes() -> usize {
    64 * 1024 * 1024
}

/// Per-stream parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Stream name, used in relay endpoint paths
    pub name: StreamId,

    /// Sensor port
    pub port: u16,

    /// Payload mode
    #[serde(default)]
    pub mode: StreamMode,

    /// Codec profile (`None` = not applicable)
    #[serde(default)]
    pub profile: Option<u8>,

    /// Encoded bitrate in bits per second (encoded streams only)
    #[serde(default)]
    pub bitrate: Option<u32>,

    /// Samples per GOP; `0` disables alias tagging
    #[serde(default)]
    pub gop_size: u8,

    /// Gatherer variant
    #[serde(default)]
    pub kind: GathererKind,
}

impl StreamConfig {
    /// Stream config for an arbitrary port with no profile and no GOP
    pub fn basic(name: impl Into<StreamId>, port: u16, mode: StreamMode) -> Self {
        Self {
            name: name.into(),
            port,
            mode,
            profile: None,
            bitrate: None,
            gop_size: 0,
            kind: GathererKind::Basic,
        }
    }

    /// Stream config for a GOP-structured video stream
    pub fn video(name: impl Into<StreamId>, port: u16, mode: StreamMode, gop_size: u8) -> Self {
        Self {
            gop_size,
            kind: GathererKind::Video,
            ..Self::basic(name, port, mode)
        }
    }

    /// Known port, if this stream is one of the standard sensors
    pub fn known_port(&self) -> Option<StreamPort> {
        StreamPort::try_from(self.port).ok()
    }

    /// Header persisted for recordings of this stream
    pub fn header(&self) -> StreamHeader {
        StreamHeader::from(self)
    }
}
