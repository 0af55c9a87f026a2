//! Gatherer error types

use packet_codec::CodecError;
use stream_file::StreamFileError;
use thiserror::Error;
use transport::TransportError;

/// Gatherer error
#[derive(Debug, Error)]
pub enum GathererError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("stream {stream}: {source}")]
    Codec {
        stream: String,
        #[source]
        source: CodecError,
    },

    #[error(transparent)]
    File(#[from] StreamFileError),

    /// Operation before `open` or after `close`
    #[error("gatherer for {stream} is not open")]
    NotOpen { stream: String },
}

impl GathererError {
    pub fn codec(stream: impl Into<String>, source: CodecError) -> Self {
        Self::Codec {
            stream: stream.into(),
            source,
        }
    }

    pub fn not_open(stream: impl Into<String>) -> Self {
        Self::NotOpen {
            stream: stream.into(),
        }
    }

    /// Transport went away; the owner should close and reopen
    pub fn is_channel_closed(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_channel_closed())
    }
}

/// Gatherer Result type alias
pub type Result<T> = std::result::Result<T, GathererError>;
