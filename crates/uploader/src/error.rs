//! Upload error types

use contracts::ContractError;
use packet_codec::CodecError;
use thiserror::Error;
use transport::TransportError;

/// Anything that ends an upload session
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("capture failed: {0}")]
    Capture(#[from] ContractError),

    #[error("encode failed: {0}")]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl UploadError {
    /// Metric label for the failing stage
    pub fn stage(&self) -> &'static str {
        match self {
            UploadError::Capture(_) => "capture",
            UploadError::Codec(_) => "codec",
            UploadError::Transport(_) => "transport",
        }
    }
}

pub type Result<T> = std::result::Result<T, UploadError>;
