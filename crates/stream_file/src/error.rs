//! Stream file error types

use contracts::ContractError;
use packet_codec::CodecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamFileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Header bytes could not be interpreted
    #[error("invalid stream header: {message}")]
    InvalidHeader { message: String },

    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    /// Write after `close`
    #[error("stream file is closed")]
    Closed,
}

impl StreamFileError {
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }
}

impl From<ContractError> for StreamFileError {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::Io(e) => Self::Io(e),
            other => Self::invalid_header(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, StreamFileError>;
