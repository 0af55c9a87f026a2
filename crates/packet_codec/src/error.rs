//! Codec error types

use thiserror::Error;

/// Codec error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Not enough bytes yet; the caller should wait for more input
    #[error("incomplete data: need {needed} bytes, have {available}")]
    IncompleteData {
        /// Bytes required to finish the current packet
        needed: usize,
        /// Bytes currently available
        available: usize,
    },

    /// Internally inconsistent framing; the packet cannot be trusted
    #[error("corrupt framing: {message}")]
    CorruptFraming {
        /// What was inconsistent
        message: String,
    },

    /// A tagged message did not contain the alias byte
    #[error("message too short to carry a GOP alias tag")]
    MissingAliasTag,

    /// Pose presence contradicts the stream mode
    #[error("pose mismatch: mode {mode} expects pose={expected}, packet has pose={actual}")]
    PoseMismatch {
        /// Stream mode byte
        mode: u8,
        /// Whether the mode carries a pose
        expected: bool,
        /// Whether the packet carried a pose
        actual: bool,
    },
}

impl CodecError {
    /// Create corrupt framing error
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::CorruptFraming {
            message: message.into(),
        }
    }

    /// `true` when more bytes would resolve the error
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::IncompleteData { .. })
    }
}

/// Codec Result type alias
pub type Result<T> = std::result::Result<T, CodecError>;
