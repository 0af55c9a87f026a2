//! Errors shared across relay crates
//!
//! Three families: configuration, capture collaborator, stream identity.

use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Error type of the shared contracts
#[derive(Debug, Error)]
pub enum ContractError {
    /// Configuration text could not be parsed or serialized
    #[error("invalid config: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Configuration parsed but broke a rule; `field` is the offending path
    #[error("config rejected at {field}: {message}")]
    ConfigValidation { field: String, message: String },

    #[error("cannot open capture on port {port}: {message}")]
    CaptureOpen { port: u16, message: String },

    /// The capture device faulted mid-session
    #[error("capture on port {port} faulted: {message}")]
    CaptureFault { port: u16, message: String },

    /// The source has nothing left to produce (end of a replay)
    #[error("capture on port {port} has no more samples")]
    CaptureExhausted { port: u16 },

    #[error("stream mode byte {0} is not 0, 1 or 2")]
    UnknownMode(u8),

    #[error("port {0} is not a known sensor stream")]
    UnknownPort(u16),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ContractError {
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn capture_open(port: u16, message: impl Into<String>) -> Self {
        Self::CaptureOpen {
            port,
            message: message.into(),
        }
    }

    pub fn capture_fault(port: u16, message: impl Into<String>) -> Self {
        Self::CaptureFault {
            port,
            message: message.into(),
        }
    }
}
