//! Transport error types

use thiserror::Error;

/// Transport error
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying connection is gone
    #[error("channel closed for {endpoint}: {reason}")]
    ChannelClosed {
        /// Endpoint URL
        endpoint: String,
        /// What ended the connection
        reason: String,
    },

    /// Connecting to the relay failed
    #[error("failed to connect to {endpoint}: {message}")]
    Connect {
        /// Endpoint URL
        endpoint: String,
        /// Error message
        message: String,
    },

    /// Operation on a session that is not open
    #[error("session for {endpoint} is not open")]
    NotOpen {
        /// Endpoint URL
        endpoint: String,
    },

    /// Operation not allowed for the channel direction
    #[error("{operation} is not supported on a {role} channel ({endpoint})")]
    WrongRole {
        /// Endpoint URL
        endpoint: String,
        /// Channel role
        role: &'static str,
        /// Attempted operation
        operation: &'static str,
    },
}

impl TransportError {
    /// Create channel closed error
    pub fn closed(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ChannelClosed {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Create connect error
    pub fn connect(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connect {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    pub fn is_channel_closed(&self) -> bool {
        matches!(self, Self::ChannelClosed { .. })
    }
}

/// Transport Result type alias
pub type Result<T> = std::result::Result<T, TransportError>;
