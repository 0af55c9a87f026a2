//! Relay endpoint naming
//!
//! Endpoints always ask for `header=0`: messages carry only codec-framed
//! packets, never a relay-side prefix.

use std::fmt;

use contracts::{RelaySettings, StreamConfig, StreamId, StreamRole};

/// One logical relay path: a stream name plus a direction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    stream: StreamId,
    role: StreamRole,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, stream: impl Into<StreamId>, role: StreamRole) -> Self {
        Self {
            host: host.into(),
            stream: stream.into(),
            role,
        }
    }

    /// Endpoint for `stream` using the relay settings
    pub fn for_stream(settings: &RelaySettings, stream: &StreamConfig, role: StreamRole) -> Self {
        Self::new(settings.host.clone(), stream.name.clone(), role)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Stream name, also the pub/sub topic
    pub fn stream(&self) -> &StreamId {
        &self.stream
    }

    pub fn role(&self) -> StreamRole {
        self.role
    }

    /// Full WebSocket URL
    pub fn url(&self) -> String {
        format!(
            "ws://{}/data/{}/{}?header=0",
            self.host,
            self.stream,
            self.role.as_str()
        )
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::StreamPort;

    #[test]
    fn test_url_convention() {
        let push = Endpoint::new("relay:8000", "rm_imu_gyroscope", StreamRole::Push);
        assert_eq!(
            push.url(),
            "ws://relay:8000/data/rm_imu_gyroscope/push?header=0"
        );

        let pull = Endpoint::new("relay:8000", "rm_imu_gyroscope", StreamRole::Pull);
        assert_eq!(
            pull.url(),
            "ws://relay:8000/data/rm_imu_gyroscope/pull?header=0"
        );
    }

    #[test]
    fn test_for_stream_uses_settings() {
        let settings = RelaySettings::default();
        let stream = StreamPort::PersonalVideo.preset();
        let endpoint = Endpoint::for_stream(&settings, &stream, StreamRole::Pull);
        assert_eq!(endpoint.host(), "localhost:8000");
        assert_eq!(endpoint.stream(), &stream.name);
        assert_eq!(
            endpoint.to_string(),
            "ws://localhost:8000/data/personal_video/pull?header=0"
        );
    }

    #[test]
    fn test_relay_header_never_requested() {
        let settings = RelaySettings {
            host: "relay:8000".to_string(),
        };
        let stream = StreamPort::RmImuGyroscope.preset();
        for role in [StreamRole::Push, StreamRole::Pull] {
            let url = Endpoint::for_stream(&settings, &stream, role).url();
            assert!(url.ends_with("?header=0"), "{url}");
        }
    }
}
