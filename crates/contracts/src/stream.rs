//! Stream identity - ports, modes, profiles and the persisted header

use serde::{Deserialize, Serialize};

use crate::{ContractError, StreamConfig};

/// Persisted profile byte meaning "no profile applies"
pub const PROFILE_NOT_APPLICABLE: u8 = u8::MAX;

/// Sensor clock ticks per second (hundreds of nanoseconds)
pub const TICKS_PER_SECOND: u64 = 10_000_000;

/// Stable sensor ports
///
/// Values are part of the persisted file format and are never renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u16)]
pub enum StreamPort {
    RmVlcLeftfront = 3800,
    RmVlcLeftleft = 3801,
    RmVlcRightfront = 3802,
    RmVlcRightright = 3803,
    RmDepthAhat = 3804,
    RmDepthLongthrow = 3805,
    RmImuAccelerometer = 3806,
    RmImuGyroscope = 3807,
    RmImuMagnetometer = 3808,
    PersonalVideo = 3810,
    Microphone = 3811,
    SpatialInput = 3812,
}

impl StreamPort {
    /// All ports the relay knows how to carry
    pub const ALL: [StreamPort; 12] = [
        StreamPort::RmVlcLeftfront,
        StreamPort::RmVlcLeftleft,
        StreamPort::RmVlcRightfront,
        StreamPort::RmVlcRightright,
        StreamPort::RmDepthAhat,
        StreamPort::RmDepthLongthrow,
        StreamPort::RmImuAccelerometer,
        StreamPort::RmImuGyroscope,
        StreamPort::RmImuMagnetometer,
        StreamPort::PersonalVideo,
        StreamPort::Microphone,
        StreamPort::SpatialInput,
    ];

    /// Numeric port value
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Stream name used in relay endpoint paths
    pub fn name(self) -> &'static str {
        match self {
            StreamPort::RmVlcLeftfront => "rm_vlc_leftfront",
            StreamPort::RmVlcLeftleft => "rm_vlc_leftleft",
            StreamPort::RmVlcRightfront => "rm_vlc_rightfront",
            StreamPort::RmVlcRightright => "rm_vlc_rightright",
            StreamPort::RmDepthAhat => "rm_depth_ahat",
            StreamPort::RmDepthLongthrow => "rm_depth_longthrow",
            StreamPort::RmImuAccelerometer => "rm_imu_accelerometer",
            StreamPort::RmImuGyroscope => "rm_imu_gyroscope",
            StreamPort::RmImuMagnetometer => "rm_imu_magnetometer",
            StreamPort::PersonalVideo => "personal_video",
            StreamPort::Microphone => "microphone",
            StreamPort::SpatialInput => "spatial_input",
        }
    }

    /// Nominal frame rate of the sensor
    pub fn frame_rate(self) -> u8 {
        match self {
            StreamPort::RmVlcLeftfront
            | StreamPort::RmVlcLeftleft
            | StreamPort::RmVlcRightfront
            | StreamPort::RmVlcRightright => 30,
            StreamPort::RmDepthAhat => 45,
            StreamPort::RmDepthLongthrow => 5,
            StreamPort::PersonalVideo => 15,
            _ => 0,
        }
    }

    /// Default stream configuration for this port
    pub fn preset(self) -> StreamConfig {
        let (mode, profile, bitrate) = match self {
            StreamPort::RmVlcLeftfront
            | StreamPort::RmVlcLeftleft
            | StreamPort::RmVlcRightfront
            | StreamPort::RmVlcRightright => (
                StreamMode::Mode1,
                Some(VideoProfile::H264Main as u8),
                Some(1024 * 1024),
            ),
            StreamPort::RmDepthAhat => (
                StreamMode::Mode1,
                Some(VideoProfile::H264Main as u8),
                Some(8 * 1024 * 1024),
            ),
            StreamPort::PersonalVideo => (
                StreamMode::Mode1,
                Some(VideoProfile::H264Main as u8),
                Some(5 * 1024 * 1024),
            ),
            StreamPort::RmDepthLongthrow
            | StreamPort::RmImuAccelerometer
            | StreamPort::RmImuGyroscope
            | StreamPort::RmImuMagnetometer => (StreamMode::Mode1, None, None),
            StreamPort::Microphone => {
                (StreamMode::Mode0, Some(AudioProfile::Aac24000 as u8), None)
            }
            StreamPort::SpatialInput => (StreamMode::Mode0, None, None),
        };

        let gop_size = match profile {
            Some(p) if self.is_video() => gop_size_for(VideoProfile::from_u8(p), self.frame_rate()),
            _ => 0,
        };

        StreamConfig {
            name: self.name().into(),
            port: self.as_u16(),
            mode,
            profile,
            bitrate,
            gop_size,
            kind: if gop_size > 0 {
                GathererKind::Video
            } else {
                GathererKind::Basic
            },
        }
    }

    fn is_video(self) -> bool {
        matches!(
            self,
            StreamPort::RmVlcLeftfront
                | StreamPort::RmVlcLeftleft
                | StreamPort::RmVlcRightfront
                | StreamPort::RmVlcRightright
                | StreamPort::RmDepthAhat
                | StreamPort::PersonalVideo
        )
    }
}

impl TryFrom<u16> for StreamPort {
    type Error = ContractError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        StreamPort::ALL
            .into_iter()
            .find(|p| p.as_u16() == value)
            .ok_or(ContractError::UnknownPort(value))
    }
}

/// Payload semantics selector for a port
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum StreamMode {
    /// Raw samples
    #[default]
    Mode0 = 0,
    /// Raw samples plus pose
    Mode1 = 1,
    /// Metadata only
    Mode2 = 2,
}

impl StreamMode {
    /// Whether packets in this mode carry a pose
    pub fn has_pose(self) -> bool {
        matches!(self, StreamMode::Mode1)
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for StreamMode {
    type Error = ContractError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(StreamMode::Mode0),
            1 => Ok(StreamMode::Mode1),
            2 => Ok(StreamMode::Mode2),
            other => Err(ContractError::UnknownMode(other)),
        }
    }
}

/// Video encoding profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum VideoProfile {
    H264Base = 0,
    H264Main = 1,
    H264High = 2,
    H265Main = 3,
    Raw = 0xFF,
}

impl VideoProfile {
    /// Unknown bytes are treated as raw
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => VideoProfile::H264Base,
            1 => VideoProfile::H264Main,
            2 => VideoProfile::H264High,
            3 => VideoProfile::H265Main,
            _ => VideoProfile::Raw,
        }
    }
}

/// Audio encoding profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum AudioProfile {
    Aac12000 = 0,
    Aac16000 = 1,
    Aac20000 = 2,
    Aac24000 = 3,
    Raw = 0xFF,
}

/// GOP length for a video profile at the given frame rate
///
/// Compressed profiles roll over once per second of video; raw video has no
/// GOP structure and is never tagged.
pub fn gop_size_for(profile: VideoProfile, frame_rate: u8) -> u8 {
    match profile {
        VideoProfile::Raw => 0,
        _ => frame_rate.max(1),
    }
}

/// Gatherer variant selected per stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GathererKind {
    /// Every received packet is surfaced
    #[default]
    Basic,
    /// Packets carry a GOP alias tag and playback starts on a GOP boundary
    Video,
}

/// Channel direction relative to the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamRole {
    Push,
    Pull,
}

impl StreamRole {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamRole::Push => "push",
            StreamRole::Pull => "pull",
        }
    }
}

/// Stream header, persisted once per file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamHeader {
    /// Sensor identity
    pub port: u16,

    /// Payload semantics for the port
    pub mode: StreamMode,

    /// Codec profile; `None` is persisted as [`PROFILE_NOT_APPLICABLE`]
    pub profile: Option<u8>,
}

impl StreamHeader {
    pub fn new(port: u16, mode: StreamMode, profile: Option<u8>) -> Self {
        Self {
            port,
            mode,
            profile,
        }
    }

    /// Profile byte as persisted
    pub fn profile_byte(&self) -> u8 {
        self.profile.unwrap_or(PROFILE_NOT_APPLICABLE)
    }

    /// Interpret a persisted profile byte
    pub fn profile_from_byte(byte: u8) -> Option<u8> {
        (byte != PROFILE_NOT_APPLICABLE).then_some(byte)
    }
}

impl From<&StreamConfig> for StreamHeader {
    fn from(config: &StreamConfig) -> Self {
        Self::new(config.port, config.mode, config.profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_round_trip() {
        for port in StreamPort::ALL {
            assert_eq!(StreamPort::try_from(port.as_u16()).unwrap(), port);
        }
        assert!(StreamPort::try_from(3809).is_err());
    }

    #[test]
    fn test_video_presets_are_tagged() {
        let vlc = StreamPort::RmVlcLeftfront.preset();
        assert_eq!(vlc.kind, GathererKind::Video);
        assert_eq!(vlc.gop_size, 30);
        assert_eq!(vlc.name, "rm_vlc_leftfront");

        let pv = StreamPort::PersonalVideo.preset();
        assert_eq!(pv.gop_size, 15);
    }

    #[test]
    fn test_non_video_presets_are_basic() {
        for port in [
            StreamPort::RmDepthLongthrow,
            StreamPort::RmImuGyroscope,
            StreamPort::Microphone,
            StreamPort::SpatialInput,
        ] {
            let preset = port.preset();
            assert_eq!(preset.kind, GathererKind::Basic, "{:?}", port);
            assert_eq!(preset.gop_size, 0);
        }
    }

    #[test]
    fn test_raw_profile_has_no_gop() {
        assert_eq!(gop_size_for(VideoProfile::Raw, 30), 0);
        assert_eq!(gop_size_for(VideoProfile::H265Main, 45), 45);
    }

    #[test]
    fn test_profile_sentinel() {
        let header = StreamHeader::new(3, StreamMode::Mode1, None);
        assert_eq!(header.profile_byte(), 0xFF);
        assert_eq!(StreamHeader::profile_from_byte(0xFF), None);
        assert_eq!(StreamHeader::profile_from_byte(1), Some(1));
    }

    #[test]
    fn test_mode_pose() {
        assert!(StreamMode::Mode1.has_pose());
        assert!(!StreamMode::Mode0.has_pose());
        assert!(StreamMode::try_from(7).is_err());
    }
}
