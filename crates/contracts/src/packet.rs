//! Packet - one captured sensor sample

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Number of `f32` values in a pose (row-major 4x4 transform)
pub const POSE_VALUES: usize = 16;

/// Encoded size of a pose in bytes
pub const POSE_BYTES: usize = POSE_VALUES * std::mem::size_of::<f32>();

/// Spatial transform reported alongside a sample
pub type Pose = [f32; POSE_VALUES];

/// A single captured sample
///
/// The payload is opaque; only the timestamp and the optional pose are
/// understood by the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Sensor clock timestamp, assigned by the producer
    pub timestamp: u64,

    /// Sensor-specific payload (zero-copy)
    pub payload: Bytes,

    /// Optional pose, present only for modes that carry one
    pub pose: Option<Pose>,
}

impl Packet {
    /// Create a packet without pose
    pub fn new(timestamp: u64, payload: impl Into<Bytes>) -> Self {
        Self {
            timestamp,
            payload: payload.into(),
            pose: None,
        }
    }

    /// Create a packet carrying a pose
    pub fn with_pose(timestamp: u64, payload: impl Into<Bytes>, pose: Pose) -> Self {
        Self {
            timestamp,
            payload: payload.into(),
            pose: Some(pose),
        }
    }

    /// Payload length in bytes
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_size() {
        assert_eq!(POSE_BYTES, 64);
    }

    #[test]
    fn test_absent_pose_differs_from_zero_pose() {
        let without = Packet::new(1, vec![1u8, 2, 3]);
        let zeroed = Packet::with_pose(1, vec![1u8, 2, 3], [0.0; POSE_VALUES]);
        assert_ne!(without, zeroed);
        assert_eq!(without.payload_len(), 3);
    }
}
