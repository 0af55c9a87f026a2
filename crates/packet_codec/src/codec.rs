//! Packet layout
//!
//! Little-endian, fixed order:
//!
//! ```text
//! | timestamp u64 | payload_len u32 | payload ... | pose 16 x f32 (mode 1 only) |
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use contracts::{Packet, Pose, StreamMode, POSE_BYTES, POSE_VALUES};

use crate::error::{CodecError, Result};

/// Bytes before the payload (timestamp + payload length)
pub const PACKET_HEADER_BYTES: usize = 8 + 4;

/// Bytes appended to a GOP-tagged packet
pub const ALIAS_TAG_BYTES: usize = 1;

/// Packet encoder/decoder for one stream mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketCodec {
    mode: StreamMode,
    max_payload: usize,
}

impl PacketCodec {
    /// Create a codec for the given mode
    pub fn new(mode: StreamMode) -> Self {
        Self {
            mode,
            max_payload: u32::MAX as usize,
        }
    }

    /// Reject payload lengths above `max_payload` as corrupt framing
    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload.min(u32::MAX as usize);
        self
    }

    pub fn mode(&self) -> StreamMode {
        self.mode
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// Pose bytes carried by every packet of this mode
    pub fn pose_len(&self) -> usize {
        if self.mode.has_pose() {
            POSE_BYTES
        } else {
            0
        }
    }

    /// Encoded size of `packet`
    pub fn encoded_len(&self, packet: &Packet) -> usize {
        PACKET_HEADER_BYTES + packet.payload.len() + self.pose_len()
    }

    /// Encode a packet into a fresh buffer
    ///
    /// The buffer reserves room for an alias tag so the GOP encoder never
    /// reallocates.
    pub fn encode(&self, packet: &Packet) -> Result<BytesMut> {
        let mut buf = BytesMut::with_capacity(self.encoded_len(packet) + ALIAS_TAG_BYTES);
        self.encode_into(packet, &mut buf)?;
        Ok(buf)
    }

    /// Append the encoding of `packet` to `buf`
    pub fn encode_into(&self, packet: &Packet, buf: &mut BytesMut) -> Result<()> {
        let expected = self.mode.has_pose();
        if expected != packet.pose.is_some() {
            return Err(CodecError::PoseMismatch {
                mode: self.mode.as_u8(),
                expected,
                actual: packet.pose.is_some(),
            });
        }

        let payload_len = packet.payload.len();
        if payload_len > self.max_payload {
            return Err(CodecError::corrupt(format!(
                "payload of {payload_len} bytes exceeds limit of {}",
                self.max_payload
            )));
        }

        buf.reserve(self.encoded_len(packet));
        buf.put_u64_le(packet.timestamp);
        buf.put_u32_le(payload_len as u32);
        buf.put_slice(&packet.payload);
        if let Some(pose) = &packet.pose {
            for value in pose {
                buf.put_f32_le(*value);
            }
        }
        Ok(())
    }

    /// Length of the packet at the front of `buf`
    ///
    /// Returns `Ok(None)` while the fixed header itself is incomplete.
    pub fn frame_len(&self, buf: &[u8]) -> Result<Option<usize>> {
        if buf.len() < PACKET_HEADER_BYTES {
            return Ok(None);
        }
        let payload_len = self.payload_len_field(buf)?;
        Ok(Some(PACKET_HEADER_BYTES + payload_len + self.pose_len()))
    }

    /// Decode exactly one packet from a whole message
    ///
    /// # Errors
    /// - `IncompleteData` when `data` is shorter than the packet it declares
    /// - `CorruptFraming` when bytes are left over or the length is out of range
    pub fn decode(&self, data: Bytes) -> Result<Packet> {
        let available = data.len();
        let Some(total) = self.frame_len(&data)? else {
            return Err(CodecError::IncompleteData {
                needed: PACKET_HEADER_BYTES,
                available,
            });
        };

        if available < total {
            return Err(CodecError::IncompleteData {
                needed: total,
                available,
            });
        }
        if available > total {
            return Err(CodecError::corrupt(format!(
                "{} trailing bytes after packet of {total} bytes",
                available - total
            )));
        }

        let mut header = &data[..PACKET_HEADER_BYTES];
        let timestamp = header.get_u64_le();
        let payload_end = total - self.pose_len();
        let payload = data.slice(PACKET_HEADER_BYTES..payload_end);

        let pose = if self.mode.has_pose() {
            Some(read_pose(&data[payload_end..total]))
        } else {
            None
        };

        Ok(Packet {
            timestamp,
            payload,
            pose,
        })
    }

    /// Split off the trailing alias tag, then decode the packet
    pub fn decode_aliased(&self, data: Bytes) -> Result<(u8, Packet)> {
        let (tag, raw) = split_alias(data)?;
        Ok((tag, self.decode(raw)?))
    }

    fn payload_len_field(&self, buf: &[u8]) -> Result<usize> {
        let mut field = &buf[8..PACKET_HEADER_BYTES];
        let payload_len = field.get_u32_le() as usize;
        if payload_len > self.max_payload {
            return Err(CodecError::corrupt(format!(
                "declared payload of {payload_len} bytes exceeds limit of {}",
                self.max_payload
            )));
        }
        Ok(payload_len)
    }
}

/// Strip the trailing alias byte from a raw tagged message
pub fn split_alias(mut data: Bytes) -> Result<(u8, Bytes)> {
    let Some(&tag) = data.last() else {
        return Err(CodecError::MissingAliasTag);
    };
    data.truncate(data.len() - ALIAS_TAG_BYTES);
    Ok((tag, data))
}

fn read_pose(mut bytes: &[u8]) -> Pose {
    let mut pose = [0.0f32; POSE_VALUES];
    for value in pose.iter_mut() {
        *value = bytes.get_f32_le();
    }
    pose
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose() -> Pose {
        let mut pose = [0.0f32; POSE_VALUES];
        for (i, v) in pose.iter_mut().enumerate() {
            *v = i as f32 * 0.5 - 3.0;
        }
        pose
    }

    #[test]
    fn test_round_trip_without_pose() {
        let codec = PacketCodec::new(StreamMode::Mode0);
        let packet = Packet::new(123_456_789, vec![9u8; 300]);
        let bytes = codec.encode(&packet).unwrap().freeze();
        assert_eq!(bytes.len(), PACKET_HEADER_BYTES + 300);
        assert_eq!(codec.decode(bytes).unwrap(), packet);
    }

    #[test]
    fn test_round_trip_with_pose() {
        let codec = PacketCodec::new(StreamMode::Mode1);
        let packet = Packet::with_pose(u64::MAX, vec![1u8, 2, 3], pose());
        let bytes = codec.encode(&packet).unwrap().freeze();
        assert_eq!(bytes.len(), PACKET_HEADER_BYTES + 3 + POSE_BYTES);
        assert_eq!(codec.decode(bytes).unwrap(), packet);
    }

    #[test]
    fn test_empty_payload() {
        let codec = PacketCodec::new(StreamMode::Mode2);
        let packet = Packet::new(0, Bytes::new());
        let bytes = codec.encode(&packet).unwrap().freeze();
        assert_eq!(codec.decode(bytes).unwrap(), packet);
    }

    #[test]
    fn test_layout_is_little_endian() {
        let codec = PacketCodec::new(StreamMode::Mode0);
        let bytes = codec.encode(&Packet::new(0x0102, vec![0xAAu8])).unwrap();
        assert_eq!(
            &bytes[..],
            &[0x02u8, 0x01, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0xAA]
        );
    }

    #[test]
    fn test_truncated_input_is_incomplete() {
        let codec = PacketCodec::new(StreamMode::Mode1);
        let bytes = codec
            .encode(&Packet::with_pose(5, vec![7u8; 10], pose()))
            .unwrap()
            .freeze();

        for cut in 0..bytes.len() {
            let err = codec.decode(bytes.slice(..cut)).unwrap_err();
            assert!(err.is_incomplete(), "cut at {cut}: {err:?}");
        }
    }

    #[test]
    fn test_trailing_bytes_are_corrupt() {
        let codec = PacketCodec::new(StreamMode::Mode0);
        let mut bytes = codec.encode(&Packet::new(1, vec![1u8])).unwrap();
        bytes.extend_from_slice(&[0, 0]);
        assert!(matches!(
            codec.decode(bytes.freeze()),
            Err(CodecError::CorruptFraming { .. })
        ));
    }

    #[test]
    fn test_oversized_length_is_corrupt() {
        let codec = PacketCodec::new(StreamMode::Mode0).with_max_payload(16);
        let mut raw = BytesMut::new();
        raw.put_u64_le(1);
        raw.put_u32_le(17);
        assert!(matches!(
            codec.frame_len(&raw),
            Err(CodecError::CorruptFraming { .. })
        ));
    }

    #[test]
    fn test_pose_must_match_mode() {
        let with_pose = PacketCodec::new(StreamMode::Mode1);
        let without_pose = PacketCodec::new(StreamMode::Mode0);

        assert!(matches!(
            with_pose.encode(&Packet::new(1, vec![1u8])),
            Err(CodecError::PoseMismatch { expected: true, actual: false, .. })
        ));
        assert!(matches!(
            without_pose.encode(&Packet::with_pose(1, vec![1u8], pose())),
            Err(CodecError::PoseMismatch { expected: false, actual: true, .. })
        ));
    }

    #[test]
    fn test_decode_aliased() {
        let codec = PacketCodec::new(StreamMode::Mode0);
        let packet = Packet::new(42, vec![4u8, 2]);
        let mut bytes = codec.encode(&packet).unwrap();
        bytes.put_u8(17);

        let (tag, decoded) = codec.decode_aliased(bytes.freeze()).unwrap();
        assert_eq!(tag, 17);
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_split_alias_on_empty_message() {
        assert_eq!(split_alias(Bytes::new()), Err(CodecError::MissingAliasTag));
    }
}
