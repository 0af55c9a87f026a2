//! Fixed-width stream header

use contracts::{StreamHeader, StreamMode};

use crate::error::Result;

/// Encoded header size
pub const HEADER_BYTES: usize = 4;

pub fn encode_header(header: &StreamHeader) -> [u8; HEADER_BYTES] {
    let [lo, hi] = header.port.to_le_bytes();
    [lo, hi, header.mode.as_u8(), header.profile_byte()]
}

/// # Errors
/// `InvalidHeader` when the mode byte is unknown
pub fn decode_header(bytes: [u8; HEADER_BYTES]) -> Result<StreamHeader> {
    let port = u16::from_le_bytes([bytes[0], bytes[1]]);
    let mode = StreamMode::try_from(bytes[2])?;
    Ok(StreamHeader::new(
        port,
        mode,
        StreamHeader::profile_from_byte(bytes[3]),
    ))
}
