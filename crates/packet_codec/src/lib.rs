//! # Packet Codec
//!
//! Framing of sensor samples on the wire and on disk.
//!
//! Responsibilities:
//! - Encode/decode one [`Packet`] (timestamp + length-prefixed payload + optional pose)
//! - Append/strip the one-byte GOP alias tag on video streams
//! - Genlock: discard samples until a GOP boundary has been seen
//! - Reassemble packets from arbitrarily sized byte chunks
//!
//! ## Usage Example
//!
//! ```
//! use contracts::{Packet, StreamMode};
//! use packet_codec::{ChunkedUnpacker, PacketCodec};
//!
//! let codec = PacketCodec::new(StreamMode::Mode0);
//! let bytes = codec.encode(&Packet::new(7, vec![1u8, 2, 3])).unwrap();
//!
//! let mut unpacker = ChunkedUnpacker::new(codec);
//! unpacker.extend(&bytes[..5]);
//! assert!(unpacker.try_unpack().unwrap().is_none());
//! unpacker.extend(&bytes[5..]);
//! assert_eq!(unpacker.try_unpack().unwrap().unwrap().timestamp, 7);
//! ```

mod codec;
mod error;
mod gop;
mod unpacker;

pub use codec::{split_alias, PacketCodec, ALIAS_TAG_BYTES, PACKET_HEADER_BYTES};
pub use contracts::Packet;
pub use error::{CodecError, Result};
pub use gop::{GenlockDecoder, GopAliasEncoder};
pub use unpacker::ChunkedUnpacker;
