//! # Stream File
//!
//! Flat-file persistence for one sensor stream.
//!
//! Layout: a 4-byte header (`port` u16 LE, `mode` u8, `profile` u8 with
//! `0xFF` meaning not applicable) followed by codec-framed packets with no
//! delimiters.
//!
//! Responsibilities:
//! - Write a header once, then append packets (`StreamWriter`)
//! - Read the header, then yield packets until end-of-stream (`StreamReader`)
//! - Replay a recording as a capture source (`ReplayCapture`)
//!
//! ```ignore
//! let mut writer = StreamWriter::create(&path, StreamHeader::new(3810, StreamMode::Mode1, None))?;
//! writer.write(&packet)?;
//! writer.close()?;
//!
//! let mut reader = StreamReader::open(&path, 4096)?;
//! while let Some(packet) = reader.read()? {
//!     // ...
//! }
//! ```

mod error;
mod header;
mod reader;
mod replay;
mod writer;

pub use error::{Result, StreamFileError};
pub use header::{decode_header, encode_header, HEADER_BYTES};
pub use reader::StreamReader;
pub use replay::ReplayCapture;
pub use writer::StreamWriter;
