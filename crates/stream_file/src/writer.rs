//! StreamWriter - header once, then packets

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use bytes::BytesMut;
use contracts::{Packet, StreamHeader};
use packet_codec::PacketCodec;
use tracing::{debug, instrument, warn};

use crate::error::{Result, StreamFileError};
use crate::header::encode_header;

/// Appends codec-framed packets after a stream header
pub struct StreamWriter<W: Write = File> {
    inner: Option<BufWriter<W>>,
    header: StreamHeader,
    codec: PacketCodec,
    scratch: BytesMut,
    packets_written: u64,
}

impl StreamWriter<File> {
    /// Create (or truncate) `path` and write the header
    #[instrument(name = "stream_writer_create", skip(path), fields(path = %path.as_ref().display(), port = header.port))]
    pub fn create(path: impl AsRef<Path>, header: StreamHeader) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Self::new(file, header)
    }
}

impl<W: Write> StreamWriter<W> {
    /// Wrap any writer; the header is written immediately
    pub fn new(writer: W, header: StreamHeader) -> Result<Self> {
        let mut inner = BufWriter::new(writer);
        inner.write_all(&encode_header(&header))?;
        debug!(port = header.port, mode = header.mode.as_u8(), "stream header written");
        Ok(Self {
            inner: Some(inner),
            header,
            codec: PacketCodec::new(header.mode),
            scratch: BytesMut::new(),
            packets_written: 0,
        })
    }

    pub fn header(&self) -> &StreamHeader {
        &self.header
    }

    pub fn packets_written(&self) -> u64 {
        self.packets_written
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    /// Append one packet
    ///
    /// # Errors
    /// `Codec` if the packet's pose does not match the header mode
    pub fn write(&mut self, packet: &Packet) -> Result<()> {
        let inner = self.inner.as_mut().ok_or(StreamFileError::Closed)?;
        self.scratch.clear();
        self.codec.encode_into(packet, &mut self.scratch)?;
        inner.write_all(&self.scratch)?;
        self.packets_written += 1;
        observability::record_file_packet("write");
        Ok(())
    }

    /// Flush and release the file; closing twice is a no-op
    pub fn close(&mut self) -> Result<()> {
        if let Some(inner) = self.inner.take() {
            self.finish_inner(inner)?;
        }
        Ok(())
    }

    /// Flush and hand back the underlying writer
    pub fn into_inner(mut self) -> Result<W> {
        let inner = self.inner.take().ok_or(StreamFileError::Closed)?;
        self.finish_inner(inner)
    }

    fn finish_inner(&self, inner: BufWriter<W>) -> Result<W> {
        let writer = inner.into_inner().map_err(|e| e.into_error())?;
        debug!(
            port = self.header.port,
            packets = self.packets_written,
            "stream file closed"
        );
        Ok(writer)
    }
}

impl<W: Write> Drop for StreamWriter<W> {
    fn drop(&mut self) {
        if let Some(mut inner) = self.inner.take() {
            if let Err(e) = inner.flush() {
                warn!(port = self.header.port, error = %e, "flush on drop failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{StreamMode, POSE_VALUES};
    use packet_codec::PACKET_HEADER_BYTES;

    #[test]
    fn test_header_then_packets() {
        let header = StreamHeader::new(3811, StreamMode::Mode0, Some(3));
        let mut writer = StreamWriter::new(Vec::new(), header).unwrap();
        writer.write(&Packet::new(1, vec![1u8, 2])).unwrap();
        writer.write(&Packet::new(2, vec![3u8])).unwrap();
        assert_eq!(writer.packets_written(), 2);

        let bytes = writer.into_inner().unwrap();
        assert_eq!(&bytes[..4], &[0xE3, 0x0E, 0, 3]);
        assert_eq!(bytes.len(), 4 + 2 * PACKET_HEADER_BYTES + 3);
    }

    #[test]
    fn test_pose_checked_against_mode() {
        let header = StreamHeader::new(3806, StreamMode::Mode1, None);
        let mut writer = StreamWriter::new(Vec::new(), header).unwrap();
        assert!(matches!(
            writer.write(&Packet::new(1, vec![0u8])),
            Err(StreamFileError::Codec(_))
        ));
        writer
            .write(&Packet::with_pose(1, vec![0u8], [0.0; POSE_VALUES]))
            .unwrap();
    }

    #[test]
    fn test_write_after_close() {
        let header = StreamHeader::new(3812, StreamMode::Mode0, None);
        let mut writer = StreamWriter::new(Vec::new(), header).unwrap();
        writer.close().unwrap();
        writer.close().unwrap();
        assert!(matches!(
            writer.write(&Packet::new(0, vec![0u8])),
            Err(StreamFileError::Closed)
        ));
    }
}
