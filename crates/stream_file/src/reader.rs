//! StreamReader - header, then packets until end-of-stream

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use contracts::{FileSettings, Packet, StreamHeader};
use packet_codec::{ChunkedUnpacker, PacketCodec};
use tracing::{debug, instrument, trace, warn};

use crate::error::{Result, StreamFileError};
use crate::header::{decode_header, HEADER_BYTES};

/// Reads a stream file chunk by chunk
///
/// End-of-input is detected when a chunk comes back short. Packets fully
/// contained in that final chunk are still returned before `Ok(None)`.
#[derive(Debug)]
pub struct StreamReader<R: Read = File> {
    source: R,
    header: StreamHeader,
    unpacker: ChunkedUnpacker,
    chunk: Vec<u8>,
    eof: bool,
    packets_read: u64,
}

impl StreamReader<File> {
    /// Open `path` reading `chunk_size` bytes at a time
    #[instrument(name = "stream_reader_open", skip(path), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, chunk_size: usize) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::new(file, chunk_size)
    }

    /// Open `path` with chunk size and payload limit from settings
    pub fn open_with(path: impl AsRef<Path>, settings: &FileSettings) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::with_max_payload(file, settings.chunk_size, settings.max_payload_bytes)
    }
}

impl<R: Read> StreamReader<R> {
    /// Read the header from `source`
    pub fn new(source: R, chunk_size: usize) -> Result<Self> {
        Self::with_max_payload(source, chunk_size, FileSettings::default().max_payload_bytes)
    }

    pub fn with_max_payload(mut source: R, chunk_size: usize, max_payload: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(StreamFileError::InvalidChunkSize);
        }

        let mut raw = [0u8; HEADER_BYTES];
        source.read_exact(&mut raw).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => {
                StreamFileError::invalid_header("file is shorter than the stream header")
            }
            _ => StreamFileError::Io(e),
        })?;
        let header = decode_header(raw)?;
        debug!(port = header.port, mode = header.mode.as_u8(), profile = ?header.profile, "stream header read");

        let codec = PacketCodec::new(header.mode).with_max_payload(max_payload);
        Ok(Self {
            source,
            header,
            unpacker: ChunkedUnpacker::new(codec),
            chunk: vec![0u8; chunk_size],
            eof: false,
            packets_read: 0,
        })
    }

    pub fn header(&self) -> &StreamHeader {
        &self.header
    }

    pub fn packets_read(&self) -> u64 {
        self.packets_read
    }

    /// Next packet, or `Ok(None)` at end-of-stream
    ///
    /// # Errors
    /// `Codec(CorruptFraming)` when a length field is out of range
    pub fn read(&mut self) -> Result<Option<Packet>> {
        loop {
            if let Some(packet) = self.unpacker.try_unpack()? {
                self.packets_read += 1;
                observability::record_file_packet("read");
                return Ok(Some(packet));
            }
            if self.eof {
                let trailing = self.unpacker.buffered_len();
                if trailing > 0 {
                    warn!(port = self.header.port, trailing, "discarding truncated packet at end of file");
                    self.unpacker = ChunkedUnpacker::new(*self.unpacker.codec());
                }
                return Ok(None);
            }
            self.read_chunk()?;
        }
    }

    /// Fill one chunk, short only at end of input
    fn read_chunk(&mut self) -> Result<()> {
        let mut filled = 0;
        while filled < self.chunk.len() {
            match self.source.read(&mut self.chunk[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.eof = filled < self.chunk.len();
        trace!(filled, eof = self.eof, "chunk read");
        self.unpacker.extend(&self.chunk[..filled]);
        Ok(())
    }
}

impl<R: Read> Iterator for StreamReader<R> {
    type Item = Result<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read().transpose()
    }
}
