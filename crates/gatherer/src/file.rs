//! FileGatherer - recorded stream behind the gatherer interface

use std::path::{Path, PathBuf};

use contracts::{FileSettings, Packet, StreamHeader};
use stream_file::StreamReader;
use tracing::{debug, instrument};

use crate::error::{GathererError, Result};
use crate::stream::PacketStream;

/// Reads packets from a stream file
///
/// Unlike network gatherers, running out of data is a normal `Ok(None)`.
pub struct FileGatherer {
    path: PathBuf,
    settings: FileSettings,
    reader: Option<StreamReader>,
}

impl FileGatherer {
    pub fn new(path: impl AsRef<Path>, settings: FileSettings) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            settings,
            reader: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the file and read its header
    #[instrument(name = "file_gatherer_open", skip(self), fields(path = %self.path.display()))]
    pub fn open(&mut self) -> Result<StreamHeader> {
        let reader = StreamReader::open_with(&self.path, &self.settings)?;
        let header = *reader.header();
        self.reader = Some(reader);
        debug!(port = header.port, "file gatherer opened");
        Ok(header)
    }

    /// Next packet, `Ok(None)` at end-of-stream
    pub fn get_next_packet(&mut self) -> Result<Option<Packet>> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| GathererError::not_open(self.path.display().to_string()))?;
        Ok(reader.read()?)
    }

    pub fn close(&mut self) {
        if let Some(reader) = self.reader.take() {
            debug!(packets = reader.packets_read(), "file gatherer closed");
        }
    }
}

impl PacketStream for FileGatherer {
    fn header(&self) -> Option<StreamHeader> {
        self.reader.as_ref().map(|r| *r.header())
    }

    async fn next_packet(&mut self) -> Result<Option<Packet>> {
        self.get_next_packet()
    }
}
