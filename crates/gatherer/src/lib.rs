//! # Gatherer
//!
//! Turns relay messages (or a recorded file) into decoded, aligned packets
//! for one sensor stream.
//!
//! Responsibilities:
//! - Basic gatherer: receive, decode, surface every packet
//! - Video gatherer: strip the GOP alias tag and hold packets back until
//!   genlock is acquired on the first GOP boundary
//! - Message or chunked framing of transport messages
//! - File gatherer and recorder over the same `PacketStream` interface
//!
//! ```ignore
//! let mut gatherer = PacketGatherer::from_config(WebSocketConnector, &config, &stream);
//! gatherer.open().await?;
//! loop {
//!     let packet = gatherer.get_next_packet().await?;
//!     // ...
//! }
//! ```

mod error;
mod file;
mod network;
mod recorder;
mod stream;

pub use error::{GathererError, Result};
pub use file::FileGatherer;
pub use network::PacketGatherer;
pub use recorder::{record, RecordSummary, StopReason};
pub use stream::PacketStream;
