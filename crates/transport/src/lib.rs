//! # Transport
//!
//! Message-oriented channels between a sensor stream and the relay server.
//!
//! Responsibilities:
//! - Name relay endpoints (`ws://{host}/data/{stream}/{push|pull}?header=0`)
//! - Abstract the message-channel collaborator (`ChannelConnector` / `MessageChannel`)
//! - Own one logical channel per stream and direction (`TransportSession`)
//!
//! Two connectors are provided: [`WebSocketConnector`] for the real relay and
//! [`MemoryRelay`], an in-process pub/sub hub for tests and demos.
//!
//! ```ignore
//! use transport::{Endpoint, TransportSession, WebSocketConnector};
//!
//! let endpoint = Endpoint::new("localhost:8000", "personal_video", StreamRole::Pull);
//! let mut session = TransportSession::open(&WebSocketConnector, endpoint).await?;
//! let message = session.receive().await?;
//! session.close().await?;
//! ```

mod channel;
mod endpoint;
mod error;
pub mod memory;
mod session;
pub mod websocket;

pub use channel::{ChannelConnector, MessageChannel};
pub use endpoint::Endpoint;
pub use error::{Result, TransportError};
pub use memory::{MemoryChannel, MemoryRelay};
pub use session::TransportSession;
pub use websocket::{WebSocketChannel, WebSocketConnector};
