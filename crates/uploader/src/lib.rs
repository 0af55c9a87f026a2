//! # Uploader
//!
//! Pushes one capture source to the relay, forever.
//!
//! Responsibilities:
//! - Capture, encode, GOP-tag and send packets one at a time
//! - Tear the whole session down on any failure and reopen after a back-off
//! - Stop cooperatively when the cancellation token fires
//!
//! ```ignore
//! let cancel = CancellationToken::new();
//! let uploader = Uploader::from_config(source, WebSocketConnector, &config, &stream, cancel.clone());
//! let task = tokio::spawn(uploader.run());
//! // ...
//! cancel.cancel();
//! let stats = task.await?;
//! ```

mod error;
mod mock;
mod upload;

pub use error::{Result, UploadError};
pub use mock::{CaptureProbe, MockCaptureConfig, MockCaptureSource};
pub use upload::{UploadState, UploadStats, Uploader};
