//! # Contracts
//!
//! Shared data structures and collaborator traits for the sensor relay.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Packet timestamps are producer-assigned sensor clock ticks (`u64`)
//! - Downstream components never rewrite a timestamp

mod capture;
mod config;
mod error;
mod packet;
mod stream;
mod stream_id;

pub use capture::{CaptureSource, LocalCaptureSource};
pub use config::*;
pub use error::*;
pub use packet::*;
pub use stream::*;
pub use stream_id::StreamId;
