//! CaptureSource trait - producer-side capture collaborator
//!
//! The relay never inspects samples beyond what the packet codec needs.

use crate::{ContractError, Packet};

/// Capture device abstraction
///
/// One instance is owned by one upload task. `open` may be called again
/// after `close` when the upload loop restarts a session.
#[trait_variant::make(CaptureSource: Send)]
pub trait LocalCaptureSource {
    /// Sensor port served by this source
    fn port(&self) -> u16;

    /// Acquire the capture resource
    async fn open(&mut self) -> Result<(), ContractError>;

    /// Fetch the next sample
    ///
    /// # Errors
    /// Returns a capture fault; the upload loop tears the session down
    async fn next_packet(&mut self) -> Result<Packet, ContractError>;

    /// Release the capture resource
    async fn close(&mut self) -> Result<(), ContractError>;
}
