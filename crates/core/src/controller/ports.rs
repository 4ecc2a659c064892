//! The controller's two external seams (§6): XRAM and the coherence
//! network. The direct-network command/response path is ordinary
//! function call/return (see [`crate::controller::Controller::command`])
//! since every response is produced synchronously within the call that
//! served the request.

use crate::common::addr::Addr;
use crate::common::error::McError;
use crate::common::packet::{Clack, InvalPacket, UpdatePacket};

/// The external-memory seam (§6.3): fetch or write back a full cache
/// line.
pub trait XramPort {
    /// Fetches `plen` bytes starting at line-aligned `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`McError::XramReadError`] if XRAM reports a transfer
    /// error on any flit of the response.
    fn get(&mut self, addr: Addr, plen: u32) -> Result<Vec<u32>, McError>;

    /// Writes back `data` (one full line) to line-aligned `addr`.
    fn put(&mut self, addr: Addr, data: &[u32]);
}

/// The coherence-network seam (§6.4): outbound invalidation, update, and
/// cleanup-ack traffic. Cleanup and multi-ack are *inbound* and are
/// therefore ordinary method calls on the controller
/// ([`crate::controller::Controller::cleanup`],
/// [`crate::controller::Controller::multi_ack`]), not part of this
/// trait.
pub trait CoherencePort {
    /// Sends a multicast or broadcast invalidation.
    fn send_inval(&mut self, pkt: InvalPacket);

    /// Sends a multicast update.
    fn send_update(&mut self, pkt: UpdatePacket);

    /// Sends a cleanup acknowledgement.
    fn send_clack(&mut self, pkt: Clack);
}
