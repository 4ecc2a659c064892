//! CC-send arbiter (§4.1.9): emits coherence-network packets on behalf of
//! XRAM-response, CAS, WRITE, and CONFIG, with a rotating priority among
//! them.

use crate::common::packet::{InvalPacket, UpdatePacket};
use crate::controller::ports::CoherencePort;
use crate::controller::Controller;

/// Producer index: the XRAM-response FSM's eviction invalidations.
pub const PRODUCER_XRAM_RESPONSE: usize = 0;
/// Producer index: the CAS worker.
pub const PRODUCER_CAS: usize = 1;
/// Producer index: the WRITE worker.
pub const PRODUCER_WRITE: usize = 2;
/// Producer index: the CONFIG FSM's maintenance traffic.
pub const PRODUCER_CONFIG: usize = 3;

impl<X: crate::controller::ports::XramPort, C: CoherencePort> Controller<X, C> {
    /// Routes an invalidation from `producer` through the arbiter to the
    /// coherence port.
    pub(crate) fn cc_send_inval(&mut self, producer: usize, pkt: InvalPacket) {
        let mut ready = [false; 4];
        ready[producer] = true;
        let _ = self.cc_send_arbiter.grant_ready(&ready);
        self.emit_inval(pkt);
    }

    /// Routes an update from `producer` through the arbiter to the
    /// coherence port.
    pub(crate) fn cc_send_update(&mut self, producer: usize, pkt: UpdatePacket) {
        let mut ready = [false; 4];
        ready[producer] = true;
        let _ = self.cc_send_arbiter.grant_ready(&ready);
        self.emit_update(pkt);
    }
}
