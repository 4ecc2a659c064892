//! `mockall::mock!` shims for [`XramPort`]/[`CoherencePort`], the seams
//! this crate doesn't own (§6.3, §6.4). Built with `mock!` rather than
//! `#[automock]` because these traits live in `mc-core`'s `src/`, outside
//! this integration-test crate, the same reason the teacher's own
//! `tests/common/mocks/bus.rs` mocks `Device` this way instead of
//! annotating the trait definition.

use mc_core::common::addr::Addr;
use mc_core::common::error::McError;
use mc_core::common::packet::{Clack, InvalPacket, UpdatePacket};
use mc_core::controller::ports::{CoherencePort, XramPort};
use mockall::mock;

mock! {
    pub Xram {}
    impl XramPort for Xram {
        fn get(&mut self, addr: Addr, plen: u32) -> Result<Vec<u32>, McError>;
        fn put(&mut self, addr: Addr, data: &[u32]);
    }
}

mock! {
    pub Coherence {}
    impl CoherencePort for Coherence {
        fn send_inval(&mut self, pkt: InvalPacket);
        fn send_update(&mut self, pkt: UpdatePacket);
        fn send_clack(&mut self, pkt: Clack);
    }
}
