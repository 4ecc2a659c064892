//! Property tests for the §8 atomicity laws: a successful SC implies no
//! intervening store broke the reservation since the matching LL, and a CAS
//! commits the replacement iff the current word equals the expected value.
//!
//! These exercise the same code the scenario tests drive by hand
//! (`ReservationTable` directly for LL/SC, the full `Controller` for CAS),
//! but quantify over many inputs instead of a handful of fixed cases.

use mc_core::common::addr::Addr;
use mc_core::common::packet::{Command, OpType};
use mc_core::config::Config;
use mc_core::reservation::ReservationTable;
use mc_core::Controller;
use proptest::prelude::*;

use crate::common::mocks::ports::{MockCoherence, MockXram};

fn cas_controller(force_fail_rate: u32) -> Controller<MockXram, MockCoherence> {
    let mut config = Config::default();
    config.cas.force_fail_rate = force_fail_rate;

    let mut xram = MockXram::new();
    xram.expect_get().returning(|_addr, plen| Ok(vec![0; (plen / 4) as usize]));
    xram.expect_put().returning(|_addr, _data| {});

    let mut coherence = MockCoherence::new();
    coherence.expect_send_inval().returning(|_| {});
    coherence.expect_send_update().returning(|_| {});
    coherence.expect_send_clack().returning(|_| {});

    Controller::new(config, xram, coherence)
}

fn read_cmd(address: u64, op: OpType) -> Command {
    Command {
        srcid: 0,
        trdid: 0,
        pktid: 0,
        address: Addr(address),
        plen: 4,
        op,
        wdata: vec![],
        be: vec![],
        eop: true,
    }
}

fn cas_cmd(address: u64, expected: u32, replacement: u32) -> Command {
    Command {
        srcid: 0,
        trdid: 0,
        pktid: 0,
        address: Addr(address),
        plen: 4,
        op: OpType::Cas,
        wdata: vec![u64::from(expected), u64::from(replacement)],
        be: vec![],
        eop: true,
    }
}

proptest! {
    /// A CAS whose expected value matches the word actually stored commits
    /// the replacement; one whose expected value doesn't match leaves the
    /// word untouched. `force_fail_rate` is pinned to 0 so the LFSR
    /// livelock throttle never masks the comparison under test.
    #[test]
    fn cas_commits_iff_expected_matches_current(
        replacement in any::<u32>(),
        matches in any::<bool>(),
        mismatched_expected in any::<u32>(),
    ) {
        let mut ctl = cas_controller(0);
        let addr = 0x1000u64;

        // The mocked XRAM always returns zeroed lines, so a fresh line's
        // word 0 reads back as 0.
        let _ = ctl.command(&read_cmd(addr, OpType::ReadDataMiss));

        let expected = if matches { 0 } else { mismatched_expected };
        let rsp = ctl.command(&cas_cmd(addr, expected, replacement)).unwrap();
        let success = rsp.rdata == vec![0];
        prop_assert_eq!(success, matches || mismatched_expected == 0);

        let after = ctl.command(&read_cmd(addr, OpType::ReadDataMiss)).unwrap();
        if success {
            prop_assert_eq!(after.rdata, vec![u64::from(replacement)]);
        } else {
            prop_assert_eq!(after.rdata, vec![0]);
        }
    }

    /// A store-conditional only succeeds when it carries the key that the
    /// preceding load-linked at the same address returned; any other key,
    /// or a key from a different address, always fails and never mutates
    /// the table.
    #[test]
    fn sc_succeeds_only_with_the_matching_ll_key(
        addr in any::<u64>(),
        other_addr in any::<u64>(),
        key_offset in 1u32..=u32::MAX,
    ) {
        let mut t = ReservationTable::new(16, 1);
        let key = t.ll(Addr(addr));

        if other_addr != addr {
            prop_assert!(!t.sc(Addr(other_addr), key), "a different address must never match");
        }
        prop_assert!(!t.sc(Addr(addr), key.wrapping_add(key_offset)), "a wrong key must never succeed");
        prop_assert!(t.sc(Addr(addr), key), "the exact LL key must succeed exactly once");
        prop_assert!(!t.sc(Addr(addr), key), "the reservation must not be reusable after it succeeds");
    }

    /// A `sw` covering the LL'd address always invalidates the reservation,
    /// regardless of how wide the range is, as long as the address falls
    /// inside `[min, max]`.
    #[test]
    fn sw_covering_the_address_always_breaks_the_reservation(
        addr in (0u64..0x3FFF_C000).prop_map(|v| v * 4),
        before in (0u64..0x400).prop_map(|v| v * 4),
        after in (0u64..0x400).prop_map(|v| v * 4),
    ) {
        let mut t = ReservationTable::new(16, 1);
        let key = t.ll(Addr(addr));
        let lo = addr.saturating_sub(before);
        let hi = addr.saturating_add(after);
        t.sw(Addr(lo), Addr(hi));
        prop_assert!(!t.sc(Addr(addr), key), "sw spanning the address must invalidate its reservation");
    }
}
