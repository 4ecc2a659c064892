//! End-to-end scenarios from §8: cold read-miss, LL/SC, multi-sharer
//! write/multi-update, counter-mode broadcast invalidate, and CAS.
//!
//! ─────────────────────────────────────────────────────────────────
//! These drive the controller exactly as the CLI does: through
//! `command`/`cleanup`/`multi_ack`, never by reaching into private state.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use mc_core::common::addr::{Addr, Topology};
use mc_core::common::packet::{Cleanup, Command, InvalPacket, MultiAck, OpType, UpdatePacket};
use mc_core::config::Config;
use mc_core::Controller;
use pretty_assertions::assert_eq;

use crate::common::mocks::ports::{MockCoherence, MockXram};

/// Shared state the `MockXram`/`MockCoherence` closures below write into,
/// so a test can inspect what the controller sent after the fact — the
/// same role the teacher's `SyncBusDevice` plays over a raw `mockall`
/// mock in `tests/common/mocks/bus.rs`.
#[derive(Default)]
struct Recorder {
    lines: Rc<RefCell<HashMap<u64, Vec<u32>>>>,
    invals: Rc<RefCell<Vec<InvalPacket>>>,
    updates: Rc<RefCell<Vec<UpdatePacket>>>,
}

fn controller() -> (Controller<MockXram, MockCoherence>, Recorder) {
    let recorder = Recorder::default();

    let mut xram = MockXram::new();
    let lines = recorder.lines.clone();
    xram.expect_get().returning(move |addr, plen| {
        let nwords = (plen / 4) as usize;
        Ok(lines.borrow().get(&addr.val()).cloned().unwrap_or_else(|| vec![0; nwords]))
    });
    let lines = recorder.lines.clone();
    xram.expect_put().returning(move |addr, data| {
        lines.borrow_mut().insert(addr.val(), data.to_vec());
    });

    let mut coherence = MockCoherence::new();
    let invals = recorder.invals.clone();
    coherence.expect_send_inval().returning(move |pkt| invals.borrow_mut().push(pkt));
    let updates = recorder.updates.clone();
    coherence.expect_send_update().returning(move |pkt| updates.borrow_mut().push(pkt));
    coherence.expect_send_clack().returning(|_| {});

    (Controller::new(Config::default(), xram, coherence), recorder)
}

fn read_cmd(srcid: u16, address: u64, op: OpType) -> Command {
    Command {
        srcid,
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

fn write_cmd(srcid: u16, address: u64, data: u64) -> Command {
    Command {
        srcid,
        trdid: 0,
        pktid: 0,
        address: Addr(address),
        plen: 4,
        op: OpType::Write,
        wdata: vec![data],
        be: vec![0xF],
        eop: true,
    }
}

#[test]
fn cold_read_miss_installs_line_and_registers_sole_owner() {
    let (mut ctl, _rec) = controller();
    let rsp = ctl.command(&read_cmd(0, 0x1000, OpType::ReadDataMiss)).unwrap();
    assert!(!rsp.rerror);
    assert_eq!(ctl.stats().read_miss, 1);

    // A second read from the same requester now hits the directory, no
    // second miss.
    let rsp2 = ctl.command(&read_cmd(0, 0x1000, OpType::ReadDataMiss)).unwrap();
    assert!(!rsp2.rerror);
    assert_eq!(ctl.stats().read_miss, 1);
}

#[test]
fn ll_then_matching_sc_succeeds_then_second_sc_fails() {
    let (mut ctl, _rec) = controller();
    let ll_rsp = ctl.command(&read_cmd(0, 0x2000, OpType::Ll)).unwrap();
    assert!(!ll_rsp.rerror);
    let key = ll_rsp.rdata[0];

    let mut sc = write_cmd(0, 0x2000, key);
    sc.op = OpType::Sc;
    let sc_rsp = ctl.command(&sc).unwrap();
    assert_eq!(sc_rsp.rdata, vec![0], "first SC against a fresh key must succeed");

    let sc_rsp2 = ctl.command(&sc).unwrap();
    assert_eq!(sc_rsp2.rdata, vec![1], "the reservation was consumed by the first SC");
}

#[test]
fn write_to_sole_owner_completes_immediately() {
    let (mut ctl, _rec) = controller();
    let _ = ctl.command(&read_cmd(0, 0x3000, OpType::ReadDataMiss));
    let rsp = ctl.command(&write_cmd(0, 0x3000, 42)).unwrap();
    assert!(!rsp.rerror);
}

#[test]
fn write_from_second_sharer_triggers_multi_update_and_defers() {
    let (mut ctl, rec) = controller();
    // Two distinct requesters read the same line, both become sharers.
    // Requester 0 reads first and becomes the directory-resident owner;
    // requester 2 reads second and lands in the heap chain.
    let _ = ctl.command(&read_cmd(0, 0x4000, OpType::ReadDataMiss));
    let _ = ctl.command(&read_cmd(2, 0x4000, OpType::ReadDataMiss));

    // Requester 0 now writes: requester 2 is still a sharer and must be
    // multi-updated, so the response defers.
    let deferred = ctl.command(&write_cmd(0, 0x4000, 7));
    assert!(deferred.is_none(), "response must wait for multi_ack to drain the UPT entry");
    assert_eq!(ctl.stats().mupdate.total, 1);
    assert_eq!(
        rec.updates.borrow()[0].dests,
        vec![2],
        "only the non-writing heap sharer is multi-updated"
    );

    let rsp = ctl.multi_ack(MultiAck { upt_index: 0 });
    assert!(rsp.is_some(), "draining the only pending ack must surface the deferred write response");
}

#[test]
fn write_from_non_owner_sharer_still_multi_updates_the_owner() {
    let (mut ctl, rec) = controller();
    // Requester 2 reads first and becomes the directory-resident owner;
    // requester 0 reads second and lands in the heap chain as the only
    // additional sharer.
    let _ = ctl.command(&read_cmd(2, 0x4400, OpType::ReadDataMiss));
    let _ = ctl.command(&read_cmd(0, 0x4400, OpType::ReadDataMiss));

    // Requester 0 — not the owner — writes. The owner (requester 2) still
    // holds a stale copy and must be multi-updated, exactly as a heap
    // sharer would be: the owner is not exempt just because it isn't
    // threaded through the heap chain.
    let deferred = ctl.command(&write_cmd(0, 0x4400, 77));
    assert!(deferred.is_none(), "the owner's pending update must defer the response");
    assert_eq!(ctl.stats().mupdate.total, 1);
    assert_eq!(
        rec.updates.borrow()[0].dests,
        vec![2],
        "the directory-resident owner must receive the update, not be silently dropped"
    );

    let rsp = ctl.multi_ack(MultiAck { upt_index: 0 });
    assert!(rsp.is_some(), "acking the owner's update must surface the deferred write response");
}

#[test]
fn sharer_overflow_converts_to_counter_mode_and_write_broadcasts() {
    let (mut ctl, _rec) = controller();
    let max_sharers = Config::default().heap.max_sharers;
    for srcid in 0..=(max_sharers as u16 + 1) {
        let _ = ctl.command(&read_cmd(srcid, 0x5000, OpType::ReadDataMiss));
    }

    let deferred = ctl.command(&write_cmd(0, 0x5000, 99));
    assert!(deferred.is_none(), "a broadcast invalidate always defers");
    assert_eq!(ctl.stats().write_broadcast, 1);
    assert_eq!(ctl.stats().binval.total, 1);
}

#[test]
fn cas_against_sole_owner_with_matching_expected_succeeds() {
    let (mut ctl, _rec) = controller();
    let _ = ctl.command(&read_cmd(0, 0x6000, OpType::ReadDataMiss));

    let mut cmd = write_cmd(0, 0x6000, 0);
    cmd.op = OpType::Cas;
    cmd.wdata = vec![0, 55]; // expected=0, replacement=55
    let rsp = ctl.command(&cmd).unwrap();
    assert_eq!(rsp.rdata, vec![0], "CAS against the correct expected value succeeds");
}

#[test]
fn cas_with_wrong_expected_value_fails_without_mutating() {
    let (mut ctl, _rec) = controller();
    let _ = ctl.command(&read_cmd(0, 0x7000, OpType::ReadDataMiss));

    let mut cmd = write_cmd(0, 0x7000, 0);
    cmd.op = OpType::Cas;
    cmd.wdata = vec![123, 55]; // expected != current (0)
    let rsp = ctl.command(&cmd).unwrap();
    assert_eq!(rsp.rdata, vec![1], "CAS against a stale expected value must fail");
}

#[test]
fn cleanup_of_last_sharer_clears_directory_and_emits_clack() {
    let (mut ctl, _rec) = controller();
    let _ = ctl.command(&read_cmd(0, 0x8000, OpType::ReadDataMiss));

    let topology = Topology::new(Config::default().topology.nwords, Config::default().topology.nsets);
    let rsp = ctl.cleanup(Cleanup {
        srcid: 0,
        is_instruction_cache: false,
        way: 0,
        nline: topology.nline(Addr(0x8000)),
    });
    assert!(rsp.is_none(), "an ordinary cleanup with no pending IVT entry never defers");
    assert_eq!(ctl.stats().cleanup.total, 1);
}
