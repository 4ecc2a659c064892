//! §7 "malformed command" rejection: wrong `eop`, zero `plen`, or a payload
//! shape the command table (§6.1) disallows for `cmd.op`. These are bugs in
//! the requester, so the controller asserts and terminates rather than
//! returning an error response (see `validate_command` in `command.rs`).

use mc_core::common::addr::Addr;
use mc_core::common::packet::{Command, OpType};
use mc_core::config::Config;
use mc_core::Controller;
use rstest::rstest;

use crate::common::mocks::ports::{MockCoherence, MockXram};

/// A controller with permissive mocks: the malformed-command cases below
/// panic inside `validate_command`, before any port call happens, so these
/// expectations only matter for the "well-formed" acceptance tests.
fn controller() -> Controller<MockXram, MockCoherence> {
    let mut xram = MockXram::new();
    xram.expect_get().returning(|_addr, plen| Ok(vec![0; (plen / 4) as usize]));
    xram.expect_put().returning(|_addr, _data| {});

    let mut coherence = MockCoherence::new();
    coherence.expect_send_inval().returning(|_| {});
    coherence.expect_send_update().returning(|_| {});
    coherence.expect_send_clack().returning(|_| {});

    Controller::new(Config::default(), xram, coherence)
}

fn base_read() -> Command {
    Command {
        srcid: 0,
        trdid: 0,
        pktid: 0,
        address: Addr(0x1000),
        plen: 4,
        op: OpType::ReadDataMiss,
        wdata: vec![],
        be: vec![],
        eop: true,
    }
}

#[test]
#[should_panic(expected = "malformed command")]
fn fragmented_burst_is_rejected() {
    let mut cmd = base_read();
    cmd.eop = false;
    controller().command(&cmd);
}

#[test]
#[should_panic(expected = "malformed command")]
fn zero_plen_is_rejected() {
    let mut cmd = base_read();
    cmd.plen = 0;
    controller().command(&cmd);
}

#[rstest]
#[case(OpType::ReadDataUnc)]
#[case(OpType::ReadDataMiss)]
#[case(OpType::ReadInsUnc)]
#[case(OpType::ReadInsMiss)]
#[case(OpType::Ll)]
#[should_panic(expected = "malformed command")]
fn a_read_carrying_write_data_is_rejected(#[case] op: OpType) {
    let mut cmd = base_read();
    cmd.op = op;
    cmd.wdata = vec![1];
    controller().command(&cmd);
}

#[test]
#[should_panic(expected = "malformed command")]
fn a_write_with_no_data_flits_is_rejected() {
    let mut cmd = base_read();
    cmd.op = OpType::Write;
    cmd.wdata = vec![];
    cmd.be = vec![];
    controller().command(&cmd);
}

#[test]
#[should_panic(expected = "malformed command")]
fn a_write_with_mismatched_wdata_and_be_counts_is_rejected() {
    let mut cmd = base_read();
    cmd.op = OpType::Write;
    cmd.wdata = vec![1, 2];
    cmd.be = vec![0xF];
    controller().command(&cmd);
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(3)]
#[case(5)]
#[should_panic(expected = "malformed command")]
fn a_cas_with_the_wrong_flit_count_is_rejected(#[case] nflits: usize) {
    let mut cmd = base_read();
    cmd.op = OpType::Cas;
    cmd.wdata = vec![0; nflits];
    controller().command(&cmd);
}

#[rstest]
#[case(0)]
#[case(3)]
#[case(4)]
#[should_panic(expected = "malformed command")]
fn an_sc_with_the_wrong_flit_count_is_rejected(#[case] nflits: usize) {
    let mut cmd = base_read();
    cmd.op = OpType::Sc;
    cmd.wdata = vec![0; nflits];
    controller().command(&cmd);
}

#[test]
fn a_well_formed_cas_is_accepted() {
    let mut cmd = base_read();
    cmd.op = OpType::Cas;
    cmd.wdata = vec![0, 1];
    let _ = controller().command(&cmd);
}

#[test]
fn a_well_formed_sc_is_accepted() {
    let mut cmd = base_read();
    cmd.op = OpType::Sc;
    cmd.wdata = vec![0];
    let _ = controller().command(&cmd);
}
