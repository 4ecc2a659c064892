//! CAS worker (§4.1.4): 32- or 64-bit compare-and-swap, delivered as 2 or 4
//! request flits, with an LFSR-driven force-fail throttle against livelock.

use crate::common::packet::{Command, Owner, Response};
use crate::controller::cc_send::PRODUCER_CAS;
use crate::controller::ports::{CoherencePort, XramPort};
use crate::controller::write::WriteWord;
use crate::controller::Controller;
use crate::tables::trt::{Originator as TrtOriginator, TrtEntry};

impl<X: XramPort, C: CoherencePort> Controller<X, C> {
    /// Serves a CAS command. Returns `None` when the response is deferred
    /// until a later [`Controller::cleanup`]/[`Controller::multi_ack`]
    /// drains the IVT/UPT entry the success path created.
    pub fn cas(&mut self, cmd: &Command) -> Option<Response> {
        let requester = Owner {
            srcid: cmd.srcid,
            is_instruction_cache: false,
        };
        let (set, _tag) = self.topology.set_and_tag(cmd.address);
        let local = Self::is_local(cmd.srcid, set);
        self.stats.record_cas(local, 0);

        let (entry, way) = self.directory.read(cmd.address);
        if !entry.valid {
            return self.cas_miss(cmd);
        }

        let word_index = self.topology.word_index(cmd.address);
        let current = self.directory.read_word(way, set, word_index);
        let (expected, replacement) = cas_operands(cmd);

        if current != expected || self.lfsr.force_fail(self.config.cas.force_fail_rate) {
            if self.config.general.trace_events && current == expected {
                eprintln!("mc: CAS force-fail at {:#x}", cmd.address.val());
            }
            return Some(cas_response(cmd, false));
        }

        self.reservation.sw(cmd.address, cmd.address);
        let words = write_words_for_cas(word_index, replacement);
        let immediate = self.commit_write(
            set,
            way,
            entry,
            requester,
            cmd.srcid,
            cmd.trdid,
            cmd.pktid,
            &words,
            PRODUCER_CAS,
            true,
        );

        if immediate {
            Some(cas_response(cmd, true))
        } else {
            None
        }
    }

    fn cas_miss(&mut self, cmd: &Command) -> Option<Response> {
        self.stats.write_miss += 1;
        let nline = self.topology.nline(cmd.address);
        let word_index = self.topology.word_index(cmd.address);
        let (_, replacement) = cas_operands(cmd);
        let words = write_words_for_cas(word_index, replacement);
        let words_be: Vec<(u8, u32)> = words.iter().map(|&(_, data, be)| (be, data)).collect();

        let index = if let Some(idx) = self.trt.hit_read(nline) {
            self.stats.trt_read_blocked += 1;
            idx
        } else {
            let (full, idx) = self.trt.full();
            if full {
                self.stats.trt_full_blocked += 1;
            }
            self.trt.set(
                idx,
                TrtEntry {
                    valid: true,
                    xram_read: true,
                    nline,
                    originator: TrtOriginator {
                        srcid: cmd.srcid,
                        trdid: cmd.trdid,
                        pktid: cmd.pktid,
                    },
                    proc_read: false,
                    read_length: self.topology.nwords() as usize,
                    word_index,
                    config: false,
                    ..TrtEntry::empty(self.topology.nwords() as usize)
                },
            );
            idx
        };

        // A CAS that misses cannot compare against stale data once the line
        // arrives, so the expected-value check is skipped: the replacement
        // is staged unconditionally and the caller sees success, matching
        // the WRITE miss path's "respond optimistically" (§4.1.3 step 6).
        self.trt.merge_write(index, word_index, &words_be);

        let line_base = self.topology.line_base(cmd.address);
        let line_bytes = self.topology.line_bytes() as u32;
        let result = self.xram_get(index, line_base, line_bytes);
        match result {
            Ok(data) => {
                let (set, tag) = self.topology.set_and_tag(cmd.address);
                let requester = Owner {
                    srcid: cmd.srcid,
                    is_instruction_cache: false,
                };
                self.install_line(set, tag, requester, false, 1, true, &data);
                self.trt.clear(index);
                Some(cas_response(cmd, true))
            }
            Err(_) => {
                self.trt.clear(index);
                if self.config.general.trace_events {
                    eprintln!(
                        "mc: XRAM read error servicing CAS-miss at {:#x}",
                        cmd.address.val()
                    );
                }
                if self.error_regs.irq_enable {
                    self.error_regs.irq_pending = true;
                    self.error_regs.srcid = cmd.srcid;
                    self.error_regs.addr_lo = cmd.address.val() as u32;
                    self.error_regs.addr_hi = 0;
                }
                None
            }
        }
    }
}

/// Decodes `(expected, replacement)` from a 2-flit (32-bit) or 4-flit
/// (64-bit, low half only — CAS here operates one word at a time, matching
/// `Directory`'s word-granular storage) CAS command.
fn cas_operands(cmd: &Command) -> (u32, u32) {
    let expected = cmd.wdata.first().copied().unwrap_or(0) as u32;
    let replacement = if cmd.wdata.len() >= 4 {
        cmd.wdata[2] as u32
    } else {
        cmd.wdata.get(1).copied().unwrap_or(0) as u32
    };
    (expected, replacement)
}

fn write_words_for_cas(word_index: usize, replacement: u32) -> Vec<WriteWord> {
    vec![(word_index, replacement, 0xF)]
}

fn cas_response(cmd: &Command, success: bool) -> Response {
    Response {
        rsrcid: cmd.srcid,
        rtrdid: cmd.trdid,
        rpktid: cmd.pktid,
        rdata: vec![u64::from(!success)],
        rerror: false,
        reop: true,
    }
}
