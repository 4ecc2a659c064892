//! WRITE worker (§4.1.3): ordinary write bursts and SC, sharing the
//! directory-hit branch (direct write / broadcast-invalidate / multi-update)
//! with the CAS worker's success path.

use crate::common::addr::{Addr, Topology};
use crate::common::packet::{Command, InvalPacket, OpType, Owner, Response, SrcId, TrdId, UpdatePacket};
use crate::controller::cc_send::PRODUCER_WRITE;
use crate::controller::ports::{CoherencePort, XramPort};
use crate::controller::Controller;
use crate::directory::DirEntry;
use crate::tables::ivt::{IvtCause, IvtEntry, Originator as IvtOriginator};
use crate::tables::trt::{Originator as TrtOriginator, TrtEntry};
use crate::tables::upt::{Originator as UptOriginator, UptEntry};

/// One word of a pending write, already decomposed into line-relative word
/// index, 32-bit value, and byte-enable mask.
pub(crate) type WriteWord = (usize, u32, u8);

impl<X: XramPort, C: CoherencePort> Controller<X, C> {
    /// Serves a WRITE or SC command. Returns `None` when the response is
    /// deferred until a later [`Controller::cleanup`]/[`Controller::multi_ack`]
    /// drains the IVT/UPT entry this call created (§4.1.3 steps 4 and 5).
    pub fn write(&mut self, cmd: &Command) -> Option<Response> {
        let requester = Owner {
            srcid: cmd.srcid,
            is_instruction_cache: false,
        };
        let is_sc = matches!(cmd.op, OpType::Sc);
        let (set, _tag) = self.topology.set_and_tag(cmd.address);
        let local = Self::is_local(cmd.srcid, set);
        self.stats.record_write(local, 0);
        if is_sc {
            self.stats.record_sc(local, 0);
            let key = sc_key(cmd);
            if !self.reservation.check(cmd.address, key) {
                return Some(sc_response(cmd, false));
            }
        } else {
            let (min, max) = write_range(cmd);
            self.reservation.sw(min, max);
        }

        let (entry, way) = self.directory.read(cmd.address);
        if !entry.valid {
            return self.write_miss(cmd, is_sc);
        }

        if is_sc {
            self.reservation.sc(cmd.address, sc_key(cmd));
        }

        let words = write_words(cmd, is_sc, self.topology);
        let immediate = self.commit_write(
            set,
            way,
            entry,
            requester,
            cmd.srcid,
            cmd.trdid,
            cmd.pktid,
            &words,
            PRODUCER_WRITE,
            is_sc,
        );

        if !immediate {
            return None;
        }
        Some(if is_sc {
            sc_response(cmd, true)
        } else {
            Response {
                rsrcid: cmd.srcid,
                rtrdid: cmd.trdid,
                rpktid: cmd.pktid,
                rdata: vec![],
                rerror: false,
                reop: true,
            }
        })
    }

    fn write_miss(&mut self, cmd: &Command, is_sc: bool) -> Option<Response> {
        self.stats.write_miss += 1;
        let nline = self.topology.nline(cmd.address);
        let words = write_words(cmd, is_sc, self.topology);
        let words_be: Vec<(u8, u32)> = words.iter().map(|&(_, data, be)| (be, data)).collect();
        let first_word = words.first().map_or(0, |&(w, _, _)| w);

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
                    word_index: first_word,
                    config: false,
                    ..TrtEntry::empty(self.topology.nwords() as usize)
                },
            );
            idx
        };
        self.trt.merge_write(index, first_word, &words_be);

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
                Some(if is_sc {
                    sc_response(cmd, true)
                } else {
                    Response {
                        rsrcid: cmd.srcid,
                        rtrdid: cmd.trdid,
                        rpktid: cmd.pktid,
                        rdata: vec![],
                        rerror: false,
                        reop: true,
                    }
                })
            }
            Err(_) => {
                self.trt.clear(index);
                if self.config.general.trace_events {
                    eprintln!(
                        "mc: XRAM read error servicing write-miss at {:#x} (no processor response owed)",
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

    /// Commits a write whose line is already resident at `(set, way)`.
    /// Dispatches on the directory-hit shape (§4.1.3 steps 3-5): a sole
    /// owner matching `requester` is written directly; a counter-mode entry
    /// is broadcast-invalidated; per-copy sharers get a multi-update. Returns
    /// `true` if the caller may respond immediately, `false` if the response
    /// must wait for [`Controller::cleanup`]/[`Controller::multi_ack`].
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn commit_write(
        &mut self,
        set: usize,
        way: usize,
        entry: DirEntry,
        requester: Owner,
        srcid: SrcId,
        trdid: TrdId,
        pktid: u16,
        words: &[WriteWord],
        producer: usize,
        need_ack: bool,
    ) -> bool {
        let local = Self::is_local(srcid, set);
        let sole_owner = !entry.is_cnt && entry.count <= 1 && entry.owner == requester;

        if !entry.is_cnt && (entry.count == 0 || sole_owner) {
            for &(w, data, be) in words {
                self.directory.write_word(way, set, w, data, be);
            }
            self.directory.write(
                set,
                way,
                DirEntry {
                    dirty: true,
                    owner: requester,
                    count: 1,
                    ..entry
                },
            );
            return true;
        }

        let nline = self.topology.nline_of(set, entry.tag);

        if entry.is_cnt {
            self.stats.write_broadcast += 1;
            let mut data = self.directory.read_line(way, set);
            for &(w, val, be) in words {
                apply_byte_enable(&mut data[w], val, be);
            }
            let (ivt_full, ivt_index) = self.ivt.full();
            if ivt_full && self.config.general.trace_events {
                eprintln!("mc: IVT full while registering broadcast-invalidate for {nline:?}");
            }
            self.ivt.set(
                ivt_index,
                IvtEntry {
                    valid: true,
                    update: false,
                    broadcast: true,
                    need_rsp: true,
                    need_ack,
                    originator: IvtOriginator { srcid, trdid, pktid },
                    nline,
                    nb_responses_pending: entry.count,
                    cause: IvtCause::Write,
                },
            );
            let (trt_full, trt_index) = self.trt.full();
            if trt_full && self.config.general.trace_events {
                eprintln!("mc: TRT full while snapshotting broadcast-invalidate PUT for {nline:?}");
            }
            self.trt.set(
                trt_index,
                TrtEntry {
                    valid: true,
                    xram_read: false,
                    nline,
                    config: false,
                    wdata: data.clone(),
                    wdata_be: vec![0xF; data.len()],
                    ..TrtEntry::empty(data.len())
                },
            );
            self.directory.invalidate(set, way);
            self.stats.record_binval(local, 0);
            self.cc_send_inval(
                producer,
                InvalPacket {
                    dests: Vec::new(),
                    broadcast: true,
                    ivt_index,
                    nline,
                    is_instruction_cache: false,
                },
            );
            let addr = self.topology.line_base_of(nline);
            self.xram_put(addr, &data);
            self.trt.clear(trt_index);
            return false;
        }

        // Per-copy sharers: write locally, then multi-update every sharer
        // except the writer itself.
        for &(w, data, be) in words {
            self.directory.write_word(way, set, w, data, be);
        }
        self.directory.write(
            set,
            way,
            DirEntry {
                dirty: true,
                ..entry
            },
        );
        self.stats.write_dirty += 1;

        let sharers = if entry.count > 1 {
            let mut v = self.heap.walk(entry.ptr);
            v.push(entry.owner);
            v
        } else {
            vec![entry.owner]
        };
        let others: Vec<Owner> = sharers.into_iter().filter(|o| *o != requester).collect();
        if others.is_empty() {
            return true;
        }

        let (upt_full, upt_index) = self.upt.full();
        if upt_full && self.config.general.trace_events {
            eprintln!("mc: UPT full while registering multi-update for {nline:?}");
        }
        self.upt.set(
            upt_index,
            UptEntry {
                valid: true,
                update: true,
                broadcast: false,
                need_rsp: true,
                need_ack,
                originator: UptOriginator { srcid, trdid, pktid },
                nline,
                nb_responses_pending: others.len() as u32,
            },
        );
        let word_index = words.first().map_or(0, |&(w, _, _)| w);
        let packet_words: Vec<(u8, u32)> = words.iter().map(|&(_, data, be)| (be, data)).collect();
        self.stats.record_mupdate(local, 0);
        self.cc_send_update(
            producer,
            UpdatePacket {
                dests: others.iter().map(|o| o.srcid).collect(),
                upt_index,
                nline,
                word_index,
                words: packet_words,
            },
        );
        false
    }
}

fn sc_key(cmd: &Command) -> u32 {
    cmd.wdata.first().copied().unwrap_or(0) as u32
}

fn sc_response(cmd: &Command, success: bool) -> Response {
    Response {
        rsrcid: cmd.srcid,
        rtrdid: cmd.trdid,
        rpktid: cmd.pktid,
        rdata: vec![u64::from(!success)],
        rerror: false,
        reop: true,
    }
}

fn write_range(cmd: &Command) -> (Addr, Addr) {
    let nwords = cmd.wdata.len().max(1) as u64;
    let min = Addr(cmd.address.val() & !0b11);
    let max = Addr(min.val() + (nwords - 1) * 4);
    (min, max)
}

pub(crate) fn write_words(cmd: &Command, is_sc: bool, topology: Topology) -> Vec<WriteWord> {
    let word_index = topology.word_index(cmd.address);
    if is_sc {
        let data = cmd.wdata.get(1).copied().unwrap_or(0) as u32;
        return vec![(word_index, data, 0xF)];
    }
    cmd.wdata
        .iter()
        .zip(cmd.be.iter().chain(std::iter::repeat(&0xF)))
        .enumerate()
        .map(|(i, (&data, &be))| (word_index + i, data as u32, be))
        .collect()
}

fn apply_byte_enable(word: &mut u32, data: u32, be: u8) {
    if be == 0xF {
        *word = data;
        return;
    }
    for byte in 0..4u32 {
        if be & (1 << byte) != 0 {
            let shift = byte * 8;
            let mask = 0xFFu32 << shift;
            *word = (*word & !mask) | (data & mask);
        }
    }
}
