//! CONFIG FSM (§4.1.8, §6.2): the software-visible configuration
//! sub-segment — the `CONFIG` maintenance-loop registers, the read-only
//! `INSTRM` counter window, and the `RERROR` interrupt registers.

use crate::common::addr::Addr;
use crate::common::packet::{InvalPacket, Owner, Response, SrcId, TrdId};
use crate::controller::cc_send::PRODUCER_CONFIG;
use crate::controller::ports::{CoherencePort, XramPort};
use crate::controller::Controller;
use crate::directory::DirEntry;
use crate::tables::ivt::{IvtCause, IvtEntry, Originator as IvtOriginator};

/// `CONFIG`-function register file (§6.2): `ADDR_LO`/`ADDR_HI`/
/// `BUF_LENGTH` stage a maintenance range; writing `CMD_TYPE` starts it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigRegs {
    /// Low 32 bits of the maintenance range's base address.
    pub addr_lo: u32,
    /// High 32 bits of the maintenance range's base address.
    pub addr_hi: u32,
    /// Length in bytes of the maintenance range; must be line-aligned.
    pub buf_length: u32,
}

/// `CMD_TYPE` values that start a maintenance loop.
pub const CMD_INVAL: u32 = 1;
/// `CMD_TYPE` value requesting a write-back sync, leaving lines resident.
pub const CMD_SYNC: u32 = 2;

/// `CONFIG` sub-segment function code: the maintenance-loop registers.
pub const FUNC_CONFIG: u8 = 0;
/// `CONFIG` sub-segment function code: the read-only counter window.
pub const FUNC_INSTRM: u8 = 1;
/// `CONFIG` sub-segment function code: the interrupt/error registers.
pub const FUNC_RERROR: u8 = 2;

/// `CONFIG`-function register index: `ADDR_LO`.
pub const REG_ADDR_LO: u8 = 0;
/// `CONFIG`-function register index: `ADDR_HI`.
pub const REG_ADDR_HI: u8 = 1;
/// `CONFIG`-function register index: `BUF_LENGTH`.
pub const REG_BUF_LENGTH: u8 = 2;
/// `CONFIG`-function register index: `CMD_TYPE`.
pub const REG_CMD_TYPE: u8 = 3;

/// `RERROR`-function register index: the latched offending `SRCID`.
pub const RERROR_SRCID: u8 = 0;
/// `RERROR`-function register index: low bits of the latched address.
pub const RERROR_ADDR_LO: u8 = 1;
/// `RERROR`-function register index: high bits of the latched address.
pub const RERROR_ADDR_HI: u8 = 2;
/// `RERROR`-function register index: write-to-clear interrupt ack.
pub const RERROR_IRQ_RESET: u8 = 3;
/// `RERROR`-function register index: interrupt enable.
pub const RERROR_IRQ_ENABLE: u8 = 4;

/// The CONFIG command's originator, held until `outstanding_lines` drains
/// back to zero (§4.1.8) so [`Controller::cleanup`] can surface the
/// deferred response.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ConfigOriginator {
    pub srcid: SrcId,
    pub trdid: TrdId,
    pub pktid: u16,
}

impl<X: XramPort, C: CoherencePort> Controller<X, C> {
    /// Writes one `CONFIG`-function register (§6.2). Staging registers
    /// (`ADDR_LO`/`ADDR_HI`/`BUF_LENGTH`) never respond; writing
    /// `CMD_TYPE` starts the maintenance loop and its response is
    /// deferred until every affected line completes (possibly
    /// immediately, for a range with no invalidations outstanding).
    pub fn config_write(&mut self, regr: u8, data: u32, srcid: SrcId, trdid: TrdId, pktid: u16) -> Option<Response> {
        match regr {
            REG_ADDR_LO => {
                self.config_regs.addr_lo = data;
                None
            }
            REG_ADDR_HI => {
                self.config_regs.addr_hi = data;
                None
            }
            REG_BUF_LENGTH => {
                self.config_regs.buf_length = data;
                None
            }
            REG_CMD_TYPE => self.config_start(data, srcid, trdid, pktid),
            _ => None,
        }
    }

    /// Reads one `INSTRM`-function counter (§6.5); indices beyond the
    /// mapped counters read as zero.
    #[must_use]
    pub fn instrm_read(&self, regr: u8) -> u32 {
        let s = &self.stats;
        match regr {
            0 => s.read.local as u32,
            1 => s.read.remote as u32,
            2 => s.write.local as u32,
            3 => s.write.remote as u32,
            4 => s.ll.local as u32,
            5 => s.ll.remote as u32,
            6 => s.sc.local as u32,
            7 => s.sc.remote as u32,
            8 => s.cas.local as u32,
            9 => s.cas.remote as u32,
            10 => s.mupdate.total as u32,
            11 => s.minval.total as u32,
            12 => s.binval.total as u32,
            13 => s.cleanup.total as u32,
            14 => s.read_miss as u32,
            15 => s.write_miss as u32,
            16 => s.write_dirty as u32,
            17 => s.write_broadcast as u32,
            18 => s.trt_read_blocked as u32,
            19 => s.trt_full_blocked as u32,
            _ => 0,
        }
    }

    /// Reads one `RERROR`-function register (§6.2).
    #[must_use]
    pub fn rerror_read(&self, regr: u8) -> u32 {
        match regr {
            RERROR_SRCID => u32::from(self.error_regs.srcid),
            RERROR_ADDR_LO => self.error_regs.addr_lo,
            RERROR_ADDR_HI => self.error_regs.addr_hi,
            RERROR_IRQ_RESET => u32::from(self.error_regs.irq_pending),
            RERROR_IRQ_ENABLE => u32::from(self.error_regs.irq_enable),
            _ => 0,
        }
    }

    /// Writes one `RERROR`-function register. `IRQ_RESET` clears the
    /// latched interrupt; `SRCID`/`ADDR_LO`/`ADDR_HI` are hardware-latched
    /// and ignore software writes.
    pub fn rerror_write(&mut self, regr: u8, data: u32) {
        match regr {
            RERROR_IRQ_RESET => self.error_regs.irq_pending = false,
            RERROR_IRQ_ENABLE => self.error_regs.irq_enable = data != 0,
            _ => {}
        }
    }

    fn config_start(&mut self, cmd_type: u32, srcid: SrcId, trdid: TrdId, pktid: u16) -> Option<Response> {
        if cmd_type != CMD_INVAL && cmd_type != CMD_SYNC {
            return None;
        }
        let base = Addr((u64::from(self.config_regs.addr_hi) << 32) | u64::from(self.config_regs.addr_lo));
        let line_bytes = self.topology.line_bytes();
        let nlines = u64::from(self.config_regs.buf_length) / line_bytes;

        if nlines == 0 {
            return Some(config_response(srcid, trdid, pktid));
        }

        self.config_pending = Some(ConfigOriginator { srcid, trdid, pktid });
        for i in 0..nlines {
            let addr = Addr(base.val() + i * line_bytes);
            match cmd_type {
                CMD_INVAL => self.config_inval_line(addr),
                CMD_SYNC => self.config_sync_line(addr),
                _ => unreachable!("checked above"),
            }
        }

        if self.outstanding_lines == 0 {
            self.config_pending.take().map(|o| config_response(o.srcid, o.trdid, o.pktid))
        } else {
            None
        }
    }

    fn config_inval_line(&mut self, addr: Addr) {
        let (entry, way, set) = self.directory.read_neutral(addr);
        if !entry.valid || entry.count == 0 {
            return;
        }
        let nline = self.topology.nline(addr);
        if self.ivt.search_inval(nline).is_some() {
            return;
        }
        let (full, idx) = self.ivt.full();
        if full {
            if self.config.general.trace_events {
                eprintln!("mc: IVT full while registering CONFIG invalidate for {nline:?}");
            }
            return;
        }

        let sharers: Vec<Owner> = if entry.is_cnt {
            Vec::new()
        } else if entry.count > 1 {
            let mut v = self.heap.walk(entry.ptr);
            v.push(entry.owner);
            v
        } else {
            vec![entry.owner]
        };

        self.ivt.set(
            idx,
            IvtEntry {
                valid: true,
                update: false,
                broadcast: entry.is_cnt,
                need_rsp: false,
                need_ack: false,
                originator: IvtOriginator { srcid: 0, trdid: 0, pktid: 0 },
                nline,
                nb_responses_pending: entry.count,
                cause: IvtCause::Config,
            },
        );
        self.outstanding_lines += 1;
        self.directory.invalidate(set, way);
        if !entry.is_cnt && entry.count > 1 {
            self.heap.free_chain(entry.ptr);
        }

        let local = Self::is_local(0, set);
        if entry.is_cnt {
            self.stats.record_binval(local, 0);
            self.cc_send_inval(
                PRODUCER_CONFIG,
                InvalPacket {
                    dests: Vec::new(),
                    broadcast: true,
                    ivt_index: idx,
                    nline,
                    is_instruction_cache: false,
                },
            );
        } else {
            let is_ic = sharers.first().is_some_and(|o| o.is_instruction_cache);
            self.stats.record_minval(local, 0);
            self.cc_send_inval(
                PRODUCER_CONFIG,
                InvalPacket {
                    dests: sharers.iter().map(|o| o.srcid).collect(),
                    broadcast: false,
                    ivt_index: idx,
                    nline,
                    is_instruction_cache: is_ic,
                },
            );
        }
    }

    /// Writes back a dirty line without evicting it. Modeled as an
    /// instantaneous `outstanding_lines` bump-and-drop: this engine's
    /// `XramPort::put` has no separate ack step to wait on, matching the
    /// same synchronous-PUT treatment used by eviction write-back and the
    /// broadcast-invalidate snapshot PUT elsewhere in this controller.
    fn config_sync_line(&mut self, addr: Addr) {
        let (entry, way, set) = self.directory.read_neutral(addr);
        if !entry.valid || !entry.dirty {
            return;
        }
        self.outstanding_lines += 1;
        let data = self.directory.read_line(way, set);
        self.xram_put(addr, &data);
        self.directory.write(set, way, DirEntry { dirty: false, ..entry });
        self.outstanding_lines -= 1;
    }
}

fn config_response(srcid: SrcId, trdid: TrdId, pktid: u16) -> Response {
    Response {
        rsrcid: srcid,
        rtrdid: trdid,
        rpktid: pktid,
        rdata: vec![],
        rerror: false,
        reop: true,
    }
}
