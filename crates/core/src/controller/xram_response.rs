//! XRAM-response FSM (§4.1.5): installs a freshly-fetched line into the
//! directory, evicting a victim way if needed.

use crate::common::packet::{InvalPacket, Owner};
use crate::controller::cc_send::PRODUCER_XRAM_RESPONSE;
use crate::controller::ports::{CoherencePort, XramPort};
use crate::controller::Controller;
use crate::directory::DirEntry;
use crate::tables::ivt::{IvtCause, IvtEntry, Originator as IvtOriginator};

impl<X: XramPort, C: CoherencePort> Controller<X, C> {
    /// Selects a victim way in `set`, evicts it if occupied (registering
    /// an invalidation and/or dirty write-back as needed), then installs
    /// the new line described by `tag`/`owner`/`is_cnt`/`count`/`dirty`/
    /// `data`. Returns the way used.
    pub(crate) fn install_line(
        &mut self,
        set: usize,
        tag: u64,
        owner: Owner,
        is_cnt: bool,
        count: u32,
        dirty: bool,
        data: &[u32],
    ) -> usize {
        let way = self.directory.select(set);
        let victim = self.directory.entry_at(set, way);

        if victim.valid {
            self.evict(set, way, victim);
        }

        let entry = DirEntry {
            valid: true,
            dirty,
            lock: false,
            tag,
            is_cnt,
            count,
            owner,
            ptr: 0,
            recent: false,
        };
        self.directory.write(set, way, entry);
        self.directory.write_line(way, set, data);
        way
    }

    fn evict(&mut self, set: usize, way: usize, victim: DirEntry) {
        let victim_nline = self.topology.nline_of(set, victim.tag);

        if victim.count > 0 {
            let sharers: Vec<Owner> = if victim.is_cnt {
                Vec::new()
            } else if victim.count > 1 {
                let mut v = self.heap.walk(victim.ptr);
                v.push(victim.owner);
                v
            } else {
                vec![victim.owner]
            };

            let (full, ivt_index) = self.ivt.full();
            if !full {
                self.ivt.set(
                    ivt_index,
                    IvtEntry {
                        valid: true,
                        update: false,
                        broadcast: victim.is_cnt,
                        need_rsp: false,
                        need_ack: false,
                        originator: IvtOriginator { srcid: 0, trdid: 0, pktid: 0 },
                        nline: victim_nline,
                        nb_responses_pending: victim.count,
                        cause: IvtCause::Eviction,
                    },
                );
                if victim.is_cnt {
                    self.stats.record_binval(Self::is_local(victim.owner.srcid, set), 0);
                    self.cc_send_inval(
                        PRODUCER_XRAM_RESPONSE,
                        InvalPacket {
                            dests: Vec::new(),
                            broadcast: true,
                            ivt_index,
                            nline: victim_nline,
                            is_instruction_cache: false,
                        },
                    );
                } else {
                    let is_ic = sharers.first().is_some_and(|o| o.is_instruction_cache);
                    self.stats.record_minval(Self::is_local(victim.owner.srcid, set), 0);
                    self.cc_send_inval(
                        PRODUCER_XRAM_RESPONSE,
                        InvalPacket {
                            dests: sharers.iter().map(|o| o.srcid).collect(),
                            broadcast: false,
                            ivt_index,
                            nline: victim_nline,
                            is_instruction_cache: is_ic,
                        },
                    );
                    if victim.count > 1 {
                        self.heap.free_chain(victim.ptr);
                    }
                }
            }
        }

        if victim.dirty {
            let victim_addr = self.topology.line_base_of(victim_nline);
            let old_data = self.directory.read_line(way, set);
            self.xram_put(victim_addr, &old_data);
        }
    }
}
