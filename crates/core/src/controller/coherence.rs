//! Inbound coherence-network traffic (§4.1.6): CLEANUP and MULTI-ACK.
//!
//! Both retire one outstanding response against a tracking-table entry
//! (IVT for cleanup, UPT for multi-ack) and, once the entry drains to
//! zero, surface the processor response that was deferred when the
//! triggering write or CAS first registered it.

use crate::common::packet::{Clack, Cleanup, MultiAck, Owner, Response, SrcId, TrdId};
use crate::controller::Controller;
use crate::directory::DirEntry;
use crate::tables::ivt::IvtCause;

use super::ports::{CoherencePort, XramPort};

impl<X: XramPort, C: CoherencePort> Controller<X, C> {
    /// Applies an L1 cache's announcement that it dropped its copy of a
    /// line, then acknowledges it with a CLACK. Returns the deferred
    /// write/CAS response if this cleanup was the last one a pending
    /// invalidation was waiting on.
    pub fn cleanup(&mut self, pkt: Cleanup) -> Option<Response> {
        let set = self.topology.set_of(pkt.nline);
        let local = Self::is_local(pkt.srcid, set);
        self.stats.record_cleanup(local, 0);

        let entry = self.directory.entry_at(set, pkt.way);
        if entry.valid {
            let departing = Owner {
                srcid: pkt.srcid,
                is_instruction_cache: pkt.is_instruction_cache,
            };
            self.release_sharer(set, pkt.way, entry, departing);
        }

        let response = self.ivt.search_inval(pkt.nline).and_then(|idx| {
            if self.ivt.decrement(idx) > 0 {
                return None;
            }
            let drained = *self.ivt.get(idx);
            self.ivt.clear(idx);
            match drained.cause {
                IvtCause::Config => {
                    self.outstanding_lines = self.outstanding_lines.saturating_sub(1);
                    if self.outstanding_lines == 0 {
                        self.config_pending
                            .take()
                            .map(|o| deferred_response(o.srcid, o.trdid, o.pktid, false))
                    } else {
                        None
                    }
                }
                IvtCause::Eviction => None,
                IvtCause::Write => drained.need_rsp.then(|| {
                    deferred_response(
                        drained.originator.srcid,
                        drained.originator.trdid,
                        drained.originator.pktid,
                        drained.need_ack,
                    )
                }),
            }
        });

        self.emit_clack(Clack {
            dest: pkt.srcid,
            set,
            way: pkt.way,
            is_instruction_cache: pkt.is_instruction_cache,
        });

        response
    }

    /// Applies one multi-ack against the Update Table entry it retires.
    /// Returns the deferred write/CAS response once every sharer has
    /// acknowledged its update.
    pub fn multi_ack(&mut self, pkt: MultiAck) -> Option<Response> {
        if self.upt.decrement(pkt.upt_index) > 0 {
            return None;
        }
        let drained = *self.upt.get(pkt.upt_index);
        self.upt.clear(pkt.upt_index);
        drained.need_rsp.then(|| {
            deferred_response(
                drained.originator.srcid,
                drained.originator.trdid,
                drained.originator.pktid,
                drained.need_ack,
            )
        })
    }

    /// Removes `departing` from the directory entry at `(set, way)`:
    /// decrements `count`, and if `departing` is the tracked owner,
    /// promotes the heap chain's head into the directory slot (§4.1.6).
    /// Counter-mode entries only need their count decremented, since no
    /// sharer identities are tracked.
    fn release_sharer(&mut self, set: usize, way: usize, entry: DirEntry, departing: Owner) {
        if entry.is_cnt {
            self.directory.write(
                set,
                way,
                DirEntry {
                    count: entry.count.saturating_sub(1),
                    ..entry
                },
            );
            return;
        }

        if entry.count == 0 {
            return;
        }

        if entry.owner == departing {
            if entry.count > 1 {
                let head = self.heap.read(entry.ptr);
                let remaining_head = if head.next == entry.ptr { entry.ptr } else { head.next };
                self.heap.free(entry.ptr);
                let new_count = entry.count - 1;
                self.directory.write(
                    set,
                    way,
                    DirEntry {
                        owner: head.owner,
                        count: new_count,
                        ptr: if new_count > 1 { remaining_head } else { 0 },
                        ..entry
                    },
                );
            } else {
                self.directory.write(
                    set,
                    way,
                    DirEntry {
                        owner: Owner::default(),
                        count: 0,
                        ptr: 0,
                        ..entry
                    },
                );
            }
            return;
        }

        let new_ptr = self.remove_sharer_from_heap(entry.ptr, departing);
        let new_count = entry.count - 1;
        self.directory.write(
            set,
            way,
            DirEntry {
                count: new_count,
                ptr: if new_count > 1 { new_ptr } else { 0 },
                ..entry
            },
        );
    }

    /// Splices `target` out of the heap chain rooted at `head`, freeing
    /// its node back to the free list. Returns the chain's (possibly new)
    /// head index. Leaves the chain unchanged if `target` is not found,
    /// which should not happen given a correctly-tracked directory.
    fn remove_sharer_from_heap(&mut self, head: usize, target: Owner) -> usize {
        let first = self.heap.read(head);
        if first.owner == target {
            let next = first.next;
            self.heap.free(head);
            return if next == head { head } else { next };
        }

        let mut prev = head;
        loop {
            let prev_next = self.heap.read(prev).next;
            if prev_next == prev {
                return head;
            }
            let node = self.heap.read(prev_next);
            if node.owner == target {
                let idx = prev_next;
                let is_tail = node.next == idx;
                let mut prev_entry = self.heap.read(prev);
                prev_entry.next = if is_tail { prev } else { node.next };
                self.heap.write(prev, prev_entry);
                self.heap.free(idx);
                return head;
            }
            prev = prev_next;
        }
    }
}

fn deferred_response(srcid: SrcId, trdid: TrdId, pktid: u16, need_ack: bool) -> Response {
    Response {
        rsrcid: srcid,
        rtrdid: trdid,
        rpktid: pktid,
        rdata: if need_ack { vec![0] } else { vec![] },
        rerror: false,
        reop: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::addr::{Addr, Nline, Topology};
    use crate::config::Config;
    use crate::controller::ports::{CoherencePort, XramPort};
    use crate::common::error::McError;
    use crate::common::packet::{InvalPacket, UpdatePacket};
    use crate::directory::DirEntry;
    use crate::heap::HeapEntry;
    use crate::tables::ivt::{IvtEntry, Originator as IvtOriginator};
    use crate::tables::upt::{Originator as UptOriginator, UptEntry};

    struct NullXram;
    impl XramPort for NullXram {
        fn get(&mut self, _addr: Addr, _plen: u32) -> Result<Vec<u32>, McError> {
            Ok(vec![0; 4])
        }
        fn put(&mut self, _addr: Addr, _data: &[u32]) {}
    }

    #[derive(Default)]
    struct RecordingCoherence {
        clacks: Vec<Clack>,
    }
    impl CoherencePort for RecordingCoherence {
        fn send_inval(&mut self, _pkt: InvalPacket) {}
        fn send_update(&mut self, _pkt: UpdatePacket) {}
        fn send_clack(&mut self, pkt: Clack) {
            self.clacks.push(pkt);
        }
    }

    fn controller() -> Controller<NullXram, RecordingCoherence> {
        Controller::new(Config::default(), NullXram, RecordingCoherence::default())
    }

    fn owner(srcid: u16) -> Owner {
        Owner {
            srcid,
            is_instruction_cache: false,
        }
    }

    #[test]
    fn cleanup_of_sole_owner_clears_directory_entry() {
        let mut ctl = controller();
        let topo = Topology::new(4, 4);
        let (set, tag) = topo.set_and_tag(Addr(0x40));
        ctl.directory.write(
            set,
            0,
            DirEntry {
                valid: true,
                tag,
                count: 1,
                owner: owner(5),
                ..DirEntry::default()
            },
        );

        let rsp = ctl.cleanup(Cleanup {
            srcid: 5,
            is_instruction_cache: false,
            way: 0,
            nline: topo.nline(Addr(0x40)),
        });

        assert!(rsp.is_none());
        let entry = ctl.directory.entry_at(set, 0);
        assert_eq!(entry.count, 0);
        assert_eq!(entry.owner, Owner::default());
        assert_eq!(ctl.coherence.clacks.len(), 1);
    }

    #[test]
    fn cleanup_promotes_heap_head_when_owner_departs() {
        let mut ctl = controller();
        let topo = Topology::new(4, 4);
        let (set, tag) = topo.set_and_tag(Addr(0x80));
        let tail = ctl.heap.alloc(owner(9), 0).unwrap();
        ctl.heap.write(tail, HeapEntry { owner: owner(9), next: tail });
        let head = ctl.heap.alloc(owner(8), tail).unwrap();
        ctl.directory.write(
            set,
            0,
            DirEntry {
                valid: true,
                tag,
                count: 3,
                owner: owner(7),
                ptr: head,
                ..DirEntry::default()
            },
        );

        ctl.cleanup(Cleanup {
            srcid: 7,
            is_instruction_cache: false,
            way: 0,
            nline: topo.nline(Addr(0x80)),
        });

        let entry = ctl.directory.entry_at(set, 0);
        assert_eq!(entry.count, 2);
        assert_eq!(entry.owner, owner(8));
        assert_eq!(ctl.heap.walk(entry.ptr), vec![owner(9)]);
    }

    #[test]
    fn cleanup_splices_mid_chain_sharer() {
        let mut ctl = controller();
        let topo = Topology::new(4, 4);
        let (set, tag) = topo.set_and_tag(Addr(0xC0));
        let tail = ctl.heap.alloc(owner(9), 0).unwrap();
        ctl.heap.write(tail, HeapEntry { owner: owner(9), next: tail });
        let mid = ctl.heap.alloc(owner(8), tail).unwrap();
        let head = ctl.heap.alloc(owner(6), mid).unwrap();
        ctl.directory.write(
            set,
            0,
            DirEntry {
                valid: true,
                tag,
                count: 4,
                owner: owner(7),
                ptr: head,
                ..DirEntry::default()
            },
        );

        ctl.cleanup(Cleanup {
            srcid: 8,
            is_instruction_cache: false,
            way: 0,
            nline: topo.nline(Addr(0xC0)),
        });

        let entry = ctl.directory.entry_at(set, 0);
        assert_eq!(entry.count, 3);
        assert_eq!(entry.owner, owner(7));
        assert_eq!(ctl.heap.walk(entry.ptr), vec![owner(6), owner(9)]);
    }

    #[test]
    fn cleanup_draining_ivt_surfaces_deferred_write_response() {
        let mut ctl = controller();
        let topo = Topology::new(4, 4);
        let nline = topo.nline(Addr(0x100));
        ctl.ivt.set(
            0,
            IvtEntry {
                valid: true,
                need_rsp: true,
                need_ack: false,
                originator: IvtOriginator {
                    srcid: 3,
                    trdid: 1,
                    pktid: 42,
                },
                nline,
                nb_responses_pending: 1,
                cause: IvtCause::Write,
                ..IvtEntry::default()
            },
        );

        let (set, tag) = topo.set_and_tag(Addr(0x100));
        ctl.directory.write(
            set,
            0,
            DirEntry {
                valid: true,
                tag,
                count: 1,
                owner: owner(5),
                ..DirEntry::default()
            },
        );

        let rsp = ctl
            .cleanup(Cleanup {
                srcid: 5,
                is_instruction_cache: false,
                way: 0,
                nline,
            })
            .expect("last cleanup drains the IVT entry");

        assert_eq!(rsp.rsrcid, 3);
        assert_eq!(rsp.rpktid, 42);
        assert!(rsp.rdata.is_empty());
        assert!(ctl.ivt.search_inval(nline).is_none());
    }

    #[test]
    fn cleanup_eviction_cause_never_responds() {
        let mut ctl = controller();
        let topo = Topology::new(4, 4);
        let nline = topo.nline(Addr(0x140));
        ctl.ivt.set(
            0,
            IvtEntry {
                valid: true,
                need_rsp: false,
                nline,
                nb_responses_pending: 1,
                cause: IvtCause::Eviction,
                ..IvtEntry::default()
            },
        );

        let rsp = ctl.cleanup(Cleanup {
            srcid: 5,
            is_instruction_cache: false,
            way: 0,
            nline,
        });

        assert!(rsp.is_none());
        assert!(ctl.ivt.search_inval(nline).is_none());
    }

    #[test]
    fn multi_ack_drains_upt_and_surfaces_cas_shaped_response() {
        let mut ctl = controller();
        let nline = Nline(7);
        ctl.upt.set(
            0,
            UptEntry {
                valid: true,
                need_rsp: true,
                need_ack: true,
                originator: UptOriginator {
                    srcid: 2,
                    trdid: 9,
                    pktid: 1,
                },
                nline,
                nb_responses_pending: 2,
                ..UptEntry::default()
            },
        );

        assert!(ctl.multi_ack(MultiAck { upt_index: 0 }).is_none());
        let rsp = ctl
            .multi_ack(MultiAck { upt_index: 0 })
            .expect("second ack drains the entry");
        assert_eq!(rsp.rsrcid, 2);
        assert_eq!(rsp.rdata, vec![0]);
    }
}
