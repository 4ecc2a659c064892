//! READ worker (§4.1.2): ordinary cached reads, uncached reads, and LL.

use crate::common::addr::Addr;
use crate::common::packet::{Command, OpType, Owner, Response};
use crate::controller::ports::{CoherencePort, XramPort};
use crate::controller::Controller;
use crate::directory::DirEntry;
use crate::tables::trt::{Originator, TrtEntry};

impl<X: XramPort, C: CoherencePort> Controller<X, C> {
    /// Serves a READ_DATA_{UNC,MISS}, READ_INS_{UNC,MISS}, or LL command.
    pub fn read(&mut self, cmd: &Command) -> Response {
        let requester = Owner {
            srcid: cmd.srcid,
            is_instruction_cache: cmd.op.is_instruction_fetch(),
        };
        let is_ll = matches!(cmd.op, OpType::Ll);
        let (set, _tag) = self.topology.set_and_tag(cmd.address);
        let local = Self::is_local(cmd.srcid, set);
        self.stats.record_read(local, 0);
        if is_ll {
            self.stats.record_ll(local, 0);
        }

        if cmd.op.is_uncached() {
            return self.read_uncached(cmd);
        }

        let (entry, way) = self.directory.read(cmd.address);
        if entry.valid {
            let data = self.directory.read_line(way, set);
            let already_sole_owner = !entry.is_cnt && entry.count == 1 && entry.owner == requester;
            if !entry.is_cnt && !already_sole_owner {
                self.add_sharer(set, way, entry, requester);
            }
            let ll_key = is_ll.then(|| self.reservation.ll(cmd.address));
            return self.read_response(cmd, &data, ll_key);
        }

        self.read_miss(cmd, requester, is_ll, set)
    }

    fn read_uncached(&mut self, cmd: &Command) -> Response {
        let (full, trt_index) = self.trt.full();
        if full {
            self.stats.trt_full_blocked += 1;
        }
        self.trt.set(
            trt_index,
            TrtEntry {
                valid: true,
                xram_read: true,
                nline: self.topology.nline(cmd.address),
                originator: Originator {
                    srcid: cmd.srcid,
                    trdid: cmd.trdid,
                    pktid: cmd.pktid,
                },
                proc_read: true,
                read_length: 1,
                word_index: self.topology.word_index(cmd.address),
                config: false,
                ..TrtEntry::empty(self.topology.nwords() as usize)
            },
        );
        let line_base = self.topology.line_base(cmd.address);
        let result = self.xram_get(trt_index, line_base, self.topology.line_bytes() as u32);
        self.trt.clear(trt_index);
        match result {
            Ok(data) => {
                let word = data[self.topology.word_index(cmd.address)];
                Response {
                    rsrcid: cmd.srcid,
                    rtrdid: cmd.trdid,
                    rpktid: cmd.pktid,
                    rdata: vec![u64::from(word)],
                    rerror: false,
                    reop: true,
                }
            }
            Err(_) => Response {
                rsrcid: cmd.srcid,
                rtrdid: cmd.trdid,
                rpktid: cmd.pktid,
                rdata: vec![],
                rerror: true,
                reop: true,
            },
        }
    }

    fn read_miss(&mut self, cmd: &Command, requester: Owner, is_ll: bool, set: usize) -> Response {
        self.stats.read_miss += 1;
        let nline = self.topology.nline(cmd.address);
        if self.trt.hit_read(nline).is_some() {
            self.stats.trt_read_blocked += 1;
        }
        let (full, trt_index) = self.trt.full();
        if full {
            self.stats.trt_full_blocked += 1;
        }

        let ll_key = if is_ll {
            Some(self.reservation.ll(cmd.address))
        } else {
            None
        };

        self.trt.set(
            trt_index,
            TrtEntry {
                valid: true,
                xram_read: true,
                nline,
                originator: Originator {
                    srcid: cmd.srcid,
                    trdid: cmd.trdid,
                    pktid: cmd.pktid,
                },
                proc_read: true,
                read_length: self.topology.nwords() as usize,
                word_index: self.topology.word_index(cmd.address),
                ll_key,
                config: false,
                ..TrtEntry::empty(self.topology.nwords() as usize)
            },
        );

        let line_base = self.topology.line_base(cmd.address);
        let line_bytes = self.topology.line_bytes() as u32;
        let result = self.xram_get(trt_index, line_base, line_bytes);
        match result {
            Ok(data) => {
                self.install_line(set, self.topology.set_and_tag(cmd.address).1, requester, false, 1, false, &data);
                self.trt.clear(trt_index);
                self.read_response(cmd, &data, ll_key)
            }
            Err(_) => {
                self.trt.clear(trt_index);
                if self.config.general.trace_events {
                    eprintln!("mc: XRAM read error servicing read-miss at {:#x}", cmd.address.val());
                }
                Response {
                    rsrcid: cmd.srcid,
                    rtrdid: cmd.trdid,
                    rpktid: cmd.pktid,
                    rdata: vec![],
                    rerror: true,
                    reop: true,
                }
            }
        }
    }

    fn read_response(&self, cmd: &Command, data: &[u32], ll_key: Option<u32>) -> Response {
        let word_index = self.topology.word_index(cmd.address);
        let mut rdata: Vec<u64> = Vec::new();
        if let Some(key) = ll_key {
            rdata.push(u64::from(key));
        }
        let words_requested = (cmd.plen as usize / 4).max(1);
        for w in word_index..(word_index + words_requested).min(data.len()) {
            rdata.push(u64::from(data[w]));
        }
        Response {
            rsrcid: cmd.srcid,
            rtrdid: cmd.trdid,
            rpktid: cmd.pktid,
            rdata,
            rerror: false,
            reop: true,
        }
    }

    /// Registers `new_sharer` against the directory entry at `(set,
    /// way)`, converting to counter mode if the heap is exhausted or the
    /// configured sharer limit would be exceeded (§4.1.2, §8's boundary
    /// behavior).
    pub(crate) fn add_sharer(&mut self, set: usize, way: usize, entry: DirEntry, new_sharer: Owner) {
        let new_count = entry.count + 1;
        if new_count as usize > self.config.heap.max_sharers || self.heap.is_full() {
            if entry.count > 1 {
                self.heap.free_chain(entry.ptr);
            }
            if self.config.general.trace_events {
                eprintln!("mc: directory entry converting to counter mode (count={new_count})");
            }
            self.directory.write(
                set,
                way,
                DirEntry {
                    is_cnt: true,
                    count: new_count,
                    owner: Owner::default(),
                    ptr: 0,
                    ..entry
                },
            );
            return;
        }

        if entry.count == 0 {
            self.directory.write(
                set,
                way,
                DirEntry {
                    count: 1,
                    owner: new_sharer,
                    ..entry
                },
            );
            return;
        }

        let tentative_next = if entry.count > 1 { entry.ptr } else { 0 };
        let idx = self
            .heap
            .alloc(new_sharer, tentative_next)
            .expect("heap.is_full() already checked above");
        if entry.count <= 1 {
            // First additional sharer: this node starts a fresh,
            // self-loop-terminated chain.
            self.heap.write(idx, crate::heap::HeapEntry { owner: new_sharer, next: idx });
        }
        self.directory.write(
            set,
            way,
            DirEntry {
                count: new_count,
                ptr: idx,
                ..entry
            },
        );
    }
}
