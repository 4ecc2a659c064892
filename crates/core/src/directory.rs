//! Directory and data arrays (§4.2, §3): the set-associative tag+state
//! array describing which L1 caches hold a copy of each line, plus the
//! backing line-data storage.

use crate::common::addr::{Addr, Topology};
use crate::common::packet::Owner;

/// One (set, way) slot of the directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirEntry {
    /// Whether this slot holds a live line.
    pub valid: bool,
    /// Whether the line has been written since it entered the directory.
    pub dirty: bool,
    /// Held by a worker FSM mid-transaction on this line; a second worker
    /// must not observe a torn update (enforced by the DIR allocator, not
    /// by this flag — the flag itself is directory-visible state carried
    /// into the eviction-priority ladder, §3).
    pub lock: bool,
    /// The line's tag (set is implied by the slot's own coordinates).
    pub tag: u64,
    /// Counter mode: sharer identities are not tracked, only a population
    /// count.
    pub is_cnt: bool,
    /// Number of L1 copies.
    pub count: u32,
    /// First sharer; meaningful only when `!is_cnt && count > 0`.
    pub owner: Owner,
    /// Head of the additional-sharers chain in the heap; meaningful only
    /// when `!is_cnt && count > 1`.
    pub ptr: usize,
    /// Pseudo-LRU "recent" bit.
    pub recent: bool,
}

impl Default for DirEntry {
    fn default() -> Self {
        Self {
            valid: false,
            dirty: false,
            lock: false,
            tag: 0,
            is_cnt: false,
            count: 0,
            owner: Owner::default(),
            ptr: 0,
            recent: false,
        }
    }
}

/// Set-associative directory with pseudo-LRU and a backing data array.
pub struct Directory {
    topology: Topology,
    nways: usize,
    entries: Vec<DirEntry>,
    data: Vec<u32>,
}

impl Directory {
    /// Builds a directory sized to `topology` with `nways` ways per set.
    #[must_use]
    pub fn new(topology: Topology, nways: usize) -> Self {
        let nsets = topology.nsets() as usize;
        Self {
            topology,
            nways,
            entries: vec![DirEntry::default(); nsets * nways],
            data: vec![0; nsets * nways * topology.nwords() as usize],
        }
    }

    fn slot(&self, set: usize, way: usize) -> usize {
        set * self.nways + way
    }

    /// Re-initializes every slot to invalid/empty.
    pub fn init(&mut self) {
        for entry in &mut self.entries {
            *entry = DirEntry::default();
        }
        for word in &mut self.data {
            *word = 0;
        }
    }

    /// Looks up `address`'s line. On a hit, updates the pseudo-LRU
    /// "recent" bit (clearing all ways' bits first if they had all become
    /// recent) and returns the entry and its way. On a miss, returns an
    /// invalid sentinel and way `0`.
    #[must_use]
    pub fn read(&mut self, address: Addr) -> (DirEntry, usize) {
        let (set, tag) = self.topology.set_and_tag(address);
        for way in 0..self.nways {
            let idx = self.slot(set, way);
            if self.entries[idx].valid && self.entries[idx].tag == tag {
                self.touch_recent(set, way);
                return (self.entries[self.slot(set, way)], way);
            }
        }
        (DirEntry::default(), 0)
    }

    /// Same lookup as [`Directory::read`] but without mutating LRU state,
    /// and also reporting the decoded `set`.
    #[must_use]
    pub fn read_neutral(&self, address: Addr) -> (DirEntry, usize, usize) {
        let (set, tag) = self.topology.set_and_tag(address);
        for way in 0..self.nways {
            let idx = self.slot(set, way);
            if self.entries[idx].valid && self.entries[idx].tag == tag {
                return (self.entries[idx], way, set);
            }
        }
        (DirEntry::default(), 0, set)
    }

    fn touch_recent(&mut self, set: usize, way: usize) {
        let idx = self.slot(set, way);
        self.entries[idx].recent = true;
        if (0..self.nways).all(|w| self.entries[self.slot(set, w)].recent) {
            for w in 0..self.nways {
                let i = self.slot(set, w);
                self.entries[i].recent = w == way;
            }
        }
    }

    /// Replaces the entry at `(set, way)` and marks it pseudo-LRU-recent.
    pub fn write(&mut self, set: usize, way: usize, entry: DirEntry) {
        let idx = self.slot(set, way);
        self.entries[idx] = entry;
        self.touch_recent(set, way);
    }

    /// Chooses an eviction victim way within `set` per the §3 priority
    /// ladder: (1) any invalid way, (2) not-recent and not-locked, (3)
    /// not-recent and locked, (4) recent and not-locked, (5) way 0.
    #[must_use]
    pub fn select(&self, set: usize) -> usize {
        let ways = || (0..self.nways).map(|w| (w, self.entries[self.slot(set, w)]));
        if let Some((w, _)) = ways().find(|(_, e)| !e.valid) {
            return w;
        }
        if let Some((w, _)) = ways().find(|(_, e)| !e.recent && !e.lock) {
            return w;
        }
        if let Some((w, _)) = ways().find(|(_, e)| !e.recent && e.lock) {
            return w;
        }
        if let Some((w, _)) = ways().find(|(_, e)| e.recent && !e.lock) {
            return w;
        }
        0
    }

    /// Reads the raw entry at `(set, way)` without any address decoding.
    #[must_use]
    pub fn entry_at(&self, set: usize, way: usize) -> DirEntry {
        self.entries[self.slot(set, way)]
    }

    /// Invalidates the slot at `(set, way)`.
    pub fn invalidate(&mut self, set: usize, way: usize) {
        let idx = self.slot(set, way);
        self.entries[idx] = DirEntry::default();
    }

    fn data_base(&self, set: usize, way: usize) -> usize {
        self.slot(set, way) * self.topology.nwords() as usize
    }

    /// Reads one word of line data at `(way, set, word)`.
    #[must_use]
    pub fn read_word(&self, way: usize, set: usize, word: usize) -> u32 {
        self.data[self.data_base(set, way) + word]
    }

    /// Reads an entire line's data at `(way, set)`, in ascending word
    /// order.
    #[must_use]
    pub fn read_line(&self, way: usize, set: usize) -> Vec<u32> {
        let base = self.data_base(set, way);
        self.data[base..base + self.topology.nwords() as usize].to_vec()
    }

    /// Writes `data` into word `word` of `(way, set)`, honoring a
    /// per-byte `be` mask (bit `i` set means byte `i` of the word is
    /// written).
    pub fn write_word(&mut self, way: usize, set: usize, word: usize, data: u32, be: u8) {
        let idx = self.data_base(set, way) + word;
        if be == 0xF {
            self.data[idx] = data;
            return;
        }
        let mut merged = self.data[idx];
        for byte in 0..4u32 {
            if be & (1 << byte) != 0 {
                let shift = byte * 8;
                let mask = 0xFFu32 << shift;
                merged = (merged & !mask) | (data & mask);
            }
        }
        self.data[idx] = merged;
    }

    /// Writes a full line at `(way, set)` in one call.
    pub fn write_line(&mut self, way: usize, set: usize, line: &[u32]) {
        let base = self.data_base(set, way);
        self.data[base..base + line.len()].copy_from_slice(line);
    }
}
