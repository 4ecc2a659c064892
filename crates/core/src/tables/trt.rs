//! Transaction Table (§4.4): tracks GET/PUT transactions in flight to
//! XRAM, and doubles as the write-through merge buffer for a write that
//! misses while its line is already being fetched.

use crate::common::addr::Nline;
use crate::common::packet::{SrcId, TrdId};

/// The processor-side request that originated a TRT entry, carried so the
/// eventual XRAM response can be routed back to the right requester.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Originator {
    /// Requesting agent.
    pub srcid: SrcId,
    /// Per-requester transaction id.
    pub trdid: TrdId,
    /// Packet id (carries the op type on the response path).
    pub pktid: u16,
}

/// One in-flight XRAM transaction, or a write-through merge buffer for a
/// write that hit an already-pending GET on the same line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrtEntry {
    /// Whether this slot is occupied.
    pub valid: bool,
    /// `true` for a GET (read miss), `false` for a PUT (write-back).
    pub xram_read: bool,
    /// The line this transaction is fetching or writing back.
    pub nline: Nline,
    /// The requester that caused this transaction, for routing the
    /// eventual response.
    pub originator: Originator,
    /// Whether the originating request was a processor read (vs a write
    /// miss, which owes no data response, only completion).
    pub proc_read: bool,
    /// Number of words requested by the originating read.
    pub read_length: usize,
    /// First word index touched by the originating access.
    pub word_index: usize,
    /// Write-through merge buffer, one slot per line word. Words already
    /// staged by a racing write (`wdata_be[i] != 0`) are preserved when
    /// the XRAM response for this transaction arrives; all other slots
    /// are overwritten in place by [`TransactionTable::write_rsp`], so
    /// once the response completes this array holds the final line.
    pub wdata: Vec<u32>,
    /// Per-word byte-enable mask for `wdata`.
    pub wdata_be: Vec<u8>,
    /// Set once XRAM reports an error completing this transaction.
    pub rerror: bool,
    /// The LL reservation key to hand back, if the originator was an LL.
    pub ll_key: Option<u32>,
    /// Whether this transaction was opened on behalf of the CONFIG FSM's
    /// maintenance traffic rather than a processor command (§4.1.8).
    pub config: bool,
}

impl TrtEntry {
    /// A blank entry with `nwords`-wide, all-zero merge buffers.
    #[must_use]
    pub(crate) fn empty(nwords: usize) -> Self {
        Self {
            valid: false,
            xram_read: false,
            nline: Nline(0),
            originator: Originator {
                srcid: 0,
                trdid: 0,
                pktid: 0,
            },
            proc_read: false,
            read_length: 0,
            word_index: 0,
            wdata: vec![0; nwords],
            wdata_be: vec![0; nwords],
            rerror: false,
            ll_key: None,
            config: false,
        }
    }
}

/// Fixed-capacity table of in-flight XRAM transactions (§4.4).
///
/// Invariant upheld by callers: at most one valid GET and one valid PUT
/// per `nline` at a time (enforced by [`TransactionTable::hit_read`] /
/// [`TransactionTable::hit_write`] being consulted before `set`).
pub struct TransactionTable {
    entries: Vec<TrtEntry>,
    nwords: usize,
}

impl TransactionTable {
    /// Builds a table with `size` slots, each with a `nwords`-wide
    /// write-through merge buffer.
    #[must_use]
    pub fn new(size: usize, nwords: usize) -> Self {
        Self {
            entries: (0..size).map(|_| TrtEntry::empty(nwords)).collect(),
            nwords,
        }
    }

    /// Clears every slot back to empty.
    pub fn init(&mut self) {
        for entry in &mut self.entries {
            *entry = TrtEntry::empty(self.nwords);
        }
    }

    /// Whether every slot is occupied, and if not, the index of a free one.
    #[must_use]
    pub fn full(&self) -> (bool, usize) {
        match self.entries.iter().position(|e| !e.valid) {
            Some(idx) => (false, idx),
            None => (true, 0),
        }
    }

    /// Finds the (at most one) in-flight GET transaction already fetching
    /// `nline`, so a read or a write miss on the same line can merge into
    /// it instead of issuing a second GET.
    #[must_use]
    pub fn hit_read(&self, nline: Nline) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.valid && e.xram_read && e.nline == nline)
    }

    /// Finds the (at most one) in-flight PUT transaction writing back
    /// `nline`.
    #[must_use]
    pub fn hit_write(&self, nline: Nline) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.valid && !e.xram_read && e.nline == nline)
    }

    /// Populates slot `index` with a fresh transaction.
    pub fn set(&mut self, index: usize, entry: TrtEntry) {
        self.entries[index] = entry;
    }

    /// Reads slot `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> &TrtEntry {
        &self.entries[index]
    }

    /// Mutably accesses slot `index`, e.g. to merge a later write into the
    /// buffer while the GET is still outstanding.
    pub fn get_mut(&mut self, index: usize) -> &mut TrtEntry {
        &mut self.entries[index]
    }

    /// Merges a write burst into slot `index`'s write-through buffer: each
    /// word whose byte-enable is non-zero in `words` overwrites the
    /// corresponding slot in `wdata`/`wdata_be` starting at `word_index`.
    pub fn merge_write(&mut self, index: usize, word_index: usize, words: &[(u8, u32)]) {
        let entry = &mut self.entries[index];
        for (i, &(be, data)) in words.iter().enumerate() {
            let w = word_index + i;
            if w >= entry.wdata.len() {
                break;
            }
            if be != 0 {
                entry.wdata[w] = data;
                entry.wdata_be[w] = be;
            }
        }
    }

    /// Applies a single 64-bit XRAM response flit, covering the two
    /// consecutive 32-bit words starting at `word_pair * 2`, to slot
    /// `index`'s buffer. A word already marked dirty by a racing write
    /// (`wdata_be != 0`) keeps its merged value; otherwise the XRAM word
    /// is written in. `rerror` is latched (sticky) across flits of the
    /// same transaction.
    pub fn write_rsp(&mut self, index: usize, word_pair: usize, data: (u32, u32), rerror: bool) {
        let entry = &mut self.entries[index];
        entry.rerror |= rerror;
        for (offset, word) in [data.0, data.1].into_iter().enumerate() {
            let w = word_pair * 2 + offset;
            if w >= entry.wdata.len() {
                break;
            }
            if entry.wdata_be[w] == 0 {
                entry.wdata[w] = word;
            }
        }
    }

    /// Releases slot `index` back to empty.
    pub fn clear(&mut self, index: usize) {
        self.entries[index] = TrtEntry::empty(self.nwords);
    }
}
