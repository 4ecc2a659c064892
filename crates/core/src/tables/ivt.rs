//! Invalidate Table (§4.4): tracks in-flight invalidations until every
//! target cache has acknowledged via cleanup.
//!
//! Same shape as the Update Table, with `update = false` always (§4.4).

use crate::common::addr::Nline;
use crate::common::packet::{SrcId, TrdId};

/// The command that must be re-injected once an invalidation transaction
/// completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Originator {
    /// Requesting agent.
    pub srcid: SrcId,
    /// Per-requester transaction id.
    pub trdid: TrdId,
    /// Packet id, mirrored back on the deferred response.
    pub pktid: u16,
}

/// What triggered this invalidation, so the right follow-up action runs
/// once every target has acknowledged (§4.1.6: "possibly ack the CONFIG
/// FSM or emit the deferred write response").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IvtCause {
    /// A write or CAS by `originator` needing exclusive access.
    Write,
    /// A CONFIG-FSM maintenance inval with no processor originator.
    Config,
    /// The directory entry was evicted to make room for a miss.
    Eviction,
}

/// One in-flight invalidation transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IvtEntry {
    /// Whether this slot is occupied.
    pub valid: bool,
    /// Always `false`: an IVT entry is never an update.
    pub update: bool,
    /// Whether this invalidation is a broadcast (counter-mode line) or a
    /// per-copy multicast.
    pub broadcast: bool,
    /// Whether a deferred processor response is owed once this entry
    /// drains to zero.
    pub need_rsp: bool,
    /// Whether that deferred response must carry a success/failure
    /// payload (a CAS) rather than a plain write-completion.
    pub need_ack: bool,
    /// The requester whose write or CAS triggered this invalidation.
    pub originator: Originator,
    /// The line being invalidated.
    pub nline: Nline,
    /// Number of acks (cleanups, or cleared heap entries) still
    /// outstanding.
    pub nb_responses_pending: u32,
    /// What triggered this invalidation.
    pub cause: IvtCause,
}

impl Default for IvtEntry {
    fn default() -> Self {
        Self {
            valid: false,
            update: false,
            broadcast: false,
            need_rsp: false,
            need_ack: false,
            nline: Nline(0),
            originator: Originator {
                srcid: 0,
                trdid: 0,
                pktid: 0,
            },
            nb_responses_pending: 0,
            cause: IvtCause::Write,
        }
    }
}

/// Fixed-capacity table of in-flight invalidations (§4.4).
///
/// Invariant upheld by callers: per `nline`, at most one valid IVT entry
/// (enforced by consulting [`InvalidateTable::search_inval`] before
/// `set`).
pub struct InvalidateTable {
    entries: Vec<IvtEntry>,
}

impl InvalidateTable {
    /// Builds a table with `size` slots.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            entries: vec![IvtEntry::default(); size],
        }
    }

    /// Clears every slot back to empty.
    pub fn init(&mut self) {
        for entry in &mut self.entries {
            *entry = IvtEntry::default();
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

    /// Finds the in-flight invalidation for `nline`, if any. A second
    /// writer racing for the same line while an invalidation is already
    /// under way must stall rather than issue a redundant one (§4.1.2).
    #[must_use]
    pub fn search_inval(&self, nline: Nline) -> Option<usize> {
        self.entries.iter().position(|e| e.valid && e.nline == nline)
    }

    /// Populates slot `index` with a fresh transaction.
    pub fn set(&mut self, index: usize, entry: IvtEntry) {
        self.entries[index] = entry;
    }

    /// Reads slot `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> &IvtEntry {
        &self.entries[index]
    }

    /// Decrements the outstanding-ack count for `index`, returning the new
    /// count.
    ///
    /// # Panics
    ///
    /// Panics if `index` does not hold a valid entry, or the count is
    /// already zero.
    pub fn decrement(&mut self, index: usize) -> u32 {
        let entry = &mut self.entries[index];
        assert!(entry.valid, "ack for an empty IVT slot");
        assert!(
            entry.nb_responses_pending > 0,
            "ack for an already-drained IVT slot"
        );
        entry.nb_responses_pending -= 1;
        entry.nb_responses_pending
    }

    /// Releases slot `index` back to empty.
    pub fn clear(&mut self, index: usize) {
        self.entries[index] = IvtEntry::default();
    }
}
