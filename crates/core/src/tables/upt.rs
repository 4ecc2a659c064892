//! Update Table (§4.4): tracks in-flight multicast updates until every
//! copy has acknowledged.

use crate::common::addr::Nline;
use crate::common::packet::{SrcId, TrdId};

/// The command that must be re-injected once an update transaction
/// completes (e.g. a deferred write or CAS response).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Originator {
    /// Requesting agent.
    pub srcid: SrcId,
    /// Per-requester transaction id.
    pub trdid: TrdId,
    /// Packet id, mirrored back on the deferred response.
    pub pktid: u16,
}

/// One in-flight multicast update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UptEntry {
    /// Whether this slot is occupied.
    pub valid: bool,
    /// Whether this is an update (vs an invalidate). UPT entries are
    /// always updates; the field exists so table state dumps distinguish
    /// an update slot from a same-shaped invalidate one without needing
    /// to know which table they came from.
    pub update: bool,
    /// Whether the update reaches every sharer (never true for UPT in
    /// practice, since counter-mode lines are invalidated rather than
    /// updated — see §4.1.3 — but carried for shape-fidelity with IVT).
    pub broadcast: bool,
    /// Whether a deferred processor response is owed once this entry
    /// drains to zero.
    pub need_rsp: bool,
    /// Whether that deferred response must carry a success/failure
    /// payload (a CAS) rather than a plain write-completion.
    pub need_ack: bool,
    /// The requester whose write or CAS triggered this update.
    pub originator: Originator,
    /// The line being updated.
    pub nline: Nline,
    /// Number of multi-acks still outstanding.
    pub nb_responses_pending: u32,
}

impl Default for UptEntry {
    fn default() -> Self {
        Self {
            valid: false,
            update: true,
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
        }
    }
}

/// Fixed-capacity table of in-flight multicast updates (§4.4).
pub struct UpdateTable {
    entries: Vec<UptEntry>,
}

impl UpdateTable {
    /// Builds a table with `size` slots.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            entries: vec![UptEntry::default(); size],
        }
    }

    /// Clears every slot back to empty.
    pub fn init(&mut self) {
        for entry in &mut self.entries {
            *entry = UptEntry::default();
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

    /// Populates slot `index` with a fresh transaction.
    pub fn set(&mut self, index: usize, entry: UptEntry) {
        self.entries[index] = entry;
    }

    /// Reads slot `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> &UptEntry {
        &self.entries[index]
    }

    /// Decrements the outstanding-ack count for `index`, returning the new
    /// count. The caller releases the entry (via [`UpdateTable::clear`])
    /// once this reaches zero.
    ///
    /// # Panics
    ///
    /// Panics if `index` does not hold a valid entry, or the count is
    /// already zero: either means a multi-ack arrived for a transaction
    /// that already completed, a protocol invariant violation.
    pub fn decrement(&mut self, index: usize) -> u32 {
        let entry = &mut self.entries[index];
        assert!(entry.valid, "multi-ack for an empty UPT slot");
        assert!(
            entry.nb_responses_pending > 0,
            "multi-ack for an already-drained UPT slot"
        );
        entry.nb_responses_pending -= 1;
        entry.nb_responses_pending
    }

    /// Releases slot `index` back to empty.
    pub fn clear(&mut self, index: usize) {
        self.entries[index] = UptEntry::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(nline: u64, nb_responses_pending: u32) -> UptEntry {
        UptEntry {
            valid: true,
            nline: Nline(nline),
            nb_responses_pending,
            need_rsp: true,
            originator: Originator {
                srcid: 1,
                trdid: 0,
                pktid: 0,
            },
            ..UptEntry::default()
        }
    }

    #[test]
    fn full_reports_first_free_slot() {
        let mut t = UpdateTable::new(2);
        t.set(0, entry(1, 3));
        let (full, idx) = t.full();
        assert!(!full);
        assert_eq!(idx, 1);
    }

    #[test]
    fn decrement_counts_down_to_zero() {
        let mut t = UpdateTable::new(1);
        t.set(0, entry(1, 2));
        assert_eq!(t.decrement(0), 1);
        assert_eq!(t.decrement(0), 0);
    }

    #[test]
    #[should_panic(expected = "already-drained")]
    fn decrement_below_zero_panics() {
        let mut t = UpdateTable::new(1);
        t.set(0, entry(1, 1));
        let _ = t.decrement(0);
        let _ = t.decrement(0);
    }

    #[test]
    fn clear_resets_slot_to_empty() {
        let mut t = UpdateTable::new(1);
        t.set(0, entry(1, 1));
        t.clear(0);
        assert!(!t.get(0).valid);
    }
}
