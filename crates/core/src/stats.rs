//! Observable counters (§6.5): the read-only `INSTRM` register set.
//!
//! All counters are monotonically increasing `u64`s internally; the
//! `INSTRM` 32-bit register view and its `*_HI` (always-zero) aliasing
//! is a CLI/config-subsystem presentation concern, not this struct's.
//! Per §9's open question on `req_distance`, no field here is
//! normative beyond monotonicity and reset-to-zero.

/// Local / remote / cost counters for one request category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CategoryStats {
    /// Requests from a local requester.
    pub local: u64,
    /// Requests from a remote requester.
    pub remote: u64,
    /// Accumulated `req_distance` cost (Manhattan metric on SRCID
    /// coordinates, §9 — informative only).
    pub cost: u64,
}

impl CategoryStats {
    fn record(&mut self, local: bool, cost: u64) {
        if local {
            self.local += 1;
        } else {
            self.remote += 1;
        }
        self.cost += cost;
    }
}

/// Coherence-traffic counters, additionally totaled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CoherenceStats {
    /// Local / remote / cost split.
    pub category: CategoryStats,
    /// Running total (`local + remote`), kept redundantly since it is an
    /// `INSTRM` register in its own right.
    pub total: u64,
}

impl CoherenceStats {
    fn record(&mut self, local: bool, cost: u64) {
        self.category.record(local, cost);
        self.total += 1;
    }
}

/// The full observable-counter set (§6.5).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct Stats {
    /// READ requests.
    pub read: CategoryStats,
    /// WRITE requests.
    pub write: CategoryStats,
    /// LL requests.
    pub ll: CategoryStats,
    /// SC requests.
    pub sc: CategoryStats,
    /// CAS requests.
    pub cas: CategoryStats,

    /// Multicast updates sent.
    pub mupdate: CoherenceStats,
    /// Multicast invalidations sent.
    pub minval: CoherenceStats,
    /// Broadcast invalidations sent.
    pub binval: CoherenceStats,
    /// Cleanup messages received.
    pub cleanup: CoherenceStats,

    /// Read misses.
    pub read_miss: u64,
    /// Write misses.
    pub write_miss: u64,
    /// Writes that evicted a dirty victim.
    pub write_dirty: u64,
    /// Writes that triggered a broadcast invalidation.
    pub write_broadcast: u64,

    /// Times a worker blocked because the line it needed was mid-GET/PUT.
    pub trt_read_blocked: u64,
    /// Times a worker blocked because the TRT itself was full.
    pub trt_full_blocked: u64,
}

impl Stats {
    /// A fresh, all-zero counter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets every counter to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Records a READ, LL, or SC category hit.
    pub fn record_read(&mut self, local: bool, cost: u64) {
        self.read.record(local, cost);
    }

    /// Records a WRITE.
    pub fn record_write(&mut self, local: bool, cost: u64) {
        self.write.record(local, cost);
    }

    /// Records an LL.
    pub fn record_ll(&mut self, local: bool, cost: u64) {
        self.ll.record(local, cost);
    }

    /// Records an SC.
    pub fn record_sc(&mut self, local: bool, cost: u64) {
        self.sc.record(local, cost);
    }

    /// Records a CAS.
    pub fn record_cas(&mut self, local: bool, cost: u64) {
        self.cas.record(local, cost);
    }

    /// Records a multicast update sent.
    pub fn record_mupdate(&mut self, local: bool, cost: u64) {
        self.mupdate.record(local, cost);
    }

    /// Records a multicast (per-copy) invalidation sent.
    pub fn record_minval(&mut self, local: bool, cost: u64) {
        self.minval.record(local, cost);
    }

    /// Records a broadcast (counter-mode) invalidation sent.
    pub fn record_binval(&mut self, local: bool, cost: u64) {
        self.binval.record(local, cost);
    }

    /// Records a cleanup message received.
    pub fn record_cleanup(&mut self, local: bool, cost: u64) {
        self.cleanup.record(local, cost);
    }
}
