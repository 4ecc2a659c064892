//! Cache line address decomposition.
//!
//! This module defines strong types for raw physical addresses and cache
//! line indices to prevent accidentally mixing a byte address with a line
//! index. It provides:
//! 1. **Type safety:** `Addr` (byte address) vs `Nline` (tag || set).
//! 2. **Decomposition:** extracting set/tag/word/byte-offset per the
//!    `tag || set || word || byte-offset` layout of §3.
//! 3. **Topology:** the `Topology` struct carrying NWORDS/NSETS needed to
//!    decompose an address, since the split depends on configuration.

/// A raw physical byte address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Deserialize)]
pub struct Addr(pub u64);

/// A cache line index (`tag || set`), the unit of coherence granularity.
///
/// Two addresses with the same `Nline` name the same cache line; all
/// coherence operations (directory lookups, invalidations, updates) are
/// keyed on `Nline`, never on the raw byte address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Deserialize)]
pub struct Nline(pub u64);

impl Addr {
    /// Wraps a raw byte address.
    #[inline]
    #[must_use]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit value.
    #[inline]
    #[must_use]
    pub const fn val(self) -> u64 {
        self.0
    }

    /// Byte offset within the line's word (bits `[1:0]`, 32-bit words).
    #[inline]
    #[must_use]
    pub const fn byte_offset(self) -> u64 {
        self.0 & 0b11
    }
}

/// Cache topology parameters needed to decompose an `Addr` into
/// `tag || set || word || byte-offset`.
///
/// `nwords` and `nsets` must be powers of two (spec §3); this is enforced
/// by [`Topology::new`] rather than assumed by callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Topology {
    nwords: u32,
    nsets: u32,
    word_bits: u32,
    set_bits: u32,
}

impl Topology {
    /// Builds a topology from the number of words per line and sets per way.
    ///
    /// # Panics
    ///
    /// Panics if `nwords` or `nsets` is not a power of two, matching the
    /// spec's "NWORDS and NSETS are powers of two" invariant — a
    /// misconfigured topology is a construction-time bug, not a runtime
    /// condition.
    #[must_use]
    pub fn new(nwords: u32, nsets: u32) -> Self {
        assert!(nwords.is_power_of_two(), "NWORDS must be a power of two");
        assert!(nsets.is_power_of_two(), "NSETS must be a power of two");
        Self {
            nwords,
            nsets,
            word_bits: nwords.trailing_zeros(),
            set_bits: nsets.trailing_zeros(),
        }
    }

    /// Number of 32-bit words per cache line.
    #[inline]
    #[must_use]
    pub const fn nwords(self) -> u32 {
        self.nwords
    }

    /// Number of sets.
    #[inline]
    #[must_use]
    pub const fn nsets(self) -> u32 {
        self.nsets
    }

    /// Line size in bytes (`nwords * 4`).
    #[inline]
    #[must_use]
    pub const fn line_bytes(self) -> u64 {
        (self.nwords as u64) * 4
    }

    /// Extracts `(set, tag)` from a byte address.
    #[must_use]
    pub fn set_and_tag(self, addr: Addr) -> (usize, u64) {
        let shift = self.word_bits + 2;
        let set = (addr.0 >> shift) & (u64::from(self.nsets) - 1);
        let tag = addr.0 >> (shift + self.set_bits);
        (set as usize, tag)
    }

    /// The line index (`tag || set`) addressed by `addr`.
    #[must_use]
    pub fn nline(self, addr: Addr) -> Nline {
        let shift = self.word_bits + 2;
        Nline(addr.0 >> shift)
    }

    /// The base byte address of the line containing `addr`.
    #[must_use]
    pub fn line_base(self, addr: Addr) -> Addr {
        Addr(addr.0 & !(self.line_bytes() - 1))
    }

    /// The word index within a line (bits above the byte offset, below set/tag).
    #[must_use]
    pub fn word_index(self, addr: Addr) -> usize {
        ((addr.0 >> 2) & (u64::from(self.nwords) - 1)) as usize
    }

    /// Reconstructs the `nline` of a directory entry stored at `(set, tag)`.
    #[must_use]
    pub fn nline_of(self, set: usize, tag: u64) -> Nline {
        Nline((tag << self.set_bits) | set as u64)
    }

    /// The base byte address of the line named by `nline`.
    #[must_use]
    pub fn line_base_of(self, nline: Nline) -> Addr {
        Addr(nline.0 << (self.word_bits + 2))
    }

    /// The directory set a line index falls into.
    #[must_use]
    pub fn set_of(self, nline: Nline) -> usize {
        (nline.0 & (u64::from(self.nsets) - 1)) as usize
    }
}
