//! Flit-level packet shapes for the three external networks (§6).
//!
//! 1. **Direct network (§6.1):** processor commands and responses.
//! 2. **Coherence network (§6.4):** multicast/broadcast inval, multi-update,
//!    CLACK, cleanup, multi-ack.
//! 3. **XRAM network (§6.3):** GET/PUT requests and responses.

use super::addr::{Addr, Nline};

/// Fabric-unique identifier of a requesting agent (SRCID).
pub type SrcId = u16;

/// Per-requester transaction identifier (TRDID).
pub type TrdId = u16;

/// The low 3 bits of `pktid`: the operation type carried by a direct-network
/// command (§6.1's table).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize)]
pub enum OpType {
    /// `READ_DATA_UNC` — uncached data read.
    ReadDataUnc,
    /// `READ_DATA_MISS` — ordinary cached data read.
    ReadDataMiss,
    /// `READ_INS_UNC` — uncached instruction read.
    ReadInsUnc,
    /// `READ_INS_MISS` — ordinary cached instruction read.
    ReadInsMiss,
    /// `WRITE` — ordinary write burst.
    Write,
    /// `CAS` — compare-and-swap, 2 or 4 flits.
    Cas,
    /// `LL` — load-linked.
    Ll,
    /// `SC` — store-conditional.
    Sc,
}

impl OpType {
    /// Whether this op type is a read of any kind (ordinary, uncached, or LL).
    #[must_use]
    pub const fn is_read(self) -> bool {
        matches!(
            self,
            OpType::ReadDataUnc | OpType::ReadDataMiss | OpType::ReadInsUnc | OpType::ReadInsMiss
        )
    }

    /// Whether the requesting agent is an instruction cache (vs a data cache).
    #[must_use]
    pub const fn is_instruction_fetch(self) -> bool {
        matches!(self, OpType::ReadInsUnc | OpType::ReadInsMiss)
    }

    /// Whether this op type bypasses the directory (uncached).
    #[must_use]
    pub const fn is_uncached(self) -> bool {
        matches!(self, OpType::ReadDataUnc | OpType::ReadInsUnc)
    }
}

/// A command arriving on the direct request network (§6.1).
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct Command {
    /// Requesting agent.
    pub srcid: SrcId,
    /// Per-requester transaction id.
    pub trdid: TrdId,
    /// Packet id; low 3 bits carry the [`OpType`].
    pub pktid: u16,
    /// Target address.
    pub address: Addr,
    /// Payload length in bytes.
    pub plen: u32,
    /// Operation type, decoded from `pktid`.
    pub op: OpType,
    /// Write data flits (empty for reads).
    pub wdata: Vec<u64>,
    /// Byte-enable mask per write data flit.
    pub be: Vec<u8>,
    /// End-of-packet marker on the last flit.
    pub eop: bool,
}

/// A response sent back on the direct response network.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Response {
    /// Destination agent (mirrors the originating `srcid`).
    pub rsrcid: SrcId,
    /// Mirrors the originating `trdid`.
    pub rtrdid: TrdId,
    /// Mirrors the originating `pktid`.
    pub rpktid: u16,
    /// Response data flits.
    pub rdata: Vec<u64>,
    /// Error flag.
    pub rerror: bool,
    /// End-of-packet marker on the last flit.
    pub reop: bool,
}

/// An owner of a cache line: the requesting agent and whether it is an
/// instruction cache (§3's `owner = (srcid, is_instruction_cache)`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Owner {
    /// The owning agent's SRCID.
    pub srcid: SrcId,
    /// Whether the owner is an instruction cache (vs a data cache).
    pub is_instruction_cache: bool,
}

/// A cleanup message from an L1 cache announcing it is dropping a copy
/// (§6.4, 2 flits).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct Cleanup {
    /// The reporting agent.
    pub srcid: SrcId,
    /// Whether the reporting cache is an instruction cache.
    pub is_instruction_cache: bool,
    /// The directory way the line occupied at the reporting cache's MC.
    pub way: usize,
    /// The line index being dropped.
    pub nline: Nline,
}

/// A multi-ack message retiring one pending response in an UPT entry
/// (§6.4, 1 flit).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct MultiAck {
    /// Index into the Update Table being acknowledged.
    pub upt_index: usize,
}

/// A cleanup acknowledgement (CLACK) emitted after a cleanup has been
/// applied to the directory (§6.4, 1 flit, dedicated ack channel).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Clack {
    /// Destination agent.
    pub dest: SrcId,
    /// Directory set.
    pub set: usize,
    /// Directory way.
    pub way: usize,
    /// Whether the target is an instruction cache.
    pub is_instruction_cache: bool,
}

/// A multicast or broadcast invalidation sent on the coherence network
/// (§6.4, 2 flits).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalPacket {
    /// Destinations (empty + `broadcast = true` means "all caches").
    pub dests: Vec<SrcId>,
    /// Whether this is a broadcast invalidation.
    pub broadcast: bool,
    /// Index into the Invalidate Table tracking this transaction.
    pub ivt_index: usize,
    /// The line index being invalidated.
    pub nline: Nline,
    /// Whether the targets are instruction caches.
    pub is_instruction_cache: bool,
}

/// A multicast update sent on the coherence network (§6.4, >= 3 flits).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdatePacket {
    /// Destinations to update (never broadcast — updates are always
    /// per-copy, per §4.1.3).
    pub dests: Vec<SrcId>,
    /// Index into the Update Table tracking this transaction.
    pub upt_index: usize,
    /// The line index being updated.
    pub nline: Nline,
    /// First updated word index within the line.
    pub word_index: usize,
    /// Updated words and their byte-enables, in ascending word order.
    pub words: Vec<(u8, u32)>,
}

/// A request issued to XRAM (§6.3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum XramRequest {
    /// Fetch an entire line.
    Get {
        /// TRT index, carried as `trdid`.
        trdid: usize,
        /// Line base address.
        addr: Addr,
        /// Bytes to fetch (the line size).
        plen: u32,
    },
    /// Write back an entire line.
    Put {
        /// TRT index, carried as `trdid`.
        trdid: usize,
        /// Line base address.
        addr: Addr,
        /// Line data, in ascending word order.
        data: Vec<u32>,
    },
}

/// A response arriving from XRAM (§6.3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum XramResponse {
    /// Data for a prior GET; `data` spans the full line.
    GetData {
        /// TRT index this response completes.
        trdid: usize,
        /// Line data, in ascending word order.
        data: Vec<u32>,
        /// Set if any flit of the transaction reported an error.
        rerror: bool,
    },
    /// Acknowledgement of a prior PUT.
    PutAck {
        /// TRT index this response completes.
        trdid: usize,
        /// Set if the write-back failed.
        rerror: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_type_classification() {
        assert!(OpType::ReadDataMiss.is_read());
        assert!(!OpType::Write.is_read());
        assert!(OpType::ReadInsMiss.is_instruction_fetch());
        assert!(!OpType::ReadDataMiss.is_instruction_fetch());
        assert!(OpType::ReadDataUnc.is_uncached());
        assert!(!OpType::ReadDataMiss.is_uncached());
    }
}
