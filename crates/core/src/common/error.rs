//! Recoverable error conditions surfaced to requesters.
//!
//! This module defines the error taxonomy of §7. Table-full conditions are
//! deliberately absent here: per the spec they are not errors, they are
//! release-and-retry control flow (see [`crate::controller::allocator`]).
//! Malformed commands are not represented either — they are fatal assertion
//! failures in the requester's favor, not values a caller can recover from.

use std::fmt;

use super::addr::Addr;

/// A recoverable error surfaced to a requester or the interrupt subsystem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum McError {
    /// The address did not match any declared segment.
    ///
    /// The intake FSM consumes the packet fully, then this error drives a
    /// single-flit error response (§7).
    SegmentationViolation(Addr),

    /// XRAM reported an error completing a GET.
    ///
    /// Carries the line address and, when the miss originated from a
    /// processor read (`proc_read`), `None` means the origin was a
    /// write-miss and no response is owed to a processor — the controller
    /// instead latches an interrupt (§7).
    XramReadError {
        /// The line address that failed to read from XRAM.
        addr: Addr,
        /// The requesting SRCID, for the latched interrupt payload.
        srcid: u16,
    },
}

impl fmt::Display for McError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            McError::SegmentationViolation(addr) => {
                write!(f, "SegmentationViolation({:#x})", addr.val())
            }
            McError::XramReadError { addr, srcid } => {
                write!(f, "XramReadError(addr={:#x}, srcid={})", addr.val(), srcid)
            }
        }
    }
}

impl std::error::Error for McError {}
