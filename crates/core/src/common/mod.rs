//! Common types shared across the coherence engine.
//!
//! This module defines the foundational vocabulary used everywhere else in
//! the crate. It provides:
//! 1. **Addressing:** `LineAddr` decomposition into tag/set/word/byte-offset.
//! 2. **Errors:** The `McError` type for recoverable, observable failures.
//! 3. **Packets:** Flit-level shapes for the three external networks (§6).

/// Physical address decomposition (tag/set/word/byte-offset) and line indices.
pub mod addr;
/// Recoverable error conditions surfaced to requesters (§7).
pub mod error;
/// Direct-network, coherence-network, and XRAM packet/flit shapes (§6).
pub mod packet;
