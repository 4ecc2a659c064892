//! Directory-based cache-coherence engine library.
//!
//! This crate implements the core of an L2 memory-cache coherence
//! controller for a tiled many-core system, with the following:
//! 1. **Directory:** set-associative tag/state array plus backing line
//!    data (§4.2), pseudo-LRU eviction, and the sharer heap (§4.3).
//! 2. **Tracking tables:** Transaction, Update, and Invalidate tables
//!    (§4.4) coordinating in-flight XRAM transfers, multi-updates, and
//!    invalidations.
//! 3. **Reservation table:** global LL/SC reservation tracking (§4.5).
//! 4. **Controller:** the FSM mesh (§4.1) — command intake, READ/WRITE/CAS
//!    workers, the XRAM-response installer, CLEANUP/MULTI-ACK, and the
//!    CONFIG maintenance FSM — collapsed into synchronous method calls on
//!    one [`Controller`] (see `controller` module docs for the rationale).
//! 5. **Configuration:** hierarchical `Config` deserializable from JSON.

/// Common types shared across the engine: addressing, errors, packets (§6).
pub mod common;
/// Configuration: topology, table sizes, heap, reservation, FIFOs, CAS
/// throttle, segment layout.
pub mod config;
/// The coherence controller: the FSM mesh of §4.1.
pub mod controller;
/// Directory and backing line-data arrays (§4.2, §3).
pub mod directory;
/// Sharer heap: arena-and-index additional-sharer linked lists (§4.3).
pub mod heap;
/// Global LL/SC reservation table (§4.5).
pub mod reservation;
/// Observable counters (§6.5).
pub mod stats;
/// Tracking tables: Transaction, Update, and Invalidate tables (§4.4).
pub mod tables;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// The coherence controller; owns every shared table and both external
/// ports.
pub use crate::controller::Controller;
