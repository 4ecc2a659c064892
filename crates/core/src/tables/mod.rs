//! Tracking tables (§4.4): the Transaction, Update, and Invalidate tables.
//!
//! All three share the same shape of lifecycle — `full()` to find a free
//! slot before allocating, `set(...)` to populate it, `clear(index)` to
//! release it — mirroring how the directory and reservation table expose
//! fixed-capacity slot arrays rather than growable collections, since every
//! table here backs a hardware-sized structure (§4.4's per-table size
//! configuration).

pub mod ivt;
pub mod trt;
pub mod upt;

pub use ivt::InvalidateTable;
pub use trt::TransactionTable;
pub use upt::UpdateTable;
