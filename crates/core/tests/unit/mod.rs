//! Unit tests for the coherence engine's components.

/// Controller (FSM mesh) end-to-end scenarios.
pub mod controller;
/// `proptest` property tests for the §8 LL/SC and CAS atomicity laws.
pub mod reservation;
