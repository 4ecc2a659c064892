//! Mocks of the controller's port traits.

/// Mocks `XramPort` and `CoherencePort` (§6.3, §6.4).
pub mod ports;
