//! Shared test infrastructure: mock implementations of the controller's
//! two external port traits (§6.3, §6.4).

/// Mock `XramPort`/`CoherencePort` implementations built with `mockall`.
pub mod mocks;
