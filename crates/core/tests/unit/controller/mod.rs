//! Controller end-to-end scenarios (§8).

/// §7 malformed-command rejection, parametrized over the command table.
pub mod malformed;
/// Cold miss, LL/SC, multi-sharer write, counter-mode broadcast, CAS, cleanup.
pub mod scenarios;
