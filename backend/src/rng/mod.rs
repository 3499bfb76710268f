//! Deterministic random number generation
//!
//! Uses xorshift64* for fast, seeded random number generation.
//! CRITICAL: All randomness in the simulation MUST go through this module.

mod xorshift;

pub use xorshift::RngManager;
