//! Orchestrator - the day loop
//!
//! See `engine.rs` for the phase order.

pub mod engine;
pub mod summary;

pub use engine::{Simulation, SimulationError};
pub use summary::DaySummary;
