//! Societies Core - agent-based simulation of an emerging economy
//!
//! Agents gather resources, barter them, learn to invent tools and ever more
//! complex devices, and trade those devices for bundles of resources. The
//! engine runs deterministically from a seed.
//!
//! # Architecture
//!
//! - **config**: Global settings and per-agent parameter tables
//! - **core**: Day clock, shared environment view, selection helpers
//! - **models**: Agents, utility and effort curves, events, statistics
//! - **devices**: Device kinds, discovered definitions, valuation
//! - **production**: Work, device building, invention, nightly upkeep
//! - **market**: Resource barter and the device market
//! - **orchestrator**: The day loop
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. All randomness flows through one seeded RNG
//! 2. Trades only execute when both sides gain
//! 3. Trades never create or destroy resource units

// Module declarations
pub mod config;
pub mod core;
pub mod devices;
pub mod market;
pub mod models;
pub mod orchestrator;
pub mod production;
pub mod rng;

// Re-exports for convenience
pub use config::{ConfigError, SimulationConfig};
pub use core::{time::DayClock, Environment};
pub use devices::{DeviceDefinition, DeviceKind, DeviceTable};
pub use models::{Agent, AgentStats, Event, EventLog, ResourceRegistry};
pub use orchestrator::{DaySummary, Simulation, SimulationError};
pub use rng::RngManager;
