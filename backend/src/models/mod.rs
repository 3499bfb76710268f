//! Domain models for the society simulation

pub mod agent;
pub mod curves;
pub mod event;
pub mod resource;
pub mod stats;

// Re-exports
pub use agent::{Agent, DeviceState, ResourceState};
pub use curves::{EffortCurve, UtilityCurve};
pub use event::{Event, EventLog};
pub use resource::ResourceRegistry;
pub use stats::{AgentStats, DeviceGrid};
