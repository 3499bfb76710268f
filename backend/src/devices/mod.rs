//! Device kinds, discovered definitions and device valuation

pub mod kind;
pub mod table;
pub mod valuation;

pub use kind::{DeviceKind, NUM_DEVICE_KINDS};
pub use table::{agents_known, DeviceDefinition, DeviceTable};
pub use valuation::{ValuationCache, WorstCase};
