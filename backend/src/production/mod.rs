//! Production: gathering resources, committing to and building devices,
//! inventing new devices and the nightly upkeep
//!
//! # Daily Flow
//!
//! ```text
//! trade devices ──▶ build committed devices ──▶ work ──▶ invent ──▶ upkeep ──▶ decay
//!   (commit)          (overtime accrues)        (gather)
//! ```
//!
//! Everything except invention is a method on [`Agent`](crate::Agent);
//! invention touches the shared device table and every agent's experience,
//! so it is a free function over the whole population.

pub mod commitments;
pub mod invention;
pub mod manufacture;
pub mod upkeep;
pub mod work;

pub use commitments::DeviceChoice;
pub use invention::{device_invention, tool_invention, Invention};
