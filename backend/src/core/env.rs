//! Read-only view of the shared world
//!
//! Agents value, build and trade devices against the same configuration,
//! device table and resource registry. Bundling the three references keeps
//! agent method signatures short while the simulation still owns each of
//! them as a separate field.

use crate::config::SimulationConfig;
use crate::devices::DeviceTable;
use crate::models::ResourceRegistry;

#[derive(Debug, Clone, Copy)]
pub struct Environment<'a> {
    pub config: &'a SimulationConfig,
    pub devices: &'a DeviceTable,
    pub resources: &'a ResourceRegistry,
}

impl<'a> Environment<'a> {
    pub fn new(
        config: &'a SimulationConfig,
        devices: &'a DeviceTable,
        resources: &'a ResourceRegistry,
    ) -> Self {
        Self {
            config,
            devices,
            resources,
        }
    }

    pub fn num_resources(&self) -> usize {
        self.config.num_resources
    }

    pub fn day_length(&self) -> f64 {
        f64::from(self.config.day_length)
    }

    pub fn in_simulation(&self, resource: usize) -> bool {
        self.resources.in_simulation(resource)
    }
}
