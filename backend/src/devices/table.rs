//! Discovered device definitions
//!
//! One slot per (kind, resource). A slot is empty until some agent invents
//! that device; re-invention replaces the slot's value once nobody knows
//! the old device any more.
//!
//! # Critical Invariants
//!
//! - At most one definition per (kind, resource)
//! - A definition's target resource is never one of its components

use super::kind::{DeviceKind, NUM_DEVICE_KINDS};
use crate::config::DeviceTierConfig;
use crate::models::Agent;
use serde::{Deserialize, Serialize};

/// Immutable structure of one invented device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDefinition {
    pub kind: DeviceKind,
    /// Resource the device extracts, or whose devices it helps build
    pub target: usize,
    /// Resource ids of the components, ascending
    ///
    /// For a Tool these are raw resources; for every other kind they index
    /// devices of `kind.component_kind()`.
    pub components: Vec<usize>,
    pub factor: f64,
    pub lifetime: f64,
    /// Raw resources consumed by one unit when no component is held
    pub necessary_resources: Vec<i64>,
}

impl DeviceDefinition {
    pub fn component_kind(&self) -> Option<DeviceKind> {
        self.kind.component_kind()
    }
}

/// Table of every discovered device, indexed by kind and resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceTable {
    num_resources: usize,
    slots: Vec<Option<DeviceDefinition>>,
}

impl DeviceTable {
    pub fn new(num_resources: usize) -> Self {
        Self {
            num_resources,
            slots: vec![None; NUM_DEVICE_KINDS * num_resources],
        }
    }

    pub fn num_resources(&self) -> usize {
        self.num_resources
    }

    fn slot(&self, kind: DeviceKind, resource: usize) -> usize {
        kind.index() * self.num_resources + resource
    }

    pub fn get(&self, kind: DeviceKind, resource: usize) -> Option<&DeviceDefinition> {
        if resource >= self.num_resources {
            return None;
        }
        self.slots[self.slot(kind, resource)].as_ref()
    }

    pub fn contains(&self, kind: DeviceKind, resource: usize) -> bool {
        self.get(kind, resource).is_some()
    }

    /// Speed multiplier of a device, 1.0 when it has not been invented
    pub fn factor(&self, kind: DeviceKind, resource: usize) -> f64 {
        self.get(kind, resource).map_or(1.0, |def| def.factor)
    }

    /// Store a new definition, returning the one it replaces
    ///
    /// Components are sorted. `necessary_resources` is derived from the
    /// component definitions already in the table.
    pub fn define(
        &mut self,
        kind: DeviceKind,
        target: usize,
        mut components: Vec<usize>,
        tier: DeviceTierConfig,
    ) -> Option<DeviceDefinition> {
        debug_assert!(target < self.num_resources);
        debug_assert!(!components.contains(&target), "device target among its components");
        components.sort_unstable();

        let mut necessary_resources = vec![0; self.num_resources];
        match kind.component_kind() {
            None => {
                for &c in &components {
                    necessary_resources[c] += 1;
                }
            }
            Some(comp_kind) => {
                for &c in &components {
                    if let Some(comp) = self.get(comp_kind, c) {
                        for (total, need) in necessary_resources.iter_mut().zip(&comp.necessary_resources) {
                            *total += need;
                        }
                    }
                }
            }
        }

        let definition = DeviceDefinition {
            kind,
            target,
            components,
            factor: tier.factor,
            lifetime: tier.lifetime,
            necessary_resources,
        };
        let idx = self.slot(kind, target);
        self.slots[idx].replace(definition)
    }

    /// Every definition of one kind, by ascending target
    pub fn definitions(&self, kind: DeviceKind) -> impl Iterator<Item = &DeviceDefinition> + '_ {
        let start = kind.index() * self.num_resources;
        self.slots[start..start + self.num_resources]
            .iter()
            .filter_map(Option::as_ref)
    }

    /// Number of defined slots of one kind
    pub fn defined_count(&self, kind: DeviceKind) -> usize {
        self.definitions(kind).count()
    }

    /// Whether a device exists and at least one agent can build it
    pub fn is_known(&self, agents: &[Agent], kind: DeviceKind, resource: usize) -> bool {
        self.contains(kind, resource) && agents_known(agents, kind, resource) > 0
    }

    /// Whether any device of `kind` is known by anyone
    pub fn any_known(&self, agents: &[Agent], kind: DeviceKind) -> bool {
        (0..self.num_resources).any(|r| self.is_known(agents, kind, r))
    }
}

/// Number of agents with any experience in a device
pub fn agents_known(agents: &[Agent], kind: DeviceKind, resource: usize) -> usize {
    agents
        .iter()
        .filter(|agent| agent.device_experience(kind, resource) > 0.0)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(factor: f64, lifetime: f64) -> DeviceTierConfig {
        DeviceTierConfig { factor, lifetime }
    }

    #[test]
    fn test_tool_needs_one_of_each_component() {
        let mut table = DeviceTable::new(4);
        table.define(DeviceKind::Tool, 0, vec![3, 1], tier(3.0, 150.0));

        let tool = table.get(DeviceKind::Tool, 0).unwrap();
        assert_eq!(tool.components, vec![1, 3]);
        assert_eq!(tool.necessary_resources, vec![0, 1, 0, 1]);
        assert_eq!(table.factor(DeviceKind::Tool, 0), 3.0);
        assert_eq!(table.factor(DeviceKind::Tool, 1), 1.0);
    }

    #[test]
    fn test_machine_sums_tool_requirements() {
        let mut table = DeviceTable::new(4);
        table.define(DeviceKind::Tool, 0, vec![1, 2], tier(3.0, 150.0));
        table.define(DeviceKind::Tool, 1, vec![2, 3], tier(3.0, 150.0));
        table.define(DeviceKind::Machine, 2, vec![0, 1], tier(9.0, 300.0));

        let machine = table.get(DeviceKind::Machine, 2).unwrap();
        assert_eq!(machine.necessary_resources, vec![0, 1, 2, 1]);
        assert_eq!(table.defined_count(DeviceKind::Machine), 1);
    }

    #[test]
    fn test_redefinition_returns_previous() {
        let mut table = DeviceTable::new(3);
        assert!(table.define(DeviceKind::Tool, 0, vec![1], tier(3.0, 150.0)).is_none());
        let old = table.define(DeviceKind::Tool, 0, vec![2], tier(3.0, 150.0));
        assert_eq!(old.unwrap().components, vec![1]);
        assert_eq!(table.defined_count(DeviceKind::Tool), 1);
    }
}
