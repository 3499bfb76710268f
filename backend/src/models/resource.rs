//! Which resources are still part of the simulation

use serde::{Deserialize, Serialize};

/// Active flag per resource
///
/// A removed resource is no longer worked, valued by extracting devices or
/// considered for invention. Agents may still hold and trade it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRegistry {
    in_simulation: Vec<bool>,
}

impl ResourceRegistry {
    pub fn new(num_resources: usize) -> Self {
        Self {
            in_simulation: vec![true; num_resources],
        }
    }

    pub fn len(&self) -> usize {
        self.in_simulation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_simulation.is_empty()
    }

    /// Out-of-range ids are reported as not in the simulation
    pub fn in_simulation(&self, resource: usize) -> bool {
        self.in_simulation.get(resource).copied().unwrap_or(false)
    }

    pub fn remove(&mut self, resource: usize) {
        if let Some(flag) = self.in_simulation.get_mut(resource) {
            *flag = false;
        }
    }

    /// Ids of resources still in the simulation, ascending
    pub fn active(&self) -> impl Iterator<Item = usize> + '_ {
        self.in_simulation
            .iter()
            .enumerate()
            .filter_map(|(r, &active)| active.then_some(r))
    }
}
