//! Committing to devices: setting components aside, taking them back, and
//! choosing devices to build for oneself
//!
//! A committed device is paid for immediately (components leave the
//! holdings, the build time is booked) and built during the next
//! production phase. Buying a device that was already committed returns
//! the commitment instead of adding to the holdings.
//!
//! # Critical Invariants
//!
//! - `set_aside_components` followed by `get_back_components` restores
//!   holdings, set-asides, `to_make` and `set_aside_time`
//! - A device is only committed when its worst case fits in the day and
//!   the agent holds the raw resources it needs

use crate::core::select::argmax;
use crate::core::Environment;
use crate::devices::DeviceKind;
use crate::models::Agent;

/// Device an agent would gain the most from building for itself
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceChoice {
    pub resource: usize,
    /// Lifetime gain
    pub benefit: f64,
    /// Cost of building it
    pub cost: f64,
}

impl DeviceChoice {
    pub fn net_gain(&self) -> f64 {
        self.benefit - self.cost
    }
}

impl Agent {
    /// Reserve components and build time for one `kind` device
    ///
    /// Components held as devices are reserved whole; missing ones are
    /// committed recursively.
    pub fn set_aside_components(&mut self, env: Environment<'_>, kind: DeviceKind, resource: usize) {
        let Some(def) = env.devices.get(kind, resource) else {
            return;
        };
        self.set_aside_time += self.build_minutes(env, kind, resource);
        self.device_mut(kind, resource).to_make += 1;

        match def.component_kind() {
            None => {
                for &c in &def.components {
                    let state = &mut self.resources[c];
                    state.held -= 1;
                    state.set_aside += 1;
                    debug_assert!(state.held >= 0, "set aside more than held");
                }
            }
            Some(comp_kind) => {
                for &c in &def.components {
                    let Some(comp) = env.devices.get(comp_kind, c) else {
                        continue;
                    };
                    let lifetime = comp.lifetime;
                    let device = self.device_mut(comp_kind, c);
                    if device.held >= lifetime {
                        device.held -= lifetime;
                        device.set_aside += 1;
                    } else {
                        self.set_aside_components(env, comp_kind, c);
                    }
                }
            }
        }
    }

    /// Undo one `set_aside_components` of the same device
    pub fn get_back_components(&mut self, env: Environment<'_>, kind: DeviceKind, resource: usize) {
        let Some(def) = env.devices.get(kind, resource) else {
            return;
        };
        self.set_aside_time -= self.build_minutes(env, kind, resource);
        self.device_mut(kind, resource).to_make -= 1;

        match def.component_kind() {
            None => {
                for &c in &def.components {
                    let state = &mut self.resources[c];
                    state.held += 1;
                    state.set_aside -= 1;
                }
            }
            Some(comp_kind) => {
                for &c in &def.components {
                    let Some(comp) = env.devices.get(comp_kind, c) else {
                        continue;
                    };
                    let lifetime = comp.lifetime;
                    let device = self.device_mut(comp_kind, c);
                    if device.set_aside > 0 {
                        device.held += lifetime;
                        device.set_aside -= 1;
                    } else if device.to_make > 0 {
                        self.get_back_components(env, comp_kind, c);
                    }
                }
            }
        }
    }

    /// Receive one device bought from another agent
    pub fn buys_device(&mut self, env: Environment<'_>, kind: DeviceKind, resource: usize) {
        self.reset_valuations();
        let floor = env.config.min_held_device_experience;
        let device = self.device_mut(kind, resource);
        if device.experience < floor {
            device.experience = floor;
        }
        self.update_component_experience(env.devices);

        if self.device(kind, resource).to_make > 0 {
            self.get_back_components(env, kind, resource);
        } else if let Some(def) = env.devices.get(kind, resource) {
            self.device_mut(kind, resource).held += def.lifetime;
        }
    }

    /// Hand over one device, committing to build it if none is held
    pub fn sells_device(&mut self, env: Environment<'_>, kind: DeviceKind, resource: usize) {
        self.reset_valuations();
        let Some(def) = env.devices.get(kind, resource) else {
            return;
        };
        if self.device(kind, resource).held < def.lifetime {
            self.set_aside_components(env, kind, resource);
        } else {
            self.device_mut(kind, resource).held -= def.lifetime;
        }
    }

    /// Device of `kind` with the highest positive net gain that the agent
    /// can build tonight
    pub fn best_personal_device(&mut self, env: Environment<'_>, kind: DeviceKind) -> Option<DeviceChoice> {
        self.reset_valuations();
        let limit = env.config.device_hold_limit();
        let day_length = env.day_length();

        let mut choices: Vec<Option<DeviceChoice>> = vec![None; self.num_resources()];
        for (r, choice) in choices.iter_mut().enumerate() {
            if self.device_experience(kind, r) < 1.0 || !env.devices.contains(kind, r) {
                continue;
            }
            let Some(worst) = self.worst_case_construction(env, kind, r) else {
                continue;
            };
            if self.holds_bundle(&worst.resources)
                && self.set_aside_time + worst.minutes < day_length
                && self.device_currently_held_for_resource(env.devices, kind, r) < limit
            {
                *choice = Some(DeviceChoice {
                    resource: r,
                    benefit: self.device_gain(env, kind, r),
                    cost: self.device_cost(env, kind, r),
                });
            }
        }

        let gains: Vec<f64> = choices
            .iter()
            .map(|c| c.map_or(0.0, |c| c.net_gain()))
            .collect();
        let best = argmax(&gains)?;
        if gains[best] > 0.0 {
            choices[best]
        } else {
            None
        }
    }

    /// Commit to building every `kind` device worth more than it costs
    ///
    /// Returns the number of devices committed.
    pub fn personal_devices(&mut self, env: Environment<'_>, kind: DeviceKind) -> usize {
        let mut committed = 0;
        while let Some(choice) = self.best_personal_device(env, kind) {
            let r = choice.resource;
            let Some(lifetime) = env.devices.get(kind, r).map(|def| def.lifetime) else {
                break;
            };

            self.device_mut(kind, r).remember_price(-choice.cost);
            let payment = choice.cost - self.expected_construction_time(env, kind, r) * self.end_day_gpm;
            self.util_gain_through_dev_sold_today += choice.benefit - payment;

            self.set_aside_components(env, kind, r);
            self.device_mut(kind, r).held += lifetime;
            committed += 1;
        }
        committed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DeviceTierConfig, SimulationConfig};
    use crate::devices::DeviceTable;
    use crate::models::ResourceRegistry;

    #[test]
    fn test_set_aside_then_get_back_restores_state() {
        let config = SimulationConfig {
            num_resources: 4,
            num_agents: 2,
            ..SimulationConfig::default()
        };
        let mut table = DeviceTable::new(4);
        let tier = DeviceTierConfig { factor: 3.0, lifetime: 150.0 };
        table.define(DeviceKind::Tool, 0, vec![2, 3], tier);
        table.define(DeviceKind::Tool, 1, vec![2, 3], tier);
        table.define(DeviceKind::Machine, 2, vec![0, 1], DeviceTierConfig { factor: 9.0, lifetime: 300.0 });
        let registry = ResourceRegistry::new(4);
        let env = Environment::new(&config, &table, &registry);

        let params = config.agent_parameters().agents()[0].clone();
        let mut agent = Agent::new(0, params, 2, &config);
        agent.set_held(2, 4);
        agent.set_held(3, 4);
        agent.set_device_held(DeviceKind::Tool, 0, 200.0);

        agent.set_aside_components(env, DeviceKind::Machine, 2);
        assert_eq!(agent.device(DeviceKind::Machine, 2).to_make(), 1);
        assert_eq!(agent.device(DeviceKind::Tool, 0).set_aside(), 1);
        assert_eq!(agent.device(DeviceKind::Tool, 1).to_make(), 1);
        assert_eq!(agent.held(2), 3);
        assert!(agent.set_aside_time() > 0.0);

        agent.get_back_components(env, DeviceKind::Machine, 2);
        assert_eq!(agent.device(DeviceKind::Machine, 2).to_make(), 0);
        assert_eq!(agent.device(DeviceKind::Tool, 0).held(), 200.0);
        assert_eq!(agent.device(DeviceKind::Tool, 1).to_make(), 0);
        assert_eq!(agent.held(2), 4);
        assert_eq!(agent.resource(2).set_aside(), 0);
        assert!(agent.set_aside_time().abs() < 1e-9);
    }
}
