//! End-of-day experience checks and overnight decay
//!
//! # Critical Invariants
//!
//! - Device experience at or below 1 is forgotten entirely
//! - Held devices keep at least `min_held_device_experience`
//! - Decay never leaves negative holdings

use crate::core::Environment;
use crate::devices::DeviceKind;
use crate::models::Agent;
use crate::rng::RngManager;

impl Agent {
    /// Age device experience and prepare valuations for the next day
    pub fn end_day_checks(&mut self, env: Environment<'_>) {
        let min_held = env.config.min_held_device_experience;
        for row in &mut self.devices {
            for device in row.iter_mut() {
                if device.idle {
                    device.experience -= 1.0;
                }
                if device.experience <= 1.0 {
                    device.experience = 0.0;
                } else if device.experience > device.max_experience {
                    device.experience = device.max_experience;
                }
                if device.experience < min_held && device.held > 0.0 {
                    device.experience = min_held;
                }
                device.idle = true;
            }
        }

        self.refresh_end_day_utilities();
        self.set_aside_time = self.overtime;
        self.reset_valuations();
        self.update_component_experience(env.devices);
    }

    /// Overnight loss of resources and device minutes
    ///
    /// Each held unit of a resource perishes with probability
    /// `1 / lifetime`. Devices lose `daily_device_decay` of their
    /// lifetime's worth, scaled by how much is held.
    pub fn decay(&mut self, env: Environment<'_>, rng: &mut RngManager) {
        for state in &mut self.resources {
            if state.held > 0 && state.lifetime > 0.0 {
                let lost = rng.binomial(state.held as u64, 1.0 / state.lifetime);
                state.held -= lost as i64;
            }
        }

        let decay = env.config.daily_device_decay;
        for kind in DeviceKind::ALL {
            for r in 0..self.num_resources() {
                let lifetime = env.devices.get(kind, r).map(|def| def.lifetime);
                let device = self.device_mut(kind, r);
                let before = device.held;
                if before <= 0.0 {
                    continue;
                }
                device.held = match lifetime {
                    Some(lifetime) if before > decay => before - decay * (before / lifetime),
                    _ => 0.0,
                };
                self.stats.device_minutes_decayed_total[kind.index()][r] += before - self.device(kind, r).held;
            }
        }
        self.reset_valuations();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DeviceTierConfig, SimulationConfig};
    use crate::devices::DeviceTable;
    use crate::models::ResourceRegistry;

    #[test]
    fn test_idle_device_experience_fades() {
        let config = SimulationConfig {
            num_resources: 3,
            num_agents: 1,
            ..SimulationConfig::default()
        };
        let table = DeviceTable::new(3);
        let registry = ResourceRegistry::new(3);
        let env = Environment::new(&config, &table, &registry);
        let params = config.agent_parameters().agents()[0].clone();
        let mut agent = Agent::new(0, params, 1, &config);

        agent.set_device_experience(DeviceKind::Tool, 0, 2.0);
        agent.set_device_experience(DeviceKind::Tool, 1, 5.0);
        agent.end_day_checks(env);

        assert_eq!(agent.device_experience(DeviceKind::Tool, 0), 0.0);
        assert_eq!(agent.device_experience(DeviceKind::Tool, 1), 4.0);
    }

    #[test]
    fn test_device_decay_proportional_to_holdings() {
        let config = SimulationConfig {
            num_resources: 3,
            num_agents: 1,
            daily_device_decay: 15.0,
            ..SimulationConfig::default()
        };
        let mut table = DeviceTable::new(3);
        table.define(DeviceKind::Tool, 0, vec![1, 2], DeviceTierConfig { factor: 3.0, lifetime: 150.0 });
        let registry = ResourceRegistry::new(3);
        let env = Environment::new(&config, &table, &registry);
        let params = config.agent_parameters().agents()[0].clone();
        let mut agent = Agent::new(0, params, 1, &config);
        let mut rng = RngManager::new(1);

        agent.set_device_held(DeviceKind::Tool, 0, 300.0);
        agent.set_device_held(DeviceKind::Tool, 1, 10.0);
        agent.decay(env, &mut rng);

        assert!((agent.device_held(DeviceKind::Tool, 0) - 270.0).abs() < 1e-9);
        assert_eq!(agent.device_held(DeviceKind::Tool, 1), 0.0);
    }
}
