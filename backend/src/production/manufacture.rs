//! Building the devices committed during trading

use crate::core::Environment;
use crate::devices::DeviceKind;
use crate::models::Agent;

impl Agent {
    /// Build one committed device
    ///
    /// The build time goes into overtime and is paid back at the start of
    /// the next work day. Components reserved for the device are consumed.
    pub fn make_device(&mut self, env: Environment<'_>, kind: DeviceKind, resource: usize) {
        let Some(def) = env.devices.get(kind, resource) else {
            return;
        };

        let effort = self.device_effort(kind, resource);
        let minutes = match self.best_dev_device(kind, resource) {
            Some(dev) => {
                let factor = env.devices.factor(dev, resource);
                let minutes = effort / factor;
                self.device_mut(dev, resource).use_minutes(minutes);
                self.device_mut(kind, resource).experience += kind.experience_for_making() / factor;
                self.stats.devices_made_with_dev_device[dev.index()][resource] += 1;
                self.stats.device_minutes_used_total[dev.index()][resource] += minutes;
                minutes
            }
            None => {
                self.device_mut(kind, resource).experience += kind.experience_for_making();
                effort
            }
        };
        self.overtime += minutes;
        self.device_mut(kind, resource).idle = false;

        match def.component_kind() {
            None => {
                for &c in &def.components {
                    self.resources[c].set_aside -= 1;
                }
            }
            Some(comp_kind) => {
                for &c in &def.components {
                    let comp = self.device_mut(comp_kind, c);
                    if comp.set_aside > 0 {
                        comp.set_aside -= 1;
                    }
                }
            }
        }

        self.device_mut(kind, resource).record_made();
        self.stats.devices_made_total[kind.index()][resource] += 1;
        self.stats.devices_made_today[kind.index()][resource] += 1;
        self.stats.time_making_devices[kind.index()] += minutes;
    }

    /// Build everything committed, lower tiers first
    pub fn device_production(&mut self, env: Environment<'_>) {
        for kind in DeviceKind::ALL {
            for r in 0..self.num_resources() {
                self.device_mut(kind, r).start_production_day();
            }
        }
        for kind in DeviceKind::PRODUCTION_ORDER {
            for r in 0..self.num_resources() {
                for _ in 0..self.device(kind, r).to_make {
                    self.make_device(env, kind, r);
                }
                self.device_mut(kind, r).to_make = 0;
            }
        }
    }
}
