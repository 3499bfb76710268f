//! Device valuation
//!
//! An agent values a device three ways:
//!
//! - **cost**: utility it gives up to build one unit (its own time at its
//!   marginal rate plus the components consumed), or the average price it
//!   recently paid when it mostly buys the device
//! - **gain**: utility the device adds over its lifetime, by extracting
//!   more per minute or by building other devices faster
//! - **worst case**: minutes and raw resources needed to build one unit
//!   from scratch given the components already held
//!
//! Every figure is memoized per (kind, resource) until the agent's state
//! changes in a way that invalidates it; callers reset the cache whenever
//! holdings of devices, experience or the gain rate change.
//!
//! # Critical Invariants
//!
//! - A memoized value is identical to a fresh computation on the same state
//! - Undefined devices are never recursed into

use super::kind::DeviceKind;
use crate::core::Environment;
use crate::models::Agent;
use serde::{Deserialize, Serialize};

/// Minutes and resources needed to build one device from scratch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorstCase {
    pub minutes: f64,
    /// Raw resource units consumed, indexed by resource
    pub resources: Vec<i64>,
}

#[derive(Debug, Clone, Default)]
struct MemoEntry {
    cost: Option<f64>,
    gain: Option<f64>,
    /// `Some(None)` memoizes "cannot be built"
    worst_case: Option<Option<WorstCase>>,
}

/// Per-agent memo of device valuations, one entry per (kind, resource)
#[derive(Debug, Clone, Default)]
pub struct ValuationCache {
    num_resources: usize,
    entries: Vec<MemoEntry>,
}

impl ValuationCache {
    pub fn new(num_resources: usize) -> Self {
        Self {
            num_resources,
            entries: vec![MemoEntry::default(); super::NUM_DEVICE_KINDS * num_resources],
        }
    }

    pub fn clear(&mut self) {
        self.entries.fill(MemoEntry::default());
    }

    fn entry(&self, kind: DeviceKind, resource: usize) -> Option<&MemoEntry> {
        self.entries.get(kind.index() * self.num_resources + resource)
    }

    fn entry_mut(&mut self, kind: DeviceKind, resource: usize) -> Option<&mut MemoEntry> {
        self.entries.get_mut(kind.index() * self.num_resources + resource)
    }

    /// Number of entries holding at least one value
    pub fn filled(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.cost.is_some() || e.gain.is_some() || e.worst_case.is_some())
            .count()
    }
}

impl Agent {
    /// Minutes to build one `kind` for `resource`, helped by any held
    /// device-making device
    pub fn build_minutes(&self, env: Environment<'_>, kind: DeviceKind, resource: usize) -> f64 {
        let effort = self.device_effort(kind, resource);
        match self.best_dev_device(kind, resource) {
            Some(dev) => effort / env.devices.factor(dev, resource),
            None => effort,
        }
    }

    /// Average recent purchase price, when at least half of the remembered
    /// acquisitions were purchases
    pub fn can_buy(&self, kind: DeviceKind, resource: usize) -> Option<f64> {
        let prices = &self.device(kind, resource).prices;
        let (bought, paid) = prices
            .iter()
            .filter(|&&p| p > 0.0)
            .fold((0usize, 0.0), |(n, sum), &p| (n + 1, sum + p));
        if bought > 0 && bought >= prices.len() / 2 {
            Some(paid / bought as f64)
        } else {
            None
        }
    }

    /// Utility given up to obtain one unit of a device
    ///
    /// Returns 0 for a device that has not been invented.
    pub fn device_cost(&mut self, env: Environment<'_>, kind: DeviceKind, resource: usize) -> f64 {
        if let Some(cost) = self.memo.entry(kind, resource).and_then(|e| e.cost) {
            return cost;
        }

        let cost = match self.can_buy(kind, resource) {
            Some(price) => price,
            None => match env.devices.get(kind, resource) {
                None => 0.0,
                Some(def) => {
                    let mut cost = self.build_minutes(env, kind, resource) * self.end_day_gpm;
                    match def.component_kind() {
                        None => {
                            for &c in &def.components {
                                cost += self.temp_util(c, -1);
                            }
                        }
                        Some(comp_kind) => {
                            for &c in &def.components {
                                if env.devices.contains(comp_kind, c) {
                                    cost += self.device_cost(env, comp_kind, c);
                                }
                            }
                        }
                    }
                    cost
                }
            },
        };

        if let Some(entry) = self.memo.entry_mut(kind, resource) {
            entry.cost = Some(cost);
        }
        cost
    }

    /// Minutes spent building one unit and the components it lacks
    ///
    /// Devices the agent would buy instead count as no time.
    pub fn expected_construction_time(
        &self,
        env: Environment<'_>,
        kind: DeviceKind,
        resource: usize,
    ) -> f64 {
        if self.can_buy(kind, resource).is_some() {
            return 0.0;
        }
        let Some(def) = env.devices.get(kind, resource) else {
            return 0.0;
        };
        let mut minutes = self.build_minutes(env, kind, resource);
        if let Some(comp_kind) = def.component_kind() {
            for &c in &def.components {
                if env.devices.contains(comp_kind, c) {
                    minutes += self.expected_construction_time(env, comp_kind, c);
                }
            }
        }
        minutes
    }

    /// Time and raw resources to build one unit, counting held components
    ///
    /// `None` when the device or any needed component is undefined.
    pub fn worst_case_construction(
        &mut self,
        env: Environment<'_>,
        kind: DeviceKind,
        resource: usize,
    ) -> Option<WorstCase> {
        if let Some(cached) = self.memo.entry(kind, resource).and_then(|e| e.worst_case.clone()) {
            return cached;
        }
        let result = self.compute_worst_case(env, kind, resource);
        if let Some(entry) = self.memo.entry_mut(kind, resource) {
            entry.worst_case = Some(result.clone());
        }
        result
    }

    fn compute_worst_case(&self, env: Environment<'_>, kind: DeviceKind, resource: usize) -> Option<WorstCase> {
        let devices = env.devices;
        devices.get(kind, resource)?;
        let n = self.num_resources();

        let mut minutes = self.build_minutes(env, kind, resource);
        let mut needed = vec![0i64; n];
        needed[resource] = 1;
        let mut level = kind;

        while let Some(comp_kind) = level.component_kind() {
            let mut comp_needed = vec![0i64; n];
            for (r, &count) in needed.iter().enumerate().filter(|(_, &count)| count > 0) {
                for &c in &devices.get(level, r)?.components {
                    comp_needed[c] += count;
                }
            }

            for c in 0..n {
                if comp_needed[c] == 0 {
                    continue;
                }
                let comp = devices.get(comp_kind, c)?;
                let held_units = (self.device_held(comp_kind, c) / comp.lifetime).floor() as i64;
                comp_needed[c] = (comp_needed[c] - held_units).max(0);

                let speedup = match self.best_dev_device(comp_kind, c) {
                    Some(dev) => devices.factor(dev, c),
                    None => 1.0,
                };
                for i in 0..comp_needed[c] {
                    minutes += self.temp_device_effort(comp_kind, c, i as f64) / speedup;
                }
            }

            needed = comp_needed;
            level = comp_kind;
        }

        // `level` is now Tool: each needed tool consumes its raw components
        let mut resources = vec![0i64; n];
        for (r, &count) in needed.iter().enumerate().filter(|(_, &count)| count > 0) {
            let tool = devices.get(level, r)?;
            for (total, &need) in resources.iter_mut().zip(&tool.necessary_resources) {
                *total += count * need;
            }
        }

        Some(WorstCase { minutes, resources })
    }

    /// Utility one more unit of a device adds over its lifetime
    pub fn device_gain(&mut self, env: Environment<'_>, kind: DeviceKind, resource: usize) -> f64 {
        if kind.is_dev_device() {
            self.dev_device_gain(env, kind, resource)
        } else {
            self.extractor_gain(env, kind, resource)
        }
    }

    fn extractor_gain(&mut self, env: Environment<'_>, kind: DeviceKind, resource: usize) -> f64 {
        if self.device_held_for_res(env.devices, resource) > env.config.device_hold_limit()
            || !env.in_simulation(resource)
        {
            return 0.0;
        }
        if let Some(gain) = self.memo.entry(kind, resource).and_then(|e| e.gain) {
            return gain;
        }
        let Some(def) = env.devices.get(kind, resource) else {
            return 0.0;
        };

        // Held minutes are used best device first; the new unit comes last
        let mut segments: Vec<(f64, f64)> = DeviceKind::EXTRACTORS
            .iter()
            .rev()
            .take_while(|&&k| k != kind)
            .filter(|&&k| self.device_held(k, resource) > 0.0)
            .map(|&k| (self.device_held(k, resource), env.devices.factor(k, resource)))
            .collect();
        segments.push((self.device_held(kind, resource) + def.lifetime, def.factor));

        let total: f64 = segments.iter().map(|(minutes, _)| minutes).sum();
        let count_from = total - def.lifetime;

        let mut used = 0.0;
        let mut experience = 0.0;
        let mut units = 0i64;
        let mut gain = 0.0;
        let mut boundary = 0.0;
        let mut segment = segments.iter();
        let mut factor = 1.0;
        while used < total {
            while used >= boundary {
                match segment.next() {
                    Some(&(minutes, f)) => {
                        boundary += minutes;
                        factor = f;
                    }
                    None => break,
                }
            }
            // Only units made once earlier minutes are strictly used up
            if used > count_from {
                gain += self.temp_util(resource, units);
            }
            used += self.temp_effort(resource, experience) / factor;
            experience += 1.0 / factor;
            units += 1;
        }

        if let Some(entry) = self.memo.entry_mut(kind, resource) {
            entry.gain = Some(gain);
        }
        gain
    }

    /// Whether the agent builds enough devices to bother with a
    /// device-making device for them
    pub fn wants_dev_device(&self, env: Environment<'_>, kind: DeviceKind, resource: usize) -> bool {
        let (Some(can_make), Some(def)) = (kind.can_make(), env.devices.get(kind, resource)) else {
            return false;
        };
        let held = self.device_held(kind, resource);
        if held >= env.config.device_hold_limit() {
            return false;
        }
        let made: u32 = self.device(can_make, resource).recently_made.iter().sum();
        let units_held = (held / def.lifetime).floor();
        f64::from(made) > f64::from(env.config.min_device_for_dev_device_consideration) * (units_held + 1.0)
    }

    fn dev_device_gain(&mut self, env: Environment<'_>, kind: DeviceKind, resource: usize) -> f64 {
        if !env.in_simulation(resource) || !self.wants_dev_device(env, kind, resource) {
            return 0.0;
        }
        if let Some(gain) = self.memo.entry(kind, resource).and_then(|e| e.gain) {
            return gain;
        }
        let (Some(can_make), Some(def)) = (kind.can_make(), env.devices.get(kind, resource)) else {
            return 0.0;
        };
        let factor = def.factor;

        // Burn through the minutes already held
        let held = self.device_held(kind, resource);
        let mut experience = 0.0;
        let mut used = 0.0;
        while held - used > 0.0 {
            used += self.temp_device_effort(can_make, resource, experience) / factor;
            experience += can_make.experience_for_making() / factor;
        }
        let experience_after_held = experience;

        // Devices one more unit builds over its lifetime
        let mut made = 0u32;
        used = 0.0;
        while def.lifetime - used > 0.0 {
            used += self.temp_device_effort(can_make, resource, experience) / factor;
            experience += 1.0 / factor;
            made += 1;
        }

        // Minutes the same devices take by hand
        let mut by_hand = 0.0;
        experience = experience_after_held;
        for _ in 0..made {
            by_hand += self.temp_device_effort(can_make, resource, experience);
            experience += 1.0;
        }

        let gain = (by_hand - used) * self.end_day_gpm;
        if let Some(entry) = self.memo.entry_mut(kind, resource) {
            entry.gain = Some(gain);
        }
        gain
    }

    /// Least the agent accepts for selling one unit
    pub fn seller_device_value(&mut self, env: Environment<'_>, kind: DeviceKind, resource: usize) -> f64 {
        self.device_cost(env, kind, resource)
    }

    /// Most the agent pays for one unit
    ///
    /// The lifetime gain net of the time it would have gathered anyway,
    /// capped at the cost of building it when the agent knows how to.
    pub fn buyer_device_value(&mut self, env: Environment<'_>, kind: DeviceKind, resource: usize) -> f64 {
        let Some(def) = env.devices.get(kind, resource) else {
            return 0.0;
        };
        let value = self.device_gain(env, kind, resource) - self.end_day_gpm * def.lifetime;
        if value <= 0.0 {
            return 0.0;
        }
        if self.device_experience(kind, resource) >= 1.0 {
            value.min(self.device_cost(env, kind, resource))
        } else {
            value
        }
    }
}
