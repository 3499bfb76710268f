//! Working day: gathering the resource with the best utility per minute
//!
//! # Critical Invariants
//!
//! - Work never starts past the day length; overtime carried in from
//!   building devices is paid back first
//! - Holdings only grow during work, one unit at a time

use crate::config::SimulationConfig;
use crate::core::Environment;
use crate::models::Agent;
use crate::rng::RngManager;

impl Agent {
    /// Utility per minute of gathering `resource` with the best device held
    fn value_per_effort(&self, env: Environment<'_>, resource: usize) -> f64 {
        if !env.in_simulation(resource) {
            return 0.0;
        }
        let speedup = self
            .best_device(resource)
            .map_or(1.0, |kind| env.devices.factor(kind, resource));
        self.util_per_effort(resource) * speedup
    }

    /// Spend the rest of the day gathering
    ///
    /// Each step gathers one unit of a resource whose utility per minute is
    /// within `production_epsilon` of the best, chosen at random. Device
    /// minutes are spent as they assist.
    pub fn work_day(&mut self, env: Environment<'_>, rng: &mut RngManager) {
        let config = env.config;
        let day_length = env.day_length();
        let n = self.num_resources();

        let mut values: Vec<f64> = (0..n).map(|r| self.value_per_effort(env, r)).collect();
        for r in 0..n {
            self.stats.before_work_held[r] = self.resources[r].held;
            self.stats.before_work_utility[r] = self.util(r);
        }

        let mut time = self.overtime;
        if time >= day_length {
            // The whole day went into building devices
            self.end_day_gpm = self.util_gain_through_dev_sold_today / time;
            self.overtime -= day_length;
        } else {
            self.overtime = 0.0;
        }

        while time < day_length {
            let best = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let candidates: Vec<usize> = (0..n)
                .filter(|&r| env.in_simulation(r) && values[r] >= best - config.production_epsilon)
                .collect();
            let Some(r) = rng.choice(&candidates) else {
                break;
            };

            let effort = self.effort(r);
            match self.best_device(r) {
                Some(kind) => {
                    let factor = env.devices.factor(kind, r);
                    let minutes = effort / factor;
                    self.device_mut(kind, r).use_minutes(minutes);
                    self.resources[r].experience += 1.0 / factor;
                    self.stats.units_gathered_with_device[kind.index()][r] += 1;
                    self.stats.time_gathering_with_device[kind.index()] += minutes;
                    self.stats.device_minutes_used_total[kind.index()][r] += minutes;
                    time += minutes;
                }
                None => {
                    self.resources[r].experience += 1.0;
                    self.stats.time_gathering_without_device += effort;
                    time += effort;
                }
            }
            self.resources[r].held += 1;
            self.resources[r].idle = false;
            self.stats.units_gathered_today[r] += 1;

            self.end_day_gpm = values[r];
            values[r] = self.value_per_effort(env, r);
        }

        self.work_day_end(config);
    }

    /// Experience bookkeeping once work is over
    pub fn work_day_end(&mut self, config: &SimulationConfig) {
        for state in &mut self.resources {
            if state.idle {
                state.experience = (state.experience - config.daily_exp_penalty).max(0.0);
            }
            state.idle = true;
            state.experience = state.experience.min(config.max_res_experience);
        }
        for r in 0..self.num_resources() {
            self.stats.gathered_end_work[r] = self.stats.units_gathered_today[r];
            self.stats.bought_end_work[r] = self.stats.bought_end_day[r];
            self.stats.sold_end_work[r] = self.stats.sold_end_day[r];
        }
    }
}
