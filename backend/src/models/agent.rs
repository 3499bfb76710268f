//! Agent model
//!
//! An agent holds integer units of every resource and fractional minutes of
//! every device. It learns by doing, values trades with its own marginal
//! utility curves and remembers whom it traded devices with.
//!
//! Behaviour is split across modules as additional `impl Agent` blocks:
//! device valuation in `devices::valuation`, working and building in
//! `production`. This file owns the state and the pure lookups.
//!
//! # Critical Invariants
//!
//! - Resource experience stays in `[0, max_res_experience]` after the
//!   end-of-work update
//! - Device experience is 0 or above 1 after the end-of-day checks, and at
//!   least `min_held_device_experience` while the device is held
//! - A removed agent is reinitialized to its starting state and never acts
//!   again
//!
//! # Example
//!
//! ```
//! use societies_core::{Agent, SimulationConfig};
//!
//! let config = SimulationConfig::default();
//! let params = config.agent_parameters().agents()[0].clone();
//! let mut agent = Agent::new(0, params, config.num_agents, &config);
//!
//! agent.set_held(2, 3);
//! assert_eq!(agent.held(2), 3);
//! assert!(agent.util(2) < agent.temp_util(2, -1));
//! ```

use crate::config::{AgentParameters, SimulationConfig};
use crate::devices::{DeviceKind, DeviceTable, ValuationCache, NUM_DEVICE_KINDS};
use crate::models::curves::{EffortCurve, UtilityCurve};
use crate::models::stats::AgentStats;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

// ============================================================================
// Per-resource and per-device state
// ============================================================================

/// Everything an agent knows and holds about one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    pub(crate) utility: UtilityCurve,
    pub(crate) effort: EffortCurve,
    pub(crate) held: i64,
    /// Units gathered so far, reduced by the idle penalty
    pub(crate) experience: f64,
    /// Not gathered since the last end-of-work update
    pub(crate) idle: bool,
    /// Units reserved as components of devices still to be built
    pub(crate) set_aside: i64,
    /// Marginal utility of the next unit, refreshed after every trade
    pub(crate) end_day_utility: f64,
    /// Average days one unit survives decay
    pub(crate) lifetime: f64,
}

impl ResourceState {
    pub fn held(&self) -> i64 {
        self.held
    }

    pub fn experience(&self) -> f64 {
        self.experience
    }

    pub fn set_aside(&self) -> i64 {
        self.set_aside
    }

    pub fn end_day_utility(&self) -> f64 {
        self.end_day_utility
    }

    pub fn utility_curve(&self) -> &UtilityCurve {
        &self.utility
    }

    pub fn effort_curve(&self) -> &EffortCurve {
        &self.effort
    }
}

/// Everything an agent knows and holds about one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub(crate) experience: f64,
    pub(crate) max_experience: f64,
    pub(crate) effort: EffortCurve,
    /// Minutes of use left
    pub(crate) held: f64,
    pub(crate) idle: bool,
    /// Units committed for tonight's production
    pub(crate) to_make: i64,
    /// Units of this device reserved as components of higher devices
    pub(crate) set_aside: i64,
    /// Recent acquisition prices, newest first; positive = bought,
    /// negative = built or sold
    pub(crate) prices: VecDeque<f64>,
    /// Units built per recent day, today first
    pub(crate) recently_made: VecDeque<u32>,
}

impl DeviceState {
    fn new(effort: EffortCurve, max_experience: f64, config: &SimulationConfig) -> Self {
        Self {
            experience: 0.0,
            max_experience,
            effort,
            held: 0.0,
            idle: true,
            to_make: 0,
            set_aside: 0,
            prices: vec![0.0; config.device_trade_memory_length].into(),
            recently_made: vec![0; config.device_production_memory_length].into(),
        }
    }

    pub fn experience(&self) -> f64 {
        self.experience
    }

    pub fn held(&self) -> f64 {
        self.held
    }

    pub fn to_make(&self) -> i64 {
        self.to_make
    }

    pub fn set_aside(&self) -> i64 {
        self.set_aside
    }

    pub fn prices(&self) -> &VecDeque<f64> {
        &self.prices
    }

    pub fn recently_made(&self) -> &VecDeque<u32> {
        &self.recently_made
    }

    /// Push a price to the front of the fixed-length memory
    pub(crate) fn remember_price(&mut self, price: f64) {
        if self.prices.pop_back().is_some() {
            self.prices.push_front(price);
        }
    }

    /// Start a new production day in the fixed-length memory
    pub(crate) fn start_production_day(&mut self) {
        if self.recently_made.pop_back().is_some() {
            self.recently_made.push_front(0);
        }
    }

    pub(crate) fn record_made(&mut self) {
        if let Some(today) = self.recently_made.front_mut() {
            *today += 1;
        }
    }

    /// Spend `minutes` of device use, never below zero
    pub(crate) fn use_minutes(&mut self, minutes: f64) {
        self.held = (self.held - minutes).max(0.0);
    }
}

// ============================================================================
// Agent
// ============================================================================

/// One member of the society
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    id: usize,
    group: usize,
    res_trade_power: f64,
    device_trade_power: f64,
    invent_speed: f64,
    in_simulation: bool,
    /// Starting parameters, kept to reinitialize on removal
    params: AgentParameters,

    pub(crate) resources: Vec<ResourceState>,
    /// Indexed `[kind.index()][resource]`
    pub(crate) devices: Vec<Vec<DeviceState>>,
    #[serde(skip)]
    pub(crate) memo: ValuationCache,

    /// Surplus from past device trades, `[kind][partner]`, newest first
    pub(crate) trade_memory: Vec<Vec<VecDeque<f64>>>,
    /// Partners met in the current device-trading session
    pub(crate) traded_with: Vec<usize>,
    /// Devices bought in the current device-trading round
    pub(crate) bought_this_round: Vec<usize>,

    /// Minutes already committed beyond the start of the next work day
    pub(crate) overtime: f64,
    /// Minutes tonight's device building will take
    pub(crate) set_aside_time: f64,
    /// Utility per minute of the last unit gathered
    pub(crate) end_day_gpm: f64,
    pub(crate) util_gain_through_dev_sold_today: f64,

    pub(crate) stats: AgentStats,
}

impl Agent {
    /// Create an agent with no holdings and no experience
    ///
    /// # Arguments
    /// * `id` - position of the agent in the population
    /// * `params` - per-agent and per-resource parameters
    /// * `num_agents` - population size, for the device trade memory
    /// * `config` - global settings (utility floor, memory lengths)
    pub fn new(id: usize, params: AgentParameters, num_agents: usize, config: &SimulationConfig) -> Self {
        let resources: Vec<ResourceState> = params
            .resources
            .iter()
            .map(|row| ResourceState {
                utility: UtilityCurve::power_law(row.steepness, row.scaling, config.min_res_util),
                effort: EffortCurve::resource(row.min_res_effort, row.max_res_effort, row.max_res_experience),
                held: 0,
                experience: 0.0,
                idle: true,
                set_aside: 0,
                end_day_utility: 0.0,
                lifetime: row.lifetime,
            })
            .collect();

        let devices: Vec<Vec<DeviceState>> = (0..NUM_DEVICE_KINDS)
            .map(|_| {
                params
                    .resources
                    .iter()
                    .map(|row| {
                        DeviceState::new(
                            EffortCurve::device(row.min_device_effort, row.max_device_effort, row.max_device_experience),
                            row.max_device_experience,
                            config,
                        )
                    })
                    .collect()
            })
            .collect();

        let memory = vec![0.0; config.device_trade_memory_length];
        let trade_memory: Vec<Vec<VecDeque<f64>>> = (0..NUM_DEVICE_KINDS)
            .map(|_| (0..num_agents).map(|_| memory.iter().copied().collect()).collect())
            .collect();

        let num_resources = resources.len();
        let mut agent = Self {
            id,
            group: params.group,
            res_trade_power: params.res_trade_power,
            device_trade_power: params.device_trade_power,
            invent_speed: params.invent_speed,
            in_simulation: true,
            params,
            resources,
            devices,
            memo: ValuationCache::new(num_resources),
            trade_memory,
            traded_with: Vec::new(),
            bought_this_round: Vec::new(),
            overtime: 0.0,
            set_aside_time: 0.0,
            end_day_gpm: 0.0,
            util_gain_through_dev_sold_today: 0.0,
            stats: AgentStats::new(num_resources),
        };
        agent.refresh_end_day_utilities();
        agent
    }

    /// Take the agent out of the simulation
    ///
    /// Holdings, experience and memories return to their starting values.
    pub fn remove(&mut self, config: &SimulationConfig) {
        let num_agents = self.trade_memory.first().map_or(0, Vec::len);
        *self = Agent::new(self.id, self.params.clone(), num_agents, config);
        self.in_simulation = false;
    }

    // ========================================================================
    // Identity
    // ========================================================================

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn group(&self) -> usize {
        self.group
    }

    pub fn res_trade_power(&self) -> f64 {
        self.res_trade_power
    }

    pub fn device_trade_power(&self) -> f64 {
        self.device_trade_power
    }

    pub fn invent_speed(&self) -> f64 {
        self.invent_speed
    }

    pub fn is_active(&self) -> bool {
        self.in_simulation
    }

    pub fn num_resources(&self) -> usize {
        self.resources.len()
    }

    pub fn stats(&self) -> &AgentStats {
        &self.stats
    }

    pub fn overtime(&self) -> f64 {
        self.overtime
    }

    pub fn set_aside_time(&self) -> f64 {
        self.set_aside_time
    }

    pub fn end_day_gpm(&self) -> f64 {
        self.end_day_gpm
    }

    pub fn util_gain_through_dev_sold_today(&self) -> f64 {
        self.util_gain_through_dev_sold_today
    }

    pub fn traded_with(&self) -> &[usize] {
        &self.traded_with
    }

    // ========================================================================
    // Holdings
    // ========================================================================

    pub fn resource(&self, resource: usize) -> &ResourceState {
        &self.resources[resource]
    }

    pub fn device(&self, kind: DeviceKind, resource: usize) -> &DeviceState {
        &self.devices[kind.index()][resource]
    }

    pub(crate) fn device_mut(&mut self, kind: DeviceKind, resource: usize) -> &mut DeviceState {
        &mut self.devices[kind.index()][resource]
    }

    pub fn held(&self, resource: usize) -> i64 {
        self.resources[resource].held
    }

    pub fn experience(&self, resource: usize) -> f64 {
        self.resources[resource].experience
    }

    pub fn device_experience(&self, kind: DeviceKind, resource: usize) -> f64 {
        self.devices[kind.index()]
            .get(resource)
            .map_or(0.0, |d| d.experience)
    }

    pub fn device_held(&self, kind: DeviceKind, resource: usize) -> f64 {
        self.devices[kind.index()][resource].held
    }

    /// Units the agent owns, including those set aside for building
    pub fn total_units(&self, resource: usize) -> i64 {
        let state = &self.resources[resource];
        state.held + state.set_aside
    }

    // Scenario setup. Every setter drops cached valuations.

    pub fn set_held(&mut self, resource: usize, units: i64) {
        self.resources[resource].held = units;
        self.refresh_end_day_utility(resource);
        self.reset_valuations();
    }

    pub fn set_experience(&mut self, resource: usize, experience: f64) {
        self.resources[resource].experience = experience;
        self.reset_valuations();
    }

    pub fn set_device_held(&mut self, kind: DeviceKind, resource: usize, minutes: f64) {
        self.device_mut(kind, resource).held = minutes;
        self.reset_valuations();
    }

    pub fn set_device_experience(&mut self, kind: DeviceKind, resource: usize, experience: f64) {
        self.device_mut(kind, resource).experience = experience;
        self.reset_valuations();
    }

    pub fn set_end_day_gpm(&mut self, gpm: f64) {
        self.end_day_gpm = gpm;
        self.reset_valuations();
    }

    // ========================================================================
    // Utility and effort lookups
    // ========================================================================

    /// Marginal utility of the next unit of `resource`
    pub fn util(&self, resource: usize) -> f64 {
        let state = &self.resources[resource];
        state.utility.marginal(state.held)
    }

    /// Marginal utility of the next unit after holdings change by `change`
    pub fn temp_util(&self, resource: usize, change: i64) -> f64 {
        let state = &self.resources[resource];
        state.utility.marginal(state.held + change)
    }

    /// Minutes to gather one unit at current experience
    pub fn effort(&self, resource: usize) -> f64 {
        let state = &self.resources[resource];
        state.effort.at(state.experience)
    }

    pub fn temp_effort(&self, resource: usize, change: f64) -> f64 {
        let state = &self.resources[resource];
        state.effort.at(state.experience + change)
    }

    pub fn util_per_effort(&self, resource: usize) -> f64 {
        self.util(resource) / self.effort(resource)
    }

    /// Minutes to build one device at current experience
    pub fn device_effort(&self, kind: DeviceKind, resource: usize) -> f64 {
        let device = self.device(kind, resource);
        device.effort.at(device.experience)
    }

    pub fn temp_device_effort(&self, kind: DeviceKind, resource: usize, change: f64) -> f64 {
        let device = self.device(kind, resource);
        device.effort.at(device.experience + change)
    }

    /// Utility gained (`change > 0`) or lost (`change < 0`) by changing the
    /// holdings of `resource` by `change` units
    ///
    /// Losing more than is held, or starting from negative holdings, is
    /// valued at 0.
    pub fn barter_utility(&self, resource: usize, change: i64) -> f64 {
        let state = &self.resources[resource];
        let held = state.held;
        if held < 0 {
            return 0.0;
        }
        if change >= 0 {
            state.utility.total(held + change) - state.utility.total(held)
        } else if held + change < 0 {
            0.0
        } else {
            state.utility.total(held) - state.utility.total(held + change)
        }
    }

    /// Total utility of current holdings of `resource`
    pub fn utility_held(&self, resource: usize) -> f64 {
        let state = &self.resources[resource];
        state.utility.total(state.held)
    }

    /// Utility lost by giving up `bundle`
    pub fn cost_of_bundle(&self, bundle: &[i64]) -> f64 {
        bundle
            .iter()
            .enumerate()
            .filter(|(_, &n)| n > 0)
            .map(|(r, &n)| self.barter_utility(r, -n))
            .sum()
    }

    /// Utility gained by receiving `bundle`
    pub fn gain_of_bundle(&self, bundle: &[i64]) -> f64 {
        bundle
            .iter()
            .enumerate()
            .filter(|(_, &n)| n > 0)
            .map(|(r, &n)| self.barter_utility(r, n))
            .sum()
    }

    pub fn holds_bundle(&self, bundle: &[i64]) -> bool {
        bundle
            .iter()
            .enumerate()
            .all(|(r, &n)| self.resources[r].held >= n)
    }

    // ========================================================================
    // Device lookups
    // ========================================================================

    /// Highest extracting device held for `resource`
    pub fn best_device(&self, resource: usize) -> Option<DeviceKind> {
        DeviceKind::EXTRACTORS
            .iter()
            .rev()
            .copied()
            .find(|&kind| self.device_held(kind, resource) > 0.0)
    }

    /// Device-making device held that speeds up building `kind`
    pub fn best_dev_device(&self, kind: DeviceKind, resource: usize) -> Option<DeviceKind> {
        kind.dev_device()
            .filter(|&dev| self.device_held(dev, resource) > 0.0)
    }

    /// Minutes of extracting devices held for `resource`, summed up the
    /// Tool → Machine → Factory → Industry chain while it is defined
    pub fn device_held_for_res(&self, devices: &DeviceTable, resource: usize) -> f64 {
        let mut total = 0.0;
        let mut kind = Some(DeviceKind::Tool);
        while let Some(k) = kind.filter(|&k| devices.contains(k, resource)) {
            total += self.device_held(k, resource);
            kind = k.component_of();
        }
        total
    }

    /// Minutes counted against the hold limit when acquiring `kind`
    pub fn device_currently_held_for_resource(
        &self,
        devices: &DeviceTable,
        kind: DeviceKind,
        resource: usize,
    ) -> f64 {
        if kind.is_dev_device() {
            self.device_held(kind, resource)
        } else {
            self.device_held_for_res(devices, resource)
        }
    }

    // ========================================================================
    // Trade primitives
    // ========================================================================

    pub(crate) fn buys(&mut self, resource: usize, units: i64) {
        self.resources[resource].held += units;
    }

    pub(crate) fn sells(&mut self, resource: usize, units: i64) {
        self.resources[resource].held -= units;
        debug_assert!(self.resources[resource].held >= 0, "sold more than held");
    }

    pub(crate) fn refresh_end_day_utility(&mut self, resource: usize) {
        let util = self.util(resource);
        self.resources[resource].end_day_utility = util;
    }

    pub(crate) fn refresh_end_day_utilities(&mut self) {
        for r in 0..self.resources.len() {
            self.refresh_end_day_utility(r);
        }
    }

    /// Partners ordered by total remembered surplus from trading `kind`,
    /// best first; partners with no positive surplus are left out
    pub fn preferred_device_traders(&self, kind: DeviceKind) -> Vec<usize> {
        let mut totals: Vec<(usize, f64)> = self.trade_memory[kind.index()]
            .iter()
            .enumerate()
            .map(|(partner, memory)| (partner, memory.iter().sum::<f64>()))
            .filter(|&(_, total)| total > 0.0)
            .collect();
        // Stable sort keeps the lowest id first among equal totals
        totals.sort_by(|a, b| b.1.total_cmp(&a.1));
        totals.into_iter().map(|(partner, _)| partner).collect()
    }

    /// Start a device-trading session for `kind`
    ///
    /// Forgets this session's partners and ages the memory of every partner
    /// that is remembered for anything.
    pub(crate) fn new_device_trade(&mut self, kind: DeviceKind) {
        self.traded_with.clear();
        self.reset_valuations();
        for memory in &mut self.trade_memory[kind.index()] {
            let remembered = memory.iter().any(|&surplus| surplus > 0.0);
            if remembered && memory.pop_back().is_some() {
                memory.push_front(0.0);
            }
        }
    }

    pub(crate) fn remember_trade_surplus(&mut self, kind: DeviceKind, partner: usize, surplus: f64) {
        if let Some(latest) = self.trade_memory[kind.index()]
            .get_mut(partner)
            .and_then(|memory| memory.front_mut())
        {
            *latest += surplus;
        }
    }

    pub fn trade_memory(&self, kind: DeviceKind, partner: usize) -> &VecDeque<f64> {
        &self.trade_memory[kind.index()][partner]
    }

    // ========================================================================
    // Upkeep
    // ========================================================================

    /// Drop every memoized device valuation
    pub fn reset_valuations(&mut self) {
        self.memo.clear();
    }

    /// Anyone who can build a device knows each of its components
    pub(crate) fn update_component_experience(&mut self, devices: &DeviceTable) {
        for kind in DeviceKind::COMPOSITES {
            let Some(comp_kind) = kind.component_kind() else {
                continue;
            };
            for r in 0..self.resources.len() {
                if self.device_experience(kind, r) <= 0.0 {
                    continue;
                }
                if let Some(def) = devices.get(kind, r) {
                    for &c in &def.components {
                        let comp = self.device_mut(comp_kind, c);
                        if comp.experience < 1.0 {
                            comp.experience = 1.0;
                        }
                    }
                }
            }
        }
    }

    /// Sum of the utility of every resource held
    pub fn calc_utility_today(&mut self) -> f64 {
        let total = (0..self.resources.len()).map(|r| self.utility_held(r)).sum();
        self.stats.utility_today = total;
        total
    }

    pub(crate) fn reset_today_stats(&mut self) {
        self.stats.reset_today();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> Agent {
        let config = SimulationConfig {
            num_resources: 3,
            num_agents: 2,
            ..SimulationConfig::default()
        };
        let params = config.agent_parameters().agents()[0].clone();
        Agent::new(0, params, config.num_agents, &config)
    }

    #[test]
    fn test_new_agent_is_empty() {
        let agent = agent();
        assert!(agent.is_active());
        assert_eq!(agent.held(0), 0);
        assert_eq!(agent.best_device(0), None);
        assert_eq!(agent.device(DeviceKind::Tool, 1).prices().len(), 5);
        assert_eq!(agent.trade_memory(DeviceKind::Machine, 1).len(), 5);
    }

    #[test]
    fn test_barter_utility_matches_marginals() {
        let mut agent = agent();
        agent.set_held(0, 2);
        let gain = agent.barter_utility(0, 2);
        assert!((gain - (agent.temp_util(0, 0) + agent.temp_util(0, 1))).abs() < 1e-9);
        let loss = agent.barter_utility(0, -2);
        assert!((loss - (agent.temp_util(0, -1) + agent.temp_util(0, -2))).abs() < 1e-9);
        assert_eq!(agent.barter_utility(0, -3), 0.0);
    }

    #[test]
    fn test_preferred_traders_order() {
        let mut agent = agent();
        agent.trade_memory[DeviceKind::Tool.index()] = vec![
            VecDeque::from(vec![0.0, 0.0]),
            VecDeque::from(vec![2.0, 1.0]),
        ];
        assert_eq!(agent.preferred_device_traders(DeviceKind::Tool), vec![1]);
    }

    #[test]
    fn test_remove_reinitializes() {
        let config = SimulationConfig {
            num_resources: 3,
            num_agents: 2,
            ..SimulationConfig::default()
        };
        let mut agent = agent();
        agent.set_held(1, 9);
        agent.set_device_held(DeviceKind::Tool, 1, 40.0);
        agent.remove(&config);
        assert!(!agent.is_active());
        assert_eq!(agent.held(1), 0);
        assert_eq!(agent.device_held(DeviceKind::Tool, 1), 0.0);
    }
}
