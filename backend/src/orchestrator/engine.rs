//! Simulation engine
//!
//! Owns the whole society and runs it one day at a time.
//!
//! # Day Loop
//!
//! ```text
//! For each day d:
//! 1. Device trading (per kind, most complex first), with personal device
//!    planning and resource trading after each kind
//! 2. Device production (committed devices are built, overtime accrues)
//! 3. Resource trading
//! 4. Work
//! 5. Resource trading
//! 6. Invention (random agent order)
//! 7. End-of-day device experience checks
//! 8. Day analysis (DaySummary, daily counters reset)
//! 9. Decay
//! 10. Scheduled removals
//! ```
//!
//! Every phase is public so an external driver can sequence them itself.
//!
//! # Example
//!
//! ```rust
//! use societies_core::{Simulation, SimulationConfig};
//!
//! let config = SimulationConfig {
//!     num_agents: 4,
//!     num_resources: 4,
//!     num_days: 2,
//!     ..SimulationConfig::default()
//! };
//! let mut sim = Simulation::new(config).unwrap();
//! let summaries = sim.run();
//!
//! assert_eq!(summaries.len(), 2);
//! assert!(summaries[0].units_gathered > 0);
//! ```

use super::summary::DaySummary;
use crate::config::{ConfigError, SimulationConfig};
use crate::core::{time::DayClock, Environment};
use crate::devices::{DeviceKind, DeviceTable};
use crate::market;
use crate::models::{Agent, Event, EventLog, ResourceRegistry};
use crate::production::tool_invention;
use crate::rng::RngManager;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, info_span};
use uuid::Uuid;

/// Errors raised while building a simulation
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("agent parameter table has {found} agents, expected {expected}")]
    ParameterCount { expected: usize, found: usize },
}

/// Counters that only exist for the day in progress
#[derive(Debug, Default)]
struct DayTally {
    devices_traded: BTreeMap<DeviceKind, u64>,
    inventions: usize,
}

/// The simulated society and everything it shares
pub struct Simulation {
    config: SimulationConfig,
    agents: Vec<Agent>,
    resources: ResourceRegistry,
    devices: DeviceTable,
    rng: RngManager,
    clock: DayClock,
    events: EventLog,
    run_id: Uuid,
    today: DayTally,
}

/// Read-only environment over the simulation's fields
///
/// A macro rather than a method so the borrow only covers these three
/// fields and leaves `agents` and `rng` free for mutation.
macro_rules! world {
    ($sim:ident) => {
        Environment::new(&$sim.config, &$sim.devices, &$sim.resources)
    };
}

impl Simulation {
    /// Build a society from validated configuration
    ///
    /// # Errors
    /// * `InvalidConfig` - the configuration fails validation
    /// * `ParameterCount` - the parameter table does not describe
    ///   `num_agents` agents
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;

        let table = config.agent_parameters();
        if table.len() != config.num_agents {
            return Err(SimulationError::ParameterCount {
                expected: config.num_agents,
                found: table.len(),
            });
        }

        let agents = table
            .agents()
            .iter()
            .enumerate()
            .map(|(id, params)| Agent::new(id, params.clone(), config.num_agents, &config))
            .collect();

        let run_id = Uuid::new_v4();
        info!(
            %run_id,
            seed = config.seed,
            agents = config.num_agents,
            resources = config.num_resources,
            "simulation created"
        );

        Ok(Self {
            resources: ResourceRegistry::new(config.num_resources),
            devices: DeviceTable::new(config.num_resources),
            rng: RngManager::new(config.seed),
            clock: DayClock::new(config.start_day, config.num_days, config.day_length),
            events: EventLog::new(config.record_events),
            run_id,
            today: DayTally::default(),
            agents,
            config,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Mutable access for scenario setup
    pub fn agents_mut(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    pub fn devices(&self) -> &DeviceTable {
        &self.devices
    }

    /// Mutable access for scenario setup
    pub fn devices_mut(&mut self) -> &mut DeviceTable {
        &mut self.devices
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn current_day(&self) -> usize {
        self.clock.current_day()
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn rng_state(&self) -> u64 {
        self.rng.get_state()
    }

    pub fn is_finished(&self) -> bool {
        self.clock.is_finished()
    }

    // ========================================================================
    // Driver
    // ========================================================================

    /// Run every remaining day
    pub fn run(&mut self) -> Vec<DaySummary> {
        let span = info_span!("run", run_id = %self.run_id);
        let _guard = span.enter();

        let mut summaries = Vec::with_capacity(self.config.num_days);
        while !self.clock.is_finished() {
            summaries.push(self.run_day());
        }
        info!(days = summaries.len(), "run complete");
        summaries
    }

    /// Run one full day and advance the clock
    pub fn run_day(&mut self) -> DaySummary {
        let day = self.clock.current_day();
        self.today = DayTally::default();

        // STEP 1: DEVICE TRADING
        self.trade_devices();

        // STEP 2: DEVICE PRODUCTION
        self.produce_devices();

        // STEP 3: RESOURCE TRADING
        self.trade_resources();

        // STEP 4: WORK
        self.work();

        // STEP 5: RESOURCE TRADING
        self.trade_resources();

        // STEP 6: INVENTION
        self.invent();

        // STEP 7: END OF DAY
        self.end_day();

        // STEP 8: DAY ANALYSIS
        let summary = self.analyze_day();

        // STEP 9: DECAY
        self.decay();

        // STEP 10: REMOVALS
        self.apply_removals(day);

        self.clock.advance_day();
        summary
    }

    // ========================================================================
    // Phases
    // ========================================================================

    /// Device markets for every kind, with personal planning and resource
    /// trading after each
    pub fn trade_devices(&mut self) {
        if !self.config.trade_exists {
            return;
        }
        let day_length = f64::from(self.config.day_length);
        for agent in &mut self.agents {
            if agent.overtime < day_length {
                agent.util_gain_through_dev_sold_today = 0.0;
            }
        }
        if !self.config.devices_exist {
            return;
        }

        self.trade_resources();
        for kind in DeviceKind::TRADE_ORDER {
            let day = self.clock.current_day();
            let env = world!(self);
            let traded = market::trade_devices(env, &mut self.agents, &mut self.rng, &mut self.events, day, kind);
            *self.today.devices_traded.entry(kind).or_insert(0) += traded as u64;

            for agent in self.agents.iter_mut().filter(|a| a.is_active()) {
                agent.personal_devices(env, kind);
            }
            self.trade_resources();
        }
    }

    /// Build every committed device
    pub fn produce_devices(&mut self) {
        if !self.config.devices_exist {
            return;
        }
        let env = world!(self);
        for agent in self.agents.iter_mut().filter(|a| a.is_active()) {
            agent.device_production(env);
        }
    }

    /// One resource-trading session over all rounds
    pub fn trade_resources(&mut self) {
        if !self.config.trade_exists {
            return;
        }
        let day = self.clock.current_day();
        let env = world!(self);
        market::trade_resources(env, &mut self.agents, &mut self.rng, &mut self.events, day);
    }

    pub fn work(&mut self) {
        let env = world!(self);
        for agent in self.agents.iter_mut().filter(|a| a.is_active()) {
            agent.work_day(env, &mut self.rng);
        }
    }

    /// Every active agent, in random order, tries to invent
    pub fn invent(&mut self) {
        if !self.config.devices_exist {
            return;
        }
        for agent in self.agents.iter_mut().filter(|a| a.is_active()) {
            agent.update_component_experience(&self.devices);
        }

        let mut order: Vec<usize> = (0..self.agents.len()).collect();
        self.rng.shuffle(&mut order);
        let day = self.clock.current_day();
        for inventor in order {
            if !self.agents[inventor].is_active() {
                continue;
            }
            let invention = tool_invention(
                &mut self.agents,
                inventor,
                &mut self.devices,
                &self.config,
                &self.resources,
                &mut self.rng,
            );
            if let Some(invention) = invention {
                debug!(
                    day,
                    inventor,
                    kind = %invention.kind,
                    resource = invention.resource,
                    components = ?invention.components,
                    "device invented"
                );
                self.today.inventions += 1;
                self.events.log(Event::DeviceInvented {
                    day,
                    inventor,
                    kind: invention.kind,
                    resource: invention.resource,
                    components: invention.components,
                });
            }
        }
    }

    pub fn end_day(&mut self) {
        let env = world!(self);
        for agent in self.agents.iter_mut().filter(|a| a.is_active()) {
            agent.end_day_checks(env);
        }
    }

    /// Summarize the day and clear daily counters
    pub fn analyze_day(&mut self) -> DaySummary {
        for agent in &mut self.agents {
            agent.calc_utility_today();
        }
        let summary = DaySummary::collect(
            self.clock.current_day(),
            &self.agents,
            &self.devices,
            std::mem::take(&mut self.today.devices_traded),
            self.today.inventions,
        );
        for agent in &mut self.agents {
            agent.reset_today_stats();
        }

        info!(
            run_id = %self.run_id,
            day = summary.day,
            utility = summary.total_utility,
            gathered = summary.units_gathered,
            traded = summary.units_traded_for_resources,
            devices_made = summary.total_devices_made(),
            "day complete"
        );
        summary
    }

    pub fn decay(&mut self) {
        let env = world!(self);
        for agent in self.agents.iter_mut().filter(|a| a.is_active()) {
            agent.decay(env, &mut self.rng);
        }
    }

    // ========================================================================
    // Removals
    // ========================================================================

    fn apply_removals(&mut self, day: usize) {
        if let Some(removal) = self.config.removal.resource.filter(|r| r.day == day) {
            self.remove_resource(removal.resource, removal.eliminate_holdings);
        }
        if let Some(removal) = self.config.removal.agent.filter(|a| a.day == day) {
            self.remove_agent(removal.agent);
        }
    }

    /// Take a resource out of the simulation
    ///
    /// Device minutes held for it are lost. With `eliminate_holdings`, so
    /// are every agent's units and experience of it.
    pub fn remove_resource(&mut self, resource: usize, eliminate_holdings: bool) {
        self.resources.remove(resource);
        for agent in &mut self.agents {
            for kind in DeviceKind::ALL {
                agent.device_mut(kind, resource).held = 0.0;
            }
            if eliminate_holdings {
                let state = &mut agent.resources[resource];
                state.held = 0;
                state.experience = 0.0;
                agent.refresh_end_day_utility(resource);
            }
            agent.reset_valuations();
        }

        let day = self.clock.current_day();
        debug!(day, resource, eliminate_holdings, "resource removed");
        self.events.log(Event::ResourceRemoved {
            day,
            resource,
            eliminate_holdings,
        });
    }

    /// Take an agent out of the simulation
    pub fn remove_agent(&mut self, agent: usize) {
        let Some(target) = self.agents.get_mut(agent) else {
            return;
        };
        target.remove(&self.config);

        let day = self.clock.current_day();
        debug!(day, agent, "agent removed");
        self.events.log(Event::AgentRemoved { day, agent });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SimulationConfig {
        SimulationConfig {
            num_agents: 4,
            num_resources: 4,
            num_days: 3,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SimulationConfig {
            num_agents: 0,
            ..small_config()
        };
        assert!(matches!(Simulation::new(config), Err(SimulationError::InvalidConfig(_))));
    }

    #[test]
    fn test_run_day_advances_clock() {
        let mut sim = Simulation::new(small_config()).unwrap();
        let summary = sim.run_day();
        assert_eq!(summary.day, 0);
        assert_eq!(sim.current_day(), 1);
        assert_eq!(summary.active_agents, 4);
    }

    #[test]
    fn test_removed_agent_stops_working() {
        let mut sim = Simulation::new(small_config()).unwrap();
        sim.remove_agent(2);
        sim.run_day();
        assert!(!sim.agents()[2].is_active());
        assert_eq!((0..4).map(|r| sim.agents()[2].held(r)).sum::<i64>(), 0);
    }
}
