//! Per-day aggregate of the whole society

use crate::devices::{DeviceKind, DeviceTable};
use crate::models::Agent;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Society-wide figures for one simulated day
///
/// Built during day analysis, after end-of-day checks and before decay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub day: usize,
    pub active_agents: usize,
    /// Sum over active agents of the utility of their holdings
    pub total_utility: f64,
    pub units_gathered: u64,
    /// Units given up in resource-for-resource trades
    pub units_traded_for_resources: u64,
    /// Units given up to pay for devices
    pub units_traded_for_devices: u64,
    pub cross_group_units: u64,
    pub devices_made: BTreeMap<DeviceKind, u64>,
    pub devices_traded: BTreeMap<DeviceKind, u64>,
    /// Definitions in the device table at the end of the day
    pub known_devices: BTreeMap<DeviceKind, u64>,
    pub inventions: usize,
}

impl DaySummary {
    /// Aggregate the daily counters of every active agent
    ///
    /// Expects `calc_utility_today` to have run for each agent.
    pub fn collect(
        day: usize,
        agents: &[Agent],
        devices: &DeviceTable,
        devices_traded: BTreeMap<DeviceKind, u64>,
        inventions: usize,
    ) -> Self {
        let mut summary = Self {
            day,
            active_agents: 0,
            total_utility: 0.0,
            units_gathered: 0,
            units_traded_for_resources: 0,
            units_traded_for_devices: 0,
            cross_group_units: 0,
            devices_made: DeviceKind::ALL.iter().map(|&k| (k, 0)).collect(),
            devices_traded,
            known_devices: DeviceKind::ALL
                .iter()
                .map(|&k| (k, devices.defined_count(k) as u64))
                .collect(),
            inventions,
        };

        for agent in agents.iter().filter(|a| a.is_active()) {
            let stats = agent.stats();
            summary.active_agents += 1;
            summary.total_utility += stats.utility_today;
            summary.units_gathered += stats.total_units_gathered_today();
            summary.units_traded_for_resources += u64::from(stats.units_sold_today);
            summary.units_traded_for_devices += u64::from(stats.units_sold_for_devices_today);
            summary.cross_group_units += u64::from(stats.units_sold_cross_group_today)
                + u64::from(stats.units_sold_cross_group_for_devices_today);
            for kind in DeviceKind::ALL {
                *summary.devices_made.entry(kind).or_insert(0) += stats.devices_made_today_of(kind.index());
            }
        }
        summary
    }

    pub fn total_devices_made(&self) -> u64 {
        self.devices_made.values().sum()
    }

    pub fn total_devices_traded(&self) -> u64 {
        self.devices_traded.values().sum()
    }
}
