//! Per-agent counters read by the reporting layer
//!
//! Daily counters are cleared by [`AgentStats::reset_today`] after the day
//! summary is built. Lifetime totals are never cleared while the agent is
//! in the simulation.

use crate::devices::NUM_DEVICE_KINDS;
use serde::{Deserialize, Serialize};

/// One value per device kind and resource, indexed `[kind.index()][resource]`
pub type DeviceGrid<T> = Vec<Vec<T>>;

fn grid<T: Clone + Default>(num_resources: usize) -> DeviceGrid<T> {
    vec![vec![T::default(); num_resources]; NUM_DEVICE_KINDS]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStats {
    // ========================================================================
    // Work
    // ========================================================================
    pub units_gathered_today: Vec<u32>,
    /// Units gathered while each extracting device was the best one held
    pub units_gathered_with_device: DeviceGrid<u32>,
    pub time_gathering_with_device: [f64; NUM_DEVICE_KINDS],
    pub time_gathering_without_device: f64,

    // ========================================================================
    // Trade
    // ========================================================================
    /// Resource units given up in resource trades
    pub units_sold_today: u32,
    pub units_sold_cross_group_today: u32,
    /// Resource units given up to pay for devices
    pub units_sold_for_devices_today: u32,
    pub units_sold_cross_group_for_devices_today: u32,

    // ========================================================================
    // Devices
    // ========================================================================
    pub devices_made_today: DeviceGrid<u32>,
    pub time_making_devices: [f64; NUM_DEVICE_KINDS],
    /// Devices made with help, indexed by the helping dev device
    pub devices_made_with_dev_device: DeviceGrid<u32>,
    pub devices_made_total: DeviceGrid<u32>,
    pub devices_bought_total: DeviceGrid<u32>,
    pub devices_sold_total: DeviceGrid<u32>,
    pub device_minutes_used_total: DeviceGrid<f64>,
    pub device_minutes_decayed_total: DeviceGrid<f64>,

    // ========================================================================
    // Snapshots
    // ========================================================================
    pub before_work_held: Vec<i64>,
    pub before_work_utility: Vec<f64>,
    pub gathered_end_work: Vec<u32>,
    pub bought_end_work: Vec<i64>,
    pub sold_end_work: Vec<i64>,
    pub bought_end_day: Vec<i64>,
    pub sold_end_day: Vec<i64>,

    /// Total utility of holdings, computed during day analysis
    pub utility_today: f64,
}

impl AgentStats {
    pub fn new(num_resources: usize) -> Self {
        Self {
            units_gathered_today: vec![0; num_resources],
            units_gathered_with_device: grid(num_resources),
            time_gathering_with_device: [0.0; NUM_DEVICE_KINDS],
            time_gathering_without_device: 0.0,
            units_sold_today: 0,
            units_sold_cross_group_today: 0,
            units_sold_for_devices_today: 0,
            units_sold_cross_group_for_devices_today: 0,
            devices_made_today: grid(num_resources),
            time_making_devices: [0.0; NUM_DEVICE_KINDS],
            devices_made_with_dev_device: grid(num_resources),
            devices_made_total: grid(num_resources),
            devices_bought_total: grid(num_resources),
            devices_sold_total: grid(num_resources),
            device_minutes_used_total: grid(num_resources),
            device_minutes_decayed_total: grid(num_resources),
            before_work_held: vec![0; num_resources],
            before_work_utility: vec![0.0; num_resources],
            gathered_end_work: vec![0; num_resources],
            bought_end_work: vec![0; num_resources],
            sold_end_work: vec![0; num_resources],
            bought_end_day: vec![0; num_resources],
            sold_end_day: vec![0; num_resources],
            utility_today: 0.0,
        }
    }

    /// Clear everything scoped to a single day
    pub fn reset_today(&mut self) {
        self.units_gathered_today.fill(0);
        for row in self
            .units_gathered_with_device
            .iter_mut()
            .chain(self.devices_made_today.iter_mut())
            .chain(self.devices_made_with_dev_device.iter_mut())
        {
            row.fill(0);
        }
        self.time_gathering_with_device = [0.0; NUM_DEVICE_KINDS];
        self.time_gathering_without_device = 0.0;
        self.units_sold_today = 0;
        self.units_sold_cross_group_today = 0;
        self.units_sold_for_devices_today = 0;
        self.units_sold_cross_group_for_devices_today = 0;
        self.time_making_devices = [0.0; NUM_DEVICE_KINDS];
        self.before_work_utility.fill(0.0);
        self.gathered_end_work.fill(0);
        self.bought_end_work.fill(0);
        self.sold_end_work.fill(0);
        self.bought_end_day.fill(0);
        self.sold_end_day.fill(0);
        self.utility_today = 0.0;
    }

    pub fn total_units_gathered_today(&self) -> u64 {
        self.units_gathered_today.iter().map(|&u| u64::from(u)).sum()
    }

    /// Devices of one kind made today, over all resources
    pub fn devices_made_today_of(&self, kind_index: usize) -> u64 {
        self.devices_made_today
            .get(kind_index)
            .map(|row| row.iter().map(|&n| u64::from(n)).sum())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_keeps_lifetime_totals() {
        let mut stats = AgentStats::new(2);
        stats.units_gathered_today[1] = 4;
        stats.devices_made_today[0][1] = 2;
        stats.devices_made_total[0][1] = 2;
        stats.units_sold_today = 3;

        stats.reset_today();

        assert_eq!(stats.total_units_gathered_today(), 0);
        assert_eq!(stats.devices_made_today_of(0), 0);
        assert_eq!(stats.devices_made_total[0][1], 2);
        assert_eq!(stats.units_sold_today, 0);
    }
}
