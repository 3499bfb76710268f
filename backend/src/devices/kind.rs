//! The six device tiers and the fixed links between them
//!
//! ```text
//!   extraction:   Tool ──▶ Machine ──▶ Factory ──▶ Industry
//!                   │         │
//!   building:       └─▶ DevMachine ──▶ DevFactory
//! ```
//!
//! An arrow `A ──▶ B` means "A is a component of B". A DevMachine speeds up
//! making Tools and a DevFactory speeds up making Machines.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of device tiers
pub const NUM_DEVICE_KINDS: usize = 6;

/// One of the six device tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Tool,
    Machine,
    Factory,
    Industry,
    DevMachine,
    DevFactory,
}

impl DeviceKind {
    /// All tiers in index order
    pub const ALL: [DeviceKind; NUM_DEVICE_KINDS] = [
        DeviceKind::Tool,
        DeviceKind::Machine,
        DeviceKind::Factory,
        DeviceKind::Industry,
        DeviceKind::DevMachine,
        DeviceKind::DevFactory,
    ];

    /// Resource-extracting tiers, lowest first
    pub const EXTRACTORS: [DeviceKind; 4] = [
        DeviceKind::Tool,
        DeviceKind::Machine,
        DeviceKind::Factory,
        DeviceKind::Industry,
    ];

    /// Build order: every tier comes after the tiers it consumes
    pub const PRODUCTION_ORDER: [DeviceKind; NUM_DEVICE_KINDS] = [
        DeviceKind::Tool,
        DeviceKind::DevMachine,
        DeviceKind::Machine,
        DeviceKind::DevFactory,
        DeviceKind::Factory,
        DeviceKind::Industry,
    ];

    /// Order of the per-kind device market sessions, most complex first
    pub const TRADE_ORDER: [DeviceKind; NUM_DEVICE_KINDS] = [
        DeviceKind::Industry,
        DeviceKind::Factory,
        DeviceKind::DevFactory,
        DeviceKind::Machine,
        DeviceKind::DevMachine,
        DeviceKind::Tool,
    ];

    /// Tiers whose experience props up the experience of their components
    pub const COMPOSITES: [DeviceKind; 5] = [
        DeviceKind::Industry,
        DeviceKind::DevFactory,
        DeviceKind::Factory,
        DeviceKind::DevMachine,
        DeviceKind::Machine,
    ];

    /// Dense index in `0..NUM_DEVICE_KINDS`
    pub fn index(self) -> usize {
        match self {
            DeviceKind::Tool => 0,
            DeviceKind::Machine => 1,
            DeviceKind::Factory => 2,
            DeviceKind::Industry => 3,
            DeviceKind::DevMachine => 4,
            DeviceKind::DevFactory => 5,
        }
    }

    /// Tier one level down that this tier is built from (`None` for Tool,
    /// whose components are raw resources)
    pub fn component_kind(self) -> Option<DeviceKind> {
        match self {
            DeviceKind::Tool => None,
            DeviceKind::Machine => Some(DeviceKind::Tool),
            DeviceKind::Factory => Some(DeviceKind::Machine),
            DeviceKind::Industry => Some(DeviceKind::Factory),
            DeviceKind::DevMachine => Some(DeviceKind::Tool),
            DeviceKind::DevFactory => Some(DeviceKind::DevMachine),
        }
    }

    /// Tier whose construction this device accelerates
    pub fn can_make(self) -> Option<DeviceKind> {
        match self {
            DeviceKind::DevMachine => Some(DeviceKind::Tool),
            DeviceKind::DevFactory => Some(DeviceKind::Machine),
            _ => None,
        }
    }

    /// Tier that accelerates construction of this device
    pub fn dev_device(self) -> Option<DeviceKind> {
        match self {
            DeviceKind::Tool => Some(DeviceKind::DevMachine),
            DeviceKind::Machine => Some(DeviceKind::DevFactory),
            _ => None,
        }
    }

    /// Extraction tier that consumes this tier as a component
    ///
    /// Following this link from Tool walks the extraction chain upwards.
    pub fn component_of(self) -> Option<DeviceKind> {
        match self {
            DeviceKind::Tool => Some(DeviceKind::Machine),
            DeviceKind::Machine => Some(DeviceKind::Factory),
            DeviceKind::Factory => Some(DeviceKind::Industry),
            DeviceKind::DevMachine => Some(DeviceKind::DevFactory),
            DeviceKind::Industry | DeviceKind::DevFactory => None,
        }
    }

    /// Tier tried next when every considered resource already has this tier
    pub fn next_tier(self) -> Option<DeviceKind> {
        match self {
            DeviceKind::Machine => Some(DeviceKind::Factory),
            DeviceKind::Factory => Some(DeviceKind::Industry),
            DeviceKind::DevMachine => Some(DeviceKind::DevFactory),
            _ => None,
        }
    }

    /// Device experience gained by building one unit without help
    pub fn experience_for_making(self) -> f64 {
        match self {
            DeviceKind::Tool => 1.0,
            DeviceKind::Machine => 2.0,
            DeviceKind::Factory => 4.0,
            DeviceKind::Industry => 8.0,
            DeviceKind::DevMachine => 4.0,
            DeviceKind::DevFactory => 8.0,
        }
    }

    pub fn is_extractor(self) -> bool {
        self.can_make().is_none()
    }

    pub fn is_dev_device(self) -> bool {
        self.can_make().is_some()
    }

    /// Human-readable tier name
    pub fn name(self) -> &'static str {
        match self {
            DeviceKind::Tool => "tool",
            DeviceKind::Machine => "machine",
            DeviceKind::Factory => "factory",
            DeviceKind::Industry => "industry",
            DeviceKind::DevMachine => "dev_machine",
            DeviceKind::DevFactory => "dev_factory",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_matches_all_order() {
        for (i, kind) in DeviceKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_component_chain_depth_is_bounded() {
        for kind in DeviceKind::ALL {
            let mut depth = 0;
            let mut current = Some(kind);
            while let Some(k) = current {
                current = k.component_kind();
                depth += 1;
                assert!(depth <= NUM_DEVICE_KINDS);
            }
        }
    }

    #[test]
    fn test_production_order_builds_components_first() {
        for (pos, kind) in DeviceKind::PRODUCTION_ORDER.iter().enumerate() {
            if let Some(comp) = kind.component_kind() {
                let comp_pos = DeviceKind::PRODUCTION_ORDER
                    .iter()
                    .position(|k| *k == comp)
                    .unwrap();
                assert!(comp_pos < pos, "{} built before its component {}", kind, comp);
            }
        }
    }

    #[test]
    fn test_escalation_terminates() {
        let mut steps = 0;
        let mut current = Some(DeviceKind::Machine);
        while let Some(k) = current {
            current = k.next_tier();
            steps += 1;
        }
        assert_eq!(steps, 3); // Machine -> Factory -> Industry
    }
}
