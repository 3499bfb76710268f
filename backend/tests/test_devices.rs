//! Device tiers, the device table, commitments and production

use societies_core::config::{DeviceTierConfig, SimulationConfig};
use societies_core::devices::agents_known;
use societies_core::models::ResourceRegistry;
use societies_core::{Agent, DeviceKind, DeviceTable, Environment};

// ============================================================================
// Test Helpers
// ============================================================================

fn tier(factor: f64, lifetime: f64) -> DeviceTierConfig {
    DeviceTierConfig { factor, lifetime }
}

fn config() -> SimulationConfig {
    SimulationConfig {
        num_agents: 2,
        num_resources: 5,
        ..SimulationConfig::default()
    }
}

fn agents(config: &SimulationConfig) -> Vec<Agent> {
    config
        .agent_parameters()
        .agents()
        .iter()
        .enumerate()
        .map(|(id, p)| Agent::new(id, p.clone(), config.num_agents, config))
        .collect()
}

/// Tools for resources 0 and 1 (each from 2, 3, 4) and a Machine for 2
/// built from those two tools
fn machine_table() -> DeviceTable {
    let mut table = DeviceTable::new(5);
    table.define(DeviceKind::Tool, 0, vec![2, 3, 4], tier(3.0, 150.0));
    table.define(DeviceKind::Tool, 1, vec![4, 2, 3], tier(3.0, 150.0));
    table.define(DeviceKind::Machine, 2, vec![1, 0], tier(9.0, 300.0));
    table
}

// ============================================================================
// Tiers
// ============================================================================

#[test]
fn test_extraction_chain_walks_upwards() {
    let mut chain = vec![DeviceKind::Tool];
    while let Some(next) = chain.last().and_then(|k| k.component_of()) {
        if next.is_dev_device() {
            break;
        }
        chain.push(next);
    }
    assert_eq!(chain, DeviceKind::EXTRACTORS.to_vec());
}

#[test]
fn test_dev_devices_speed_up_their_component_tier() {
    assert_eq!(DeviceKind::DevMachine.can_make(), Some(DeviceKind::Tool));
    assert_eq!(DeviceKind::DevFactory.can_make(), Some(DeviceKind::Machine));
    assert_eq!(DeviceKind::Tool.dev_device(), Some(DeviceKind::DevMachine));
    assert_eq!(DeviceKind::Factory.dev_device(), None);
    assert!(DeviceKind::Industry.is_extractor());
    assert!(!DeviceKind::DevFactory.is_extractor());
}

#[test]
fn test_production_order_builds_components_first() {
    let position = |kind: DeviceKind| {
        DeviceKind::PRODUCTION_ORDER
            .iter()
            .position(|&k| k == kind)
            .unwrap()
    };
    for kind in DeviceKind::ALL {
        if let Some(comp) = kind.component_kind() {
            assert!(position(comp) < position(kind), "{comp} must be built before {kind}");
        }
    }
}

#[test]
fn test_kind_serializes_snake_case() {
    let json = serde_json::to_string(&DeviceKind::DevMachine).unwrap();
    assert_eq!(json, "\"dev_machine\"");
    assert_eq!(DeviceKind::DevFactory.to_string(), "dev_factory");
}

// ============================================================================
// Device table
// ============================================================================

#[test]
fn test_machine_needs_resources_of_both_tools() {
    let table = machine_table();
    let machine = table.get(DeviceKind::Machine, 2).unwrap();
    assert_eq!(machine.components, vec![0, 1]);
    assert_eq!(machine.necessary_resources, vec![0, 0, 2, 2, 2]);
    assert_eq!(machine.component_kind(), Some(DeviceKind::Tool));
    assert_eq!(table.factor(DeviceKind::Machine, 2), 9.0);
    assert_eq!(table.factor(DeviceKind::Machine, 3), 1.0);
}

#[test]
fn test_redefinition_returns_previous() {
    let mut table = DeviceTable::new(5);
    assert!(table.define(DeviceKind::Tool, 0, vec![1, 2], tier(3.0, 150.0)).is_none());
    let old = table.define(DeviceKind::Tool, 0, vec![3, 4], tier(3.0, 150.0));
    assert_eq!(old.map(|d| d.components), Some(vec![1, 2]));
    assert_eq!(table.defined_count(DeviceKind::Tool), 1);
}

#[test]
fn test_known_requires_definition_and_experience() {
    let config = config();
    let mut agents = agents(&config);
    let table = machine_table();

    assert!(!table.is_known(&agents, DeviceKind::Tool, 0));
    agents[1].set_device_experience(DeviceKind::Tool, 0, 3.0);
    assert!(table.is_known(&agents, DeviceKind::Tool, 0));
    assert_eq!(agents_known(&agents, DeviceKind::Tool, 0), 1);

    // Experience without a definition does not count
    agents[0].set_device_experience(DeviceKind::Factory, 4, 3.0);
    assert!(!table.is_known(&agents, DeviceKind::Factory, 4));
    assert!(!table.any_known(&agents, DeviceKind::Factory));
    assert!(table.any_known(&agents, DeviceKind::Tool));
}

// ============================================================================
// Commitments and production
// ============================================================================

#[test]
fn test_committed_machine_is_built_with_its_tools() {
    let config = config();
    let table = machine_table();
    let registry = ResourceRegistry::new(5);
    let env = Environment::new(&config, &table, &registry);
    let mut agent = agents(&config).remove(0);
    for r in 2..5 {
        agent.set_held(r, 3);
    }

    agent.set_aside_components(env, DeviceKind::Machine, 2);
    // Both tools are committed too, consuming one of each raw component each
    assert_eq!(agent.device(DeviceKind::Tool, 0).to_make(), 1);
    assert_eq!(agent.device(DeviceKind::Tool, 1).to_make(), 1);
    for r in 2..5 {
        assert_eq!(agent.held(r), 1);
        assert_eq!(agent.resource(r).set_aside(), 2);
        assert_eq!(agent.total_units(r), 3);
    }

    agent.device_production(env);

    assert_eq!(agent.device(DeviceKind::Machine, 2).to_make(), 0);
    assert_eq!(agent.stats().devices_made_today_of(DeviceKind::Machine.index()), 1);
    assert_eq!(agent.stats().devices_made_today_of(DeviceKind::Tool.index()), 2);
    for r in 2..5 {
        assert_eq!(agent.resource(r).set_aside(), 0);
        assert_eq!(agent.held(r), 1);
    }
    assert!(agent.overtime() > 0.0);
    assert_eq!(agent.device_experience(DeviceKind::Machine, 2), 2.0);
    assert_eq!(agent.device(DeviceKind::Machine, 2).recently_made()[0], 1);
}

#[test]
fn test_selling_unheld_device_commits_to_build_it() {
    let config = config();
    let table = machine_table();
    let registry = ResourceRegistry::new(5);
    let env = Environment::new(&config, &table, &registry);
    let mut list = agents(&config);
    let mut seller = list.remove(0);
    seller.set_held(2, 1);
    seller.set_held(3, 1);
    seller.set_held(4, 1);

    seller.sells_device(env, DeviceKind::Tool, 0);
    assert_eq!(seller.device(DeviceKind::Tool, 0).to_make(), 1);
    assert_eq!(seller.held(2), 0);

    // Buying it back returns the commitment instead of adding minutes
    seller.buys_device(env, DeviceKind::Tool, 0);
    assert_eq!(seller.device(DeviceKind::Tool, 0).to_make(), 0);
    assert_eq!(seller.device_held(DeviceKind::Tool, 0), 0.0);
    assert_eq!(seller.held(2), 1);
    assert_eq!(
        seller.device_experience(DeviceKind::Tool, 0),
        config.min_held_device_experience
    );
}

#[test]
fn test_selling_held_device_hands_over_one_lifetime() {
    let config = config();
    let table = machine_table();
    let registry = ResourceRegistry::new(5);
    let env = Environment::new(&config, &table, &registry);
    let mut seller = agents(&config).remove(0);
    seller.set_device_held(DeviceKind::Tool, 1, 400.0);

    seller.sells_device(env, DeviceKind::Tool, 1);
    assert_eq!(seller.device_held(DeviceKind::Tool, 1), 250.0);
    assert_eq!(seller.device(DeviceKind::Tool, 1).to_make(), 0);
}

#[test]
fn test_personal_devices_commit_only_profitable_builds() {
    let config = config();
    let table = machine_table();
    let registry = ResourceRegistry::new(5);
    let env = Environment::new(&config, &table, &registry);
    let mut agent = agents(&config).remove(0);

    // Knows the tool but holds nothing to build it from
    agent.set_device_experience(DeviceKind::Tool, 0, 5.0);
    assert!(agent.best_personal_device(env, DeviceKind::Tool).is_none());
    assert_eq!(agent.personal_devices(env, DeviceKind::Tool), 0);

    // Plenty of components and a valuable resource 0
    for r in 2..5 {
        agent.set_held(r, 200);
    }
    agent.set_end_day_gpm(0.01);
    let choice = agent.best_personal_device(env, DeviceKind::Tool);
    let Some(choice) = choice else {
        panic!("building a tool for an empty resource should pay off");
    };
    assert_eq!(choice.resource, 0);
    assert!(choice.net_gain() > 0.0);

    let committed = agent.personal_devices(env, DeviceKind::Tool);
    assert!(committed >= 1);
    assert!(agent.device_held(DeviceKind::Tool, 0) >= 150.0);
    assert!(agent.set_aside_time() < config.day_length as f64);
}
