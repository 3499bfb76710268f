//! Invention tests

use societies_core::config::{DeviceTierConfig, SimulationConfig};
use societies_core::models::ResourceRegistry;
use societies_core::production::{device_invention, tool_invention};
use societies_core::{Agent, DeviceKind, DeviceTable, RngManager};

// ============================================================================
// Test Helpers
// ============================================================================

/// Six resources, tools made from five of them, invention always succeeds
fn config() -> SimulationConfig {
    SimulationConfig {
        num_agents: 3,
        num_resources: 6,
        resources_in_tool: 5,
        num_device_components: 3,
        tool_probability_factor: 1e6,
        device_probability_factor: 1e6,
        ..SimulationConfig::default()
    }
}

fn agents(config: &SimulationConfig) -> Vec<Agent> {
    config
        .agent_parameters()
        .agents()
        .iter()
        .enumerate()
        .map(|(id, p)| {
            let mut agent = Agent::new(id, p.clone(), config.num_agents, config);
            for r in 0..config.num_resources {
                agent.set_held(r, 10);
                agent.set_experience(r, 5.0 + r as f64);
            }
            agent
        })
        .collect()
}

// ============================================================================
// Tools
// ============================================================================

#[test]
fn test_tool_uses_every_other_considered_resource() {
    let config = config();
    let mut agents = agents(&config);
    let mut devices = DeviceTable::new(6);
    let registry = ResourceRegistry::new(6);
    let mut rng = RngManager::new(42);

    let invention = tool_invention(&mut agents, 1, &mut devices, &config, &registry, &mut rng)
        .expect("a certain invention");

    assert_eq!(invention.kind, DeviceKind::Tool);
    let expected: Vec<usize> = (0..6).filter(|&r| r != invention.resource).collect();
    assert_eq!(invention.components, expected);

    let def = devices.get(DeviceKind::Tool, invention.resource).unwrap();
    assert_eq!(def.components, expected);
    assert_eq!(def.factor, config.devices.tool.factor);

    assert_eq!(
        agents[1].device_experience(DeviceKind::Tool, invention.resource),
        config.inventor_device_experience
    );
    assert_eq!(agents[0].device_experience(DeviceKind::Tool, invention.resource), 0.0);
    assert_eq!(agents[2].device_experience(DeviceKind::Tool, invention.resource), 0.0);
}

#[test]
fn test_extra_tool_resources_are_drawn_from_holdings() {
    let config = SimulationConfig {
        num_resources: 8,
        resources_in_tool: 3,
        ..config()
    };
    let registry = ResourceRegistry::new(8);

    for seed in 1..20 {
        let mut agents = agents(&config);
        for r in 0..8 {
            let held = if (2..6).contains(&r) { 10 } else { 0 };
            agents[0].set_held(r, held);
            agents[0].set_experience(r, if r >= 6 { 50.0 } else { 1.0 });
        }
        let mut devices = DeviceTable::new(8);
        let mut rng = RngManager::new(seed);

        let invention = tool_invention(&mut agents, 0, &mut devices, &config, &registry, &mut rng)
            .expect("a certain invention");

        let mut considered = invention.components.clone();
        considered.push(invention.resource);
        considered.sort_unstable();
        assert_eq!(considered.len(), 4);
        assert!(considered.contains(&6) && considered.contains(&7));
        let drawn: Vec<usize> = considered.iter().copied().filter(|&r| r < 6).collect();
        assert_eq!(drawn.len(), 2, "seed {seed}: {considered:?}");
        assert!(drawn.iter().all(|r| (2..6).contains(r)));
        assert_ne!(drawn[0], drawn[1]);
    }
}

#[test]
fn test_zero_chance_invents_nothing() {
    let config = SimulationConfig {
        tool_probability_factor: 0.0,
        ..config()
    };
    let mut agents = agents(&config);
    let mut devices = DeviceTable::new(6);
    let registry = ResourceRegistry::new(6);
    let mut rng = RngManager::new(1);

    for inventor in 0..3 {
        assert!(tool_invention(&mut agents, inventor, &mut devices, &config, &registry, &mut rng).is_none());
    }
    assert_eq!(devices.defined_count(DeviceKind::Tool), 0);
}

#[test]
fn test_needs_two_resources_in_simulation() {
    let config = config();
    let mut agents = agents(&config);
    let mut devices = DeviceTable::new(6);
    let mut registry = ResourceRegistry::new(6);
    for r in 1..6 {
        registry.remove(r);
    }
    let mut rng = RngManager::new(5);

    assert!(tool_invention(&mut agents, 0, &mut devices, &config, &registry, &mut rng).is_none());
}

#[test]
fn test_removed_resources_never_become_tools() {
    let config = SimulationConfig {
        resources_in_tool: 2,
        ..config()
    };
    let mut agents = agents(&config);
    let mut devices = DeviceTable::new(6);
    let mut registry = ResourceRegistry::new(6);
    registry.remove(5);
    registry.remove(4);
    let mut rng = RngManager::new(77);

    for round in 0..20 {
        let inventor = round % 3;
        if let Some(invention) = tool_invention(&mut agents, inventor, &mut devices, &config, &registry, &mut rng) {
            assert!(invention.resource < 4);
            assert!(invention.components.iter().all(|&c| c < 4));
            assert!(!invention.components.contains(&invention.resource));
        }
    }
}

// ============================================================================
// Escalation
// ============================================================================

/// Every tool defined and known by agent 0
fn all_tools_known(config: &SimulationConfig, agents: &mut [Agent]) -> DeviceTable {
    let mut devices = DeviceTable::new(6);
    for r in 0..6 {
        let components = (0..6).filter(|&c| c != r).take(3).collect();
        devices.define(DeviceKind::Tool, r, components, config.devices.tool);
        agents[0].set_device_experience(DeviceKind::Tool, r, 4.0);
    }
    devices
}

#[test]
fn test_known_tools_escalate_to_machines() {
    let config = config();
    let mut agents = agents(&config);
    let mut devices = all_tools_known(&config, &mut agents);
    let registry = ResourceRegistry::new(6);
    let mut rng = RngManager::new(13);

    let invention = tool_invention(&mut agents, 0, &mut devices, &config, &registry, &mut rng)
        .expect("a certain device invention");

    assert!(matches!(invention.kind, DeviceKind::Machine | DeviceKind::DevMachine));
    assert_eq!(invention.components.len(), config.num_device_components - 1);
    assert!(!invention.components.contains(&invention.resource));
    assert!(devices.contains(invention.kind, invention.resource));
    // The inventor can build every component of what it invented
    for &c in &invention.components {
        assert!(agents[0].device_experience(DeviceKind::Tool, c) >= 1.0);
    }
}

#[test]
fn test_tools_only_stops_escalation() {
    let config = SimulationConfig {
        tools_only: true,
        ..config()
    };
    let mut agents = agents(&config);
    let mut devices = all_tools_known(&config, &mut agents);
    let registry = ResourceRegistry::new(6);
    let mut rng = RngManager::new(13);

    assert!(tool_invention(&mut agents, 0, &mut devices, &config, &registry, &mut rng).is_none());
    assert_eq!(devices.defined_count(DeviceKind::Machine), 0);
    assert_eq!(devices.defined_count(DeviceKind::DevMachine), 0);
}

#[test]
fn test_known_machines_escalate_to_factories() {
    let config = config();
    let mut agents = agents(&config);
    let mut devices = all_tools_known(&config, &mut agents);
    let machine = DeviceTierConfig { factor: 9.0, lifetime: 300.0 };
    for r in 0..6 {
        let components = (0..6).filter(|&c| c != r).take(2).collect();
        devices.define(DeviceKind::Machine, r, components, machine);
        agents[0].set_device_experience(DeviceKind::Machine, r, 3.0);
    }
    let registry = ResourceRegistry::new(6);
    let mut rng = RngManager::new(21);

    let invention = device_invention(&mut agents, 0, DeviceKind::Machine, &mut devices, &config, &registry, &mut rng)
        .expect("a certain factory invention");
    assert_eq!(invention.kind, DeviceKind::Factory);
    assert_eq!(devices.defined_count(DeviceKind::Factory), 1);
}

#[test]
fn test_forgotten_tool_is_reinvented() {
    let config = config();
    let mut agents = agents(&config);
    let mut devices = DeviceTable::new(6);
    let registry = ResourceRegistry::new(6);
    let mut rng = RngManager::new(42);

    let first = tool_invention(&mut agents, 1, &mut devices, &config, &registry, &mut rng).unwrap();
    // Every other tool is known by agent 2; the first one is forgotten
    for r in (0..6).filter(|&r| r != first.resource) {
        let components = (0..6).filter(|&c| c != r).take(5).collect();
        devices.define(DeviceKind::Tool, r, components, config.devices.tool);
        agents[2].set_device_experience(DeviceKind::Tool, r, 2.0);
    }
    agents[1].set_device_experience(DeviceKind::Tool, first.resource, 0.0);
    assert!(!devices.is_known(&agents, DeviceKind::Tool, first.resource));

    let second = tool_invention(&mut agents, 0, &mut devices, &config, &registry, &mut rng).unwrap();
    assert_eq!(second.kind, DeviceKind::Tool);
    assert_eq!(second.resource, first.resource);
    assert_eq!(
        agents[0].device_experience(DeviceKind::Tool, second.resource),
        config.inventor_device_experience
    );
    assert_eq!(agents[1].device_experience(DeviceKind::Tool, second.resource), 0.0);
    assert_eq!(agents[2].device_experience(DeviceKind::Tool, second.resource), 0.0);
    assert_eq!(devices.defined_count(DeviceKind::Tool), 6);
}
