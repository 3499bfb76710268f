//! Configuration loading and validation tests

use societies_core::config::{AgentParameterTable, TradeRatioRule};
use societies_core::{ConfigError, Simulation, SimulationConfig, SimulationError};
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

// ============================================================================
// Test Helpers
// ============================================================================

/// Fresh scratch directory under the system temp dir
fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("societies-config-{}", Uuid::new_v4()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn row(group: usize, res_power: f64) -> String {
    format!("2.5, 600, 3, 9, 600, 9, 27, 40, 5, {res_power}, 1, 1, 0, {group}")
}

// ============================================================================
// JSON
// ============================================================================

#[test]
fn test_empty_json_is_default() {
    let config = SimulationConfig::from_json_str("{}").unwrap();
    assert_eq!(config, SimulationConfig::default());
}

#[test]
fn test_json_overrides_only_named_fields() {
    let config = SimulationConfig::from_json_str(
        r#"{
            "num_agents": 6,
            "num_resources": 5,
            "trade_ratio_rule": "legacy",
            "devices": { "tool": { "factor": 4.0, "lifetime": 120.0 } }
        }"#,
    )
    .unwrap();

    assert_eq!(config.num_agents, 6);
    assert_eq!(config.num_resources, 5);
    assert_eq!(config.trade_ratio_rule, TradeRatioRule::Legacy);
    assert_eq!(config.devices.tool.factor, 4.0);
    assert_eq!(config.devices.machine, SimulationConfig::default().devices.machine);
    assert_eq!(config.day_length, SimulationConfig::default().day_length);
}

#[test]
fn test_config_serializes_back_to_equal_value() {
    let config = SimulationConfig {
        seed: 77,
        num_groups: 2,
        ..SimulationConfig::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(SimulationConfig::from_json_str(&json).unwrap(), config);
}

#[test]
fn test_malformed_json_is_parse_error() {
    let err = SimulationConfig::from_json_str("{ num_agents: }").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_zero_agents_rejected() {
    let config = SimulationConfig {
        num_agents: 0,
        ..SimulationConfig::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_zero_day_length_rejected() {
    let config = SimulationConfig {
        day_length: 0,
        ..SimulationConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_flat_utility_steepness_rejected() {
    let mut config = SimulationConfig::default();
    config.default_agent.resource.steepness = 1.0;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("steepness"), "got {err}");
}

#[test]
fn test_min_effort_above_max_rejected() {
    let mut config = SimulationConfig::default();
    config.default_agent.resource.min_res_effort = 20.0;
    assert!(config.validate().is_err());
}

#[test]
fn test_removal_out_of_range_rejected() {
    let json = r#"{ "num_agents": 4, "removal": { "agent": { "agent": 4, "day": 1 } } }"#;
    assert!(SimulationConfig::from_json_str(json).is_err());
}

#[test]
fn test_simulation_new_rejects_invalid_config() {
    let config = SimulationConfig {
        num_resources: 0,
        ..SimulationConfig::default()
    };
    assert!(matches!(
        Simulation::new(config),
        Err(SimulationError::InvalidConfig(_))
    ));
}

#[test]
fn test_device_hold_limit() {
    let config = SimulationConfig {
        days_of_device_to_hold: 2.0,
        day_length: 300,
        ..SimulationConfig::default()
    };
    assert_eq!(config.device_hold_limit(), 600.0);
}

// ============================================================================
// Agent parameter tables
// ============================================================================

#[test]
fn test_table_group_out_of_range_rejected() {
    let text = [row(0, 1.0), row(0, 1.0), row(0, 1.0), row(3, 1.0), row(3, 1.0), row(3, 1.0)].join("\n");
    let table = AgentParameterTable::parse(&text, 2, 3).unwrap();
    let config = SimulationConfig {
        num_agents: 2,
        num_resources: 3,
        num_groups: 1,
        resources_in_tool: 1,
        num_device_components: 2,
        agent_table: Some(table),
        ..SimulationConfig::default()
    };
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("group"), "got {err}");
}

#[test]
fn test_table_with_wrong_agent_count_rejected() {
    let text = [row(0, 1.0), row(0, 1.0), row(0, 1.0)].join("\n");
    let table = AgentParameterTable::parse(&text, 1, 3).unwrap();
    let config = SimulationConfig {
        num_agents: 2,
        num_resources: 3,
        resources_in_tool: 1,
        num_device_components: 2,
        agent_table: Some(table),
        ..SimulationConfig::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_from_file_resolves_relative_table() {
    let dir = scratch_dir();
    let rows: Vec<String> = (0..2)
        .flat_map(|a| (0..3).map(move |_| row(a, 1.0 + a as f64)))
        .collect();
    fs::write(dir.join("agents.csv"), format!("# two agents\n{}\n", rows.join("\n"))).unwrap();
    fs::write(
        dir.join("config.json"),
        r#"{
            "num_agents": 2,
            "num_resources": 3,
            "num_groups": 2,
            "resources_in_tool": 2,
            "num_device_components": 2,
            "agent_parameters_file": "agents.csv"
        }"#,
    )
    .unwrap();

    let config = SimulationConfig::from_file(dir.join("config.json")).unwrap();
    let table = config.agent_parameters();
    assert_eq!(table.len(), 2);
    assert_eq!(table.agents()[1].group, 1);
    assert_eq!(table.agents()[1].res_trade_power, 2.0);
    assert_eq!(table.group_sizes(2), vec![1, 1]);

    let sim = Simulation::new(config).unwrap();
    assert_eq!(sim.agents()[1].group(), 1);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_from_file_missing_is_io_error() {
    let dir = scratch_dir();
    let err = SimulationConfig::from_file(dir.join("nope.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_homogeneous_population_spreads_groups() {
    let config = SimulationConfig {
        num_agents: 7,
        num_groups: 3,
        ..SimulationConfig::default()
    };
    assert_eq!(config.agent_parameters().group_sizes(3), vec![3, 2, 2]);
}
