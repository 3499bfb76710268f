//! Simulation configuration
//!
//! All global scalars of a run live in [`SimulationConfig`]. Every field has
//! a default, so a JSON file only needs to name what it changes:
//!
//! ```
//! use societies_core::SimulationConfig;
//!
//! let config = SimulationConfig::from_json_str(r#"{ "num_agents": 4, "seed": 7 }"#).unwrap();
//! assert_eq!(config.num_agents, 4);
//! assert_eq!(config.num_resources, SimulationConfig::default().num_resources);
//! ```

pub mod params;

use crate::devices::DeviceKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use params::{AgentParameterTable, AgentParameters, AgentTemplate, ResourceParameters};

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("agent parameters line {line}: {reason}")]
    ParameterRow { line: usize, reason: String },
}

// ============================================================================
// Configuration Types
// ============================================================================

/// Speedup and lifetime of one device tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceTierConfig {
    /// Speed multiplier applied to the work the device assists
    pub factor: f64,
    /// Minutes of assisted work one unit of the device provides
    pub lifetime: f64,
}

/// Per-tier device settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceTiers {
    pub tool: DeviceTierConfig,
    pub machine: DeviceTierConfig,
    pub factory: DeviceTierConfig,
    pub industry: DeviceTierConfig,
    pub dev_machine: DeviceTierConfig,
    pub dev_factory: DeviceTierConfig,
}

impl Default for DeviceTiers {
    fn default() -> Self {
        Self {
            tool: DeviceTierConfig { factor: 3.0, lifetime: 150.0 },
            machine: DeviceTierConfig { factor: 9.0, lifetime: 300.0 },
            factory: DeviceTierConfig { factor: 27.0, lifetime: 600.0 },
            industry: DeviceTierConfig { factor: 81.0, lifetime: 1200.0 },
            dev_machine: DeviceTierConfig { factor: 3.0, lifetime: 150.0 },
            dev_factory: DeviceTierConfig { factor: 9.0, lifetime: 300.0 },
        }
    }
}

impl DeviceTiers {
    pub fn get(&self, kind: DeviceKind) -> DeviceTierConfig {
        match kind {
            DeviceKind::Tool => self.tool,
            DeviceKind::Machine => self.machine,
            DeviceKind::Factory => self.factory,
            DeviceKind::Industry => self.industry,
            DeviceKind::DevMachine => self.dev_machine,
            DeviceKind::DevFactory => self.dev_factory,
        }
    }
}

/// How the resource trade ratio combines both sides' valuations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeRatioRule {
    /// exp((ln(ratio_a) * power_a + ln(ratio_b) * power_b) / (power_a + power_b))
    PowerWeighted,
    /// exp((ratio_a * ln(power_b) + ratio_b * ln(power_b)) / (power_a + power_b)),
    /// kept to reproduce historical runs
    Legacy,
}

/// Agent taken out of the simulation on a given day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentRemoval {
    pub agent: usize,
    pub day: usize,
}

/// Resource taken out of the simulation on a given day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceRemoval {
    pub resource: usize,
    pub day: usize,
    /// Also wipe every agent's holdings and experience of the resource
    #[serde(default)]
    pub eliminate_holdings: bool,
}

/// Optional mid-run removals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemovalSchedule {
    pub agent: Option<AgentRemoval>,
    pub resource: Option<ResourceRemoval>,
}

/// Complete simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for the deterministic random source
    pub seed: u64,

    // Time
    pub start_day: usize,
    pub num_days: usize,
    /// Working minutes in one day
    pub day_length: u32,

    // Population
    pub num_agents: usize,
    pub num_resources: usize,
    pub num_groups: usize,

    // Trade
    pub res_trade_rounds: u32,
    pub res_trade_attempts: u32,
    pub device_trade_rounds: u32,
    pub device_trade_attempts: u32,
    /// Maximum number of resources an agent offers in one negotiation
    pub menu_size: usize,
    /// Minimum surplus either side needs before a resource trade executes
    pub trade_epsilon: f64,
    pub trade_ratio_rule: TradeRatioRule,

    // Memory
    /// Acquisitions of a device remembered per agent
    pub device_trade_memory_length: usize,
    /// Days of device production remembered per agent
    pub device_production_memory_length: usize,

    // Devices
    pub devices: DeviceTiers,
    pub resources_in_tool: usize,
    pub num_device_components: usize,
    pub daily_device_decay: f64,
    pub days_of_device_to_hold: f64,
    pub min_device_for_dev_device_consideration: u32,
    pub min_res_held_for_device_consideration: i64,

    // Experience
    pub daily_exp_penalty: f64,
    pub max_res_experience: f64,
    pub inventor_device_experience: f64,
    pub min_held_device_experience: f64,
    /// Tolerance when comparing utility-per-minute during work
    pub production_epsilon: f64,

    // Utility
    /// Floor for marginal utility once a curve runs out
    pub min_res_util: f64,

    // Invention
    pub tool_probability_factor: f64,
    pub device_probability_factor: f64,

    // Toggles
    pub trade_exists: bool,
    pub devices_exist: bool,
    pub tools_only: bool,
    /// Keep an in-memory log of trades, inventions and removals
    pub record_events: bool,

    pub removal: RemovalSchedule,

    // Agents
    /// Parameters used for every agent when no table file is given
    pub default_agent: AgentTemplate,
    /// Heterogeneous parameter table, relative to the config file
    pub agent_parameters_file: Option<PathBuf>,
    /// Table loaded from `agent_parameters_file`
    #[serde(skip)]
    pub agent_table: Option<AgentParameterTable>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            start_day: 0,
            num_days: 100,
            day_length: 600,
            num_agents: 8,
            num_resources: 8,
            num_groups: 1,
            res_trade_rounds: 12,
            res_trade_attempts: 5,
            device_trade_rounds: 5,
            device_trade_attempts: 2,
            menu_size: 4,
            trade_epsilon: 1.0,
            trade_ratio_rule: TradeRatioRule::PowerWeighted,
            device_trade_memory_length: 5,
            device_production_memory_length: 15,
            devices: DeviceTiers::default(),
            resources_in_tool: 3,
            num_device_components: 3,
            daily_device_decay: 15.0,
            days_of_device_to_hold: 1.5,
            min_device_for_dev_device_consideration: 15,
            min_res_held_for_device_consideration: 1,
            daily_exp_penalty: 3.0,
            max_res_experience: 600.0,
            inventor_device_experience: 12.0,
            min_held_device_experience: 1.0,
            production_epsilon: 1e-5,
            min_res_util: 1.0,
            tool_probability_factor: 2e-5,
            device_probability_factor: 1e-3,
            trade_exists: true,
            devices_exist: true,
            tools_only: false,
            record_events: false,
            removal: RemovalSchedule::default(),
            default_agent: AgentTemplate::default(),
            agent_parameters_file: None,
            agent_table: None,
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a JSON file
    ///
    /// A relative `agent_parameters_file` is resolved against the directory
    /// holding the config file.
    ///
    /// # Errors
    /// Returns an error if either file cannot be read or parsed, or if the
    /// result fails validation.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = read_file(path)?;
        let mut config: Self = serde_json::from_str(&content)?;

        if let Some(table_path) = config.agent_parameters_file.clone() {
            let resolved = match path.parent() {
                Some(dir) if table_path.is_relative() => dir.join(&table_path),
                _ => table_path,
            };
            let text = read_file(&resolved)?;
            config.agent_table = Some(AgentParameterTable::parse(
                &text,
                config.num_agents,
                config.num_resources,
            )?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a JSON string
    ///
    /// `agent_parameters_file` is not followed here; set `agent_table`
    /// directly when working from memory.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.num_agents == 0 {
            return invalid("num_agents must be positive".into());
        }
        if self.num_resources == 0 {
            return invalid("num_resources must be positive".into());
        }
        if self.num_groups == 0 {
            return invalid("num_groups must be positive".into());
        }
        if self.day_length == 0 {
            return invalid("day_length must be positive".into());
        }
        if self.menu_size == 0 {
            return invalid("menu_size must be positive".into());
        }
        if self.device_trade_memory_length == 0 || self.device_production_memory_length == 0 {
            return invalid("memory lengths must be positive".into());
        }
        // A tool is invented from resources_in_tool + 1 considered resources
        if self.resources_in_tool == 0 || self.resources_in_tool >= self.num_resources {
            return invalid(format!(
                "resources_in_tool must be in 1..{}, got {}",
                self.num_resources, self.resources_in_tool
            ));
        }
        if self.num_device_components < 2 || self.num_device_components >= self.num_resources {
            return invalid(format!(
                "num_device_components must be in 2..{}, got {}",
                self.num_resources, self.num_device_components
            ));
        }
        for kind in DeviceKind::ALL {
            let tier = self.devices.get(kind);
            if !(tier.factor > 0.0) || !(tier.lifetime > 0.0) {
                return invalid(format!("{kind}: factor and lifetime must be positive"));
            }
        }
        if self.tool_probability_factor < 0.0 || self.device_probability_factor < 0.0 {
            return invalid("probability factors must be non-negative".into());
        }
        if self.trade_epsilon < 0.0 || self.production_epsilon < 0.0 {
            return invalid("epsilons must be non-negative".into());
        }
        if !(self.min_res_util > 0.0) {
            return invalid("min_res_util must be positive".into());
        }
        if self.daily_device_decay < 0.0 || self.daily_exp_penalty < 0.0 {
            return invalid("decay and penalty rates must be non-negative".into());
        }

        if let Some(removal) = self.removal.agent {
            if removal.agent >= self.num_agents {
                return invalid(format!("agent to remove {} out of range", removal.agent));
            }
        }
        if let Some(removal) = self.removal.resource {
            if removal.resource >= self.num_resources {
                return invalid(format!(
                    "resource to remove {} out of range",
                    removal.resource
                ));
            }
        }

        match &self.agent_table {
            Some(table) => {
                if table.len() != self.num_agents {
                    return invalid(format!(
                        "agent table has {} agents, expected {}",
                        table.len(),
                        self.num_agents
                    ));
                }
                for (a, agent) in table.agents().iter().enumerate() {
                    agent.validate(a, self.num_resources, self.num_groups)?;
                }
            }
            None => self
                .default_agent
                .instantiate(0, self.num_resources)
                .validate(0, self.num_resources, self.num_groups)?,
        }

        Ok(())
    }

    /// Parameters for every agent, from the loaded table or the template
    pub fn agent_parameters(&self) -> AgentParameterTable {
        match &self.agent_table {
            Some(table) => table.clone(),
            None => AgentParameterTable::homogeneous(
                &self.default_agent,
                self.num_agents,
                self.num_resources,
                self.num_groups,
            ),
        }
    }

    /// Upper bound on device minutes an agent wants to hold for one resource
    pub fn device_hold_limit(&self) -> f64 {
        self.days_of_device_to_hold * f64::from(self.day_length)
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_tool_size_bounds() {
        let config = SimulationConfig {
            resources_in_tool: 9,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_device_components_must_leave_a_target() {
        let config = SimulationConfig {
            num_resources: 3,
            resources_in_tool: 3,
            num_device_components: 3,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_ratio_rule_is_parse_error() {
        let err = SimulationConfig::from_json_str(r#"{ "trade_ratio_rule": "median" }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
