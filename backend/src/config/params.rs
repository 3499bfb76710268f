//! Per-agent, per-resource behavioural parameters
//!
//! Each agent has one [`ResourceParameters`] row per resource that shapes its
//! utility and effort curves, plus agent-level trade powers, invention speed
//! and group. Heterogeneous populations are loaded from a comma-separated
//! table; homogeneous ones are stamped out of a single [`AgentTemplate`].
//!
//! # Table format
//!
//! ```text
//! # steepness, scaling, minResEff, maxResEff, maxResExp, minDevEff, maxDevEff,
//! # maxDevExp, lifetime, resTradePower, devTradePower, inventSpeed, unused, group
//! 2.5, 600, 3, 9, 600, 9, 27, 40, 5, 1, 1, 1, 0, 0
//! ```
//!
//! Row `a * num_resources + r` configures agent `a`, resource `r`. Lines
//! starting with `#` and blank lines are skipped, and anything after the
//! last required row is ignored.

use super::ConfigError;
use serde::{Deserialize, Serialize};

/// Number of comma-separated columns in one parameter row
pub const PARAMETER_COLUMNS: usize = 14;

/// Curve-shaping parameters for one agent and one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceParameters {
    /// Exponent divisor of the power utility function
    pub steepness: f64,
    /// Multiplier of the power utility function
    pub scaling: f64,
    /// Extraction minutes per unit at full experience
    pub min_res_effort: f64,
    /// Extraction minutes per unit with no experience
    pub max_res_effort: f64,
    /// Experience at which extraction effort bottoms out
    pub max_res_experience: f64,
    /// Build minutes per device at full experience
    pub min_device_effort: f64,
    /// Build minutes per device with no experience
    pub max_device_effort: f64,
    /// Experience at which build effort bottoms out (also the experience cap)
    pub max_device_experience: f64,
    /// Average number of days a unit of the resource survives
    pub lifetime: f64,
}

impl Default for ResourceParameters {
    fn default() -> Self {
        Self {
            steepness: 2.5,
            scaling: 600.0,
            min_res_effort: 3.0,
            max_res_effort: 9.0,
            max_res_experience: 600.0,
            min_device_effort: 9.0,
            max_device_effort: 27.0,
            max_device_experience: 40.0,
            lifetime: 5.0,
        }
    }
}

impl ResourceParameters {
    fn validate(&self, what: &str) -> Result<(), ConfigError> {
        let positive = [
            ("steepness", self.steepness),
            ("scaling", self.scaling),
            ("min_res_effort", self.min_res_effort),
            ("max_res_effort", self.max_res_effort),
            ("min_device_effort", self.min_device_effort),
            ("max_device_effort", self.max_device_effort),
            ("lifetime", self.lifetime),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{what}: {name} must be positive, got {value}"
                )));
            }
        }
        // A steepness of 1 or less never flattens below the utility floor
        if self.steepness <= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "{what}: steepness must exceed 1, got {}",
                self.steepness
            )));
        }
        if self.min_res_effort > self.max_res_effort {
            return Err(ConfigError::Invalid(format!(
                "{what}: min_res_effort exceeds max_res_effort"
            )));
        }
        if self.min_device_effort > self.max_device_effort {
            return Err(ConfigError::Invalid(format!(
                "{what}: min_device_effort exceeds max_device_effort"
            )));
        }
        if self.max_res_experience < 0.0 || self.max_device_experience < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "{what}: experience limits must be non-negative"
            )));
        }
        Ok(())
    }
}

/// Everything needed to construct one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentParameters {
    /// Weight of this agent in resource trade ratios
    pub res_trade_power: f64,
    /// Weight of this agent in device trade bundles
    pub device_trade_power: f64,
    /// Multiplier on invention probability
    pub invent_speed: f64,
    /// Group id, used to split trade statistics
    pub group: usize,
    /// One row per resource
    pub resources: Vec<ResourceParameters>,
}

impl AgentParameters {
    /// Check shape and value ranges against the population settings
    pub fn validate(
        &self,
        agent: usize,
        num_resources: usize,
        num_groups: usize,
    ) -> Result<(), ConfigError> {
        if self.resources.len() != num_resources {
            return Err(ConfigError::Invalid(format!(
                "agent {agent}: expected {num_resources} resource rows, found {}",
                self.resources.len()
            )));
        }
        if self.group >= num_groups {
            return Err(ConfigError::Invalid(format!(
                "agent {agent}: group {} out of range (num_groups = {num_groups})",
                self.group
            )));
        }
        if !(self.res_trade_power > 0.0) || !(self.device_trade_power > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "agent {agent}: trade powers must be positive"
            )));
        }
        if self.invent_speed < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "agent {agent}: invent_speed must be non-negative"
            )));
        }
        for (r, row) in self.resources.iter().enumerate() {
            row.validate(&format!("agent {agent} resource {r}"))?;
        }
        Ok(())
    }
}

/// Parameters shared by every agent of a homogeneous population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentTemplate {
    pub resource: ResourceParameters,
    pub res_trade_power: f64,
    pub device_trade_power: f64,
    pub invent_speed: f64,
}

impl Default for AgentTemplate {
    fn default() -> Self {
        Self {
            resource: ResourceParameters::default(),
            res_trade_power: 1.0,
            device_trade_power: 1.0,
            invent_speed: 1.0,
        }
    }
}

impl AgentTemplate {
    /// Stamp out one agent in `group` with identical rows for every resource
    pub fn instantiate(&self, group: usize, num_resources: usize) -> AgentParameters {
        AgentParameters {
            res_trade_power: self.res_trade_power,
            device_trade_power: self.device_trade_power,
            invent_speed: self.invent_speed,
            group,
            resources: vec![self.resource.clone(); num_resources],
        }
    }
}

/// Parameters for a whole population, one entry per agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentParameterTable {
    agents: Vec<AgentParameters>,
}

impl AgentParameterTable {
    /// Build a homogeneous population, spreading agents round-robin over groups
    pub fn homogeneous(
        template: &AgentTemplate,
        num_agents: usize,
        num_resources: usize,
        num_groups: usize,
    ) -> Self {
        let groups = num_groups.max(1);
        let agents = (0..num_agents)
            .map(|a| template.instantiate(a % groups, num_resources))
            .collect();
        Self { agents }
    }

    /// Parse the comma-separated table format described in the module docs
    ///
    /// # Errors
    /// Returns `ConfigError::ParameterRow` with the 1-based line number for a
    /// malformed row and `ConfigError::Invalid` when the table runs out of rows.
    pub fn parse(
        text: &str,
        num_agents: usize,
        num_resources: usize,
    ) -> Result<Self, ConfigError> {
        let needed = num_agents * num_resources;
        let mut rows: Vec<(usize, [f64; PARAMETER_COLUMNS])> = Vec::with_capacity(needed);

        for (idx, raw) in text.lines().enumerate() {
            if rows.len() == needed {
                break;
            }
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            rows.push((idx + 1, parse_row(idx + 1, line)?));
        }

        if rows.len() < needed {
            return Err(ConfigError::Invalid(format!(
                "agent parameter table has {} rows, expected {needed} ({num_agents} agents x {num_resources} resources)",
                rows.len()
            )));
        }

        let mut agents = Vec::with_capacity(num_agents);
        for chunk in rows.chunks(num_resources.max(1)) {
            let (first_line, first) = &chunk[0];
            let group = first[13];
            if group < 0.0 || group.fract() != 0.0 {
                return Err(ConfigError::ParameterRow {
                    line: *first_line,
                    reason: format!("group must be a non-negative integer, got {group}"),
                });
            }
            agents.push(AgentParameters {
                res_trade_power: first[9],
                device_trade_power: first[10],
                invent_speed: first[11],
                group: group as usize,
                resources: chunk
                    .iter()
                    .map(|(_, cols)| ResourceParameters {
                        steepness: cols[0],
                        scaling: cols[1],
                        min_res_effort: cols[2],
                        max_res_effort: cols[3],
                        max_res_experience: cols[4],
                        min_device_effort: cols[5],
                        max_device_effort: cols[6],
                        max_device_experience: cols[7],
                        lifetime: cols[8],
                    })
                    .collect(),
            });
        }

        Ok(Self { agents })
    }

    pub fn agents(&self) -> &[AgentParameters] {
        &self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Number of agents in each group
    pub fn group_sizes(&self, num_groups: usize) -> Vec<usize> {
        let mut sizes = vec![0; num_groups];
        for agent in &self.agents {
            if let Some(slot) = sizes.get_mut(agent.group) {
                *slot += 1;
            }
        }
        sizes
    }
}

fn parse_row(line: usize, text: &str) -> Result<[f64; PARAMETER_COLUMNS], ConfigError> {
    let fields: Vec<&str> = text.split(',').map(str::trim).collect();
    if fields.len() < PARAMETER_COLUMNS {
        return Err(ConfigError::ParameterRow {
            line,
            reason: format!(
                "expected {PARAMETER_COLUMNS} columns, found {}",
                fields.len()
            ),
        });
    }

    let mut cols = [0.0; PARAMETER_COLUMNS];
    for (i, field) in fields.iter().take(PARAMETER_COLUMNS).enumerate() {
        cols[i] = field.parse::<f64>().map_err(|e| ConfigError::ParameterRow {
            line,
            reason: format!("column {}: '{field}': {e}", i + 1),
        })?;
    }
    Ok(cols)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROW: &str = "2.5, 600, 3, 9, 600, 9, 27, 40, 5, 1, 1, 1, 0, 0";

    #[test]
    fn test_parse_skips_comments_and_blank_lines() {
        let text = format!("# header\n\n{ROW}\n# mid\n{ROW}\n");
        let table = AgentParameterTable::parse(&text, 1, 2).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.agents()[0].resources.len(), 2);
    }

    #[test]
    fn test_agent_values_come_from_first_row() {
        let text = "2.5,600,3,9,600,9,27,40,5,2,3,0.5,0,1\n\
                    2.5,600,3,9,600,9,27,40,5,9,9,9,0,0\n";
        let table = AgentParameterTable::parse(text, 1, 2).unwrap();
        let agent = &table.agents()[0];
        assert_eq!(agent.res_trade_power, 2.0);
        assert_eq!(agent.device_trade_power, 3.0);
        assert_eq!(agent.invent_speed, 0.5);
        assert_eq!(agent.group, 1);
    }

    #[test]
    fn test_trailing_lines_are_ignored() {
        let text = format!("{ROW}\nhomogeneous, homogeneous, homogeneous\n");
        assert!(AgentParameterTable::parse(&text, 1, 1).is_ok());
    }

    #[test]
    fn test_short_row_reports_line_number() {
        let text = format!("# c\n{ROW}\n1, 2, 3\n");
        let err = AgentParameterTable::parse(&text, 1, 2).unwrap_err();
        match err {
            ConfigError::ParameterRow { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_rows_is_invalid() {
        let err = AgentParameterTable::parse(ROW, 2, 1).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_homogeneous_round_robin_groups() {
        let table = AgentParameterTable::homogeneous(&AgentTemplate::default(), 5, 3, 2);
        assert_eq!(table.group_sizes(2), vec![3, 2]);
    }
}
