//! Simulation configuration (design §6).
//!
//! Unknown keys are deliberately ignored rather than rejected: there is no
//! `#[serde(deny_unknown_fields)]` anywhere in this module. Optional keys
//! get `#[serde(default)]`; missing *required* keys surface a [`ConfigError`]
//! with a diagnostic at parse time.

use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse simulation config: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Top-level config document: `{description?, settings: {...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub description: Option<String>,
    pub settings: SimulationConfig,
}

/// `settings` object. `simulation_steps` and `ticks_per_step` are required
/// (spec: "missing required keys abort with a diagnostic"); everything else
/// is optional with a sensible default.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SimulationConfig {
    pub simulation_steps: u64,
    pub ticks_per_step: u32,
    #[serde(default = "default_agent_num_processes")]
    pub agent_num_processes: u32,
    #[serde(default)]
    pub agent_spawns: AgentSpawns,
    #[serde(default)]
    pub checkpoint_frequency: Option<u64>,
    #[serde(default)]
    pub initial_checkpoint: Option<String>,
    #[serde(default)]
    pub statistics: Option<StatisticsConfig>,
}

fn default_agent_num_processes() -> u32 {
    1
}

/// `{groupName: {agentType: {quantity, settings?}}}`.
pub type AgentSpawns = IndexMap<String, IndexMap<String, AgentSpawnSpec>>;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AgentSpawnSpec {
    pub quantity: u32,
    #[serde(default)]
    pub settings: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct StatisticsConfig {
    #[serde(default)]
    pub start_step: u64,
    #[serde(default)]
    pub trackers: Vec<String>,
}

impl SimulationConfig {
    /// Checkpointing cadence in steps; `None` (the config key absent)
    /// disables periodic checkpointing entirely.
    pub fn checkpoint_due(&self, step: u64) -> bool {
        match self.checkpoint_frequency {
            Some(frequency) if frequency > 0 => step > 0 && step % frequency == 0,
            _ => false,
        }
    }
}

pub fn parse(raw: &str) -> Result<ConfigDocument, ConfigError> {
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_keys_are_ignored_not_rejected() {
        let raw = r#"{
            "description": "test run",
            "settings": {
                "SimulationSteps": 100,
                "TicksPerStep": 4,
                "SomeFutureKey": "ignored"
            }
        }"#;
        let doc = parse(raw).expect("unknown keys must not fail parsing");
        assert_eq!(doc.settings.simulation_steps, 100);
        assert_eq!(doc.settings.agent_num_processes, 1);
    }

    #[test]
    fn missing_required_key_is_a_diagnostic_error() {
        let raw = r#"{"settings": {"TicksPerStep": 4}}"#;
        assert!(parse(raw).is_err());
    }

    #[test]
    fn checkpoint_due_respects_frequency() {
        let mut config = minimal_config();
        config.checkpoint_frequency = Some(10);
        assert!(!config.checkpoint_due(0));
        assert!(!config.checkpoint_due(9));
        assert!(config.checkpoint_due(10));
        assert!(config.checkpoint_due(20));
    }

    #[test]
    fn no_checkpoint_frequency_never_triggers() {
        let config = minimal_config();
        assert!(!config.checkpoint_due(10));
    }

    fn minimal_config() -> SimulationConfig {
        SimulationConfig {
            simulation_steps: 10,
            ticks_per_step: 4,
            agent_num_processes: 1,
            agent_spawns: AgentSpawns::default(),
            checkpoint_frequency: None,
            initial_checkpoint: None,
            statistics: None,
        }
    }
}
