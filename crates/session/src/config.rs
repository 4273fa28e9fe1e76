//! Typed configuration for sessions and the engine.
//!
//! Settings are plain serde structs with defaults; hosts may build them in
//! code or load them from YAML:
//!
//! ```yaml
//! world_name: lobby
//! max_sessions: 4
//! default_session:
//!   tick_interval: 20
//!   duration_ticks: 1200
//! events:
//!   drop-party:
//!     tick_interval: 10
//!     strips_inventory: true
//! ```

use crate::error::SessionError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Fixed per-session configuration, snapshotted at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// External ticks between two tick-hook invocations.
    pub tick_interval: u64,
    /// Total session length in external ticks.
    pub duration_ticks: u64,
    /// Snapshot and clear every participant's inventory before start.
    pub strips_inventory: bool,
    pub can_break_blocks: bool,
    pub can_place_blocks: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: 20,
            duration_ticks: 1200,
            strips_inventory: false,
            can_break_blocks: false,
            can_place_blocks: false,
        }
    }
}

impl SessionConfig {
    pub fn new(tick_interval: u64, duration_ticks: u64) -> Self {
        Self {
            tick_interval,
            duration_ticks,
            ..Self::default()
        }
    }

    pub fn stripping_inventory(mut self) -> Self {
        self.strips_inventory = true;
        self
    }

    pub fn allowing_block_edits(mut self) -> Self {
        self.can_break_blocks = true;
        self.can_place_blocks = true;
        self
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.tick_interval == 0 {
            return Err(SessionError::InvalidConfig(
                "tick_interval must be at least 1".into(),
            ));
        }
        if self.duration_ticks == 0 {
            return Err(SessionError::InvalidConfig(
                "duration_ticks must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Name under which the world record is persisted.
    pub world_name: String,
    /// Admission limit on concurrently active sessions. `None` is unlimited.
    pub max_sessions: Option<usize>,
    /// Flush queued persistence writes at the end of every tick.
    pub flush_every_tick: bool,
    pub default_session: SessionConfig,
    /// Per-event overrides of `default_session`.
    pub events: BTreeMap<String, SessionConfig>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            world_name: "world".into(),
            max_sessions: None,
            flush_every_tick: true,
            default_session: SessionConfig::default(),
            events: BTreeMap::new(),
        }
    }
}

impl EngineSettings {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Configuration to use for a session of `event_name`.
    pub fn session_config(&self, event_name: &str) -> SessionConfig {
        self.events
            .get(event_name)
            .cloned()
            .unwrap_or_else(|| self.default_session.clone())
    }
}
