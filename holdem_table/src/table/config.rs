//! Table configuration models.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::game::GameSettings;

/// Default seconds a disconnected player keeps their seat.
pub const DEFAULT_DISCONNECT_GRACE_SECS: u64 = 300;

/// Table configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Table name
    pub name: String,

    /// Engine settings (seats, stacks, blinds, round cap, turn limit)
    pub settings: GameSettings,

    /// How often the actor checks the turn clock
    pub tick_interval: Duration,

    /// How long a disconnected player keeps their seat before eviction
    pub disconnect_grace: Duration,

    /// Deal as soon as enough players are ready
    pub auto_start: bool,

    /// Capacity of the actor's message inbox
    pub inbox_capacity: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: "Default Table".to_string(),
            settings: GameSettings::default(),
            tick_interval: Duration::from_secs(1),
            disconnect_grace: Duration::from_secs(DEFAULT_DISCONNECT_GRACE_SECS),
            auto_start: true,
            inbox_capacity: 100,
        }
    }
}

impl TableConfig {
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Table name must not be empty".to_string());
        }

        if self.tick_interval.is_zero() {
            return Err("Tick interval must be positive".to_string());
        }

        if self.inbox_capacity == 0 {
            return Err("Inbox capacity must be positive".to_string());
        }

        self.settings.validate()
    }

    /// Get action timeout in seconds
    pub fn action_timeout_secs(&self) -> u64 {
        self.settings.turn_time_limit_secs
    }
}
