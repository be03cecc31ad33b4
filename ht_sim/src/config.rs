//! Simulation configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use holdem_table::{
    GameSettings, MAX_PLAYERS,
    entities::{Blinds, Chips},
    table::TableConfig,
};
use std::time::Duration;

/// Complete simulation configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of tables to run side by side
    pub num_tables: usize,
    /// Bots seated at each table
    pub players_per_table: usize,
    /// Pause before each bot action
    pub think_time: Duration,
    /// Bots rebuy whenever they go broke
    pub auto_rebuy: bool,
    /// Seed for the bots' decisions; random when unset
    pub seed: Option<u64>,
    /// Table defaults configuration
    pub table_defaults: TableDefaultsConfig,
}

/// Default table configuration
#[derive(Debug, Clone)]
pub struct TableDefaultsConfig {
    pub starting_stack: Chips,
    pub rebuy_amount: Chips,
    pub small_blind: Chips,
    pub big_blind: Chips,
    /// Hands per match
    pub max_rounds: u32,
    /// Seconds a bot may take before its hand is folded
    pub turn_time_limit_secs: u64,
    /// Seconds a disconnected bot keeps its seat
    pub disconnect_grace_secs: u64,
}

impl SimConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `num_tables_override` - Optional number of tables (from CLI args)
    /// * `players_override` - Optional bots per table (from CLI args)
    /// * `max_rounds_override` - Optional hands per match (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but can't be parsed
    pub fn from_env(
        num_tables_override: Option<usize>,
        players_override: Option<usize>,
        max_rounds_override: Option<u32>,
    ) -> Result<Self, ConfigError> {
        let defaults = GameSettings::default();

        let table_defaults = TableDefaultsConfig {
            starting_stack: parse_env_or("HT_STARTING_STACK", defaults.starting_stack)?,
            rebuy_amount: parse_env_or("HT_REBUY_AMOUNT", defaults.rebuy_amount)?,
            small_blind: parse_env_or("HT_SMALL_BLIND", defaults.blinds.small)?,
            big_blind: parse_env_or("HT_BIG_BLIND", defaults.blinds.big)?,
            max_rounds: match max_rounds_override {
                Some(rounds) => rounds,
                None => parse_env_or("HT_MAX_ROUNDS", defaults.max_rounds)?,
            },
            turn_time_limit_secs: parse_env_or("HT_TURN_SECS", defaults.turn_time_limit_secs)?,
            disconnect_grace_secs: parse_env_or(
                "HT_DISCONNECT_GRACE_SECS",
                holdem_table::table::config::DEFAULT_DISCONNECT_GRACE_SECS,
            )?,
        };

        Ok(SimConfig {
            num_tables: match num_tables_override {
                Some(n) => n,
                None => parse_env_or("HT_TABLES", 1)?,
            },
            players_per_table: match players_override {
                Some(n) => n,
                None => parse_env_or("HT_PLAYERS", 4)?,
            },
            think_time: Duration::from_millis(parse_env_or("HT_THINK_MS", 0)?),
            auto_rebuy: parse_env_or("HT_AUTO_REBUY", true)?,
            seed: match std::env::var("HT_SEED") {
                Ok(raw) => Some(parse_value("HT_SEED", &raw)?),
                Err(_) => None,
            },
            table_defaults,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_tables == 0 {
            return Err(ConfigError::Invalid {
                var: "HT_TABLES".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if !(2..=MAX_PLAYERS).contains(&self.players_per_table) {
            return Err(ConfigError::Invalid {
                var: "HT_PLAYERS".to_string(),
                reason: format!("Must be between 2 and {MAX_PLAYERS}"),
            });
        }

        for index in 0..self.num_tables {
            self.table_config(index)
                .validate()
                .map_err(|reason| ConfigError::Invalid {
                    var: "table settings".to_string(),
                    reason,
                })?;
        }

        Ok(())
    }

    /// Settings for the `index`th table
    pub fn table_config(&self, index: usize) -> TableConfig {
        let defaults = &self.table_defaults;
        TableConfig {
            name: format!("Table {}", index + 1),
            settings: GameSettings {
                max_players: MAX_PLAYERS,
                starting_stack: defaults.starting_stack,
                rebuy_amount: defaults.rebuy_amount,
                blinds: Blinds {
                    small: defaults.small_blind,
                    big: defaults.big_blind,
                },
                max_rounds: defaults.max_rounds,
                turn_time_limit_secs: defaults.turn_time_limit_secs,
            },
            disconnect_grace: Duration::from_secs(defaults.disconnect_grace_secs),
            ..TableConfig::default()
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not parse {var}={value:?}")]
    Unparsable { var: String, value: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Unparsable {
        var: key.to_string(),
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SimConfig {
        SimConfig {
            num_tables: 2,
            players_per_table: 4,
            think_time: Duration::ZERO,
            auto_rebuy: true,
            seed: Some(7),
            table_defaults: TableDefaultsConfig {
                starting_stack: 1000,
                rebuy_amount: 1000,
                small_blind: 10,
                big_blind: 20,
                max_rounds: 20,
                turn_time_limit_secs: 120,
                disconnect_grace_secs: 300,
            },
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Unparsable {
            var: "HT_TABLES".to_string(),
            value: "many".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("HT_TABLES"));
        assert!(msg.contains("many"));
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value::<u32>("X", " 12 ").unwrap(), 12);
        assert!(matches!(
            parse_value::<u32>("X", "twelve"),
            Err(ConfigError::Unparsable { .. })
        ));
    }

    #[test]
    fn test_valid_config_builds_table_configs() {
        let config = config();
        assert!(config.validate().is_ok());
        let table = config.table_config(1);
        assert_eq!(table.name, "Table 2");
        assert_eq!(table.settings.blinds.big, 20);
        assert_eq!(table.disconnect_grace, Duration::from_secs(300));
    }

    #[test]
    fn test_config_validation_blind_zero() {
        let mut config = config();
        config.table_defaults.small_blind = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_config_validation_player_count() {
        let mut config = config();
        config.players_per_table = 1;
        assert!(config.validate().is_err());
        config.players_per_table = MAX_PLAYERS + 1;
        assert!(config.validate().is_err());
    }
}
