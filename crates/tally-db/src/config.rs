//! Ledger service configuration.
//!
//! Loaded from environment variables with fallback to defaults.
//!
//! | Variable                   | Default     |
//! |----------------------------|-------------|
//! | `TALLY_DATABASE_PATH`      | `tally.db`  |
//! | `TALLY_DB_MAX_CONNECTIONS` | `5`         |
//! | `TALLY_PAYABLE_TERM_DAYS`  | `30`        |
//! | `TALLY_LOG`                | `info`      |

use serde::Serialize;
use std::env;
use std::path::PathBuf;
use tally_core::DEFAULT_PAYABLE_TERM_DAYS;

use crate::pool::DbConfig;

/// Runtime configuration for the ledger and its database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerConfig {
    /// SQLite file path (`:memory:` for a throwaway database)
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// Days until a payable created without a due date falls due
    pub payable_term_days: i64,

    /// `tracing_subscriber::EnvFilter` directive
    pub log_filter: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            database_path: PathBuf::from("tally.db"),
            max_connections: 5,
            payable_term_days: DEFAULT_PAYABLE_TERM_DAYS,
            log_filter: "info".to_string(),
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = LedgerConfig::default();

        let config = LedgerConfig {
            database_path: lookup("TALLY_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            max_connections: match lookup("TALLY_DB_MAX_CONNECTIONS") {
                Some(raw) => raw.trim().parse().map_err(|_| {
                    ConfigError::InvalidValue("TALLY_DB_MAX_CONNECTIONS".to_string())
                })?,
                None => defaults.max_connections,
            },

            payable_term_days: match lookup("TALLY_PAYABLE_TERM_DAYS") {
                Some(raw) => raw.trim().parse().map_err(|_| {
                    ConfigError::InvalidValue("TALLY_PAYABLE_TERM_DAYS".to_string())
                })?,
                None => defaults.payable_term_days,
            },

            log_filter: lookup("TALLY_LOG").unwrap_or(defaults.log_filter),
        };

        if config.max_connections == 0 {
            return Err(ConfigError::OutOfRange {
                key: "TALLY_DB_MAX_CONNECTIONS".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if config.payable_term_days < 0 {
            return Err(ConfigError::OutOfRange {
                key: "TALLY_PAYABLE_TERM_DAYS".to_string(),
                reason: "must not be negative".to_string(),
            });
        }

        Ok(config)
    }

    /// Database settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        let base = if self.database_path.as_os_str() == ":memory:" {
            DbConfig::in_memory()
        } else {
            DbConfig::new(&self.database_path).max_connections(self.max_connections)
        };
        base.payable_term_days(self.payable_term_days)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("{key} out of range: {reason}")]
    OutOfRange { key: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.payable_term_days, 30);
    }

    #[test]
    fn test_overrides() {
        let config = LedgerConfig::from_lookup(lookup(&[
            ("TALLY_DATABASE_PATH", "/var/lib/tally/store.db"),
            ("TALLY_DB_MAX_CONNECTIONS", "8"),
            ("TALLY_PAYABLE_TERM_DAYS", " 45 "),
            ("TALLY_LOG", "tally_db=debug"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/var/lib/tally/store.db"));
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.payable_term_days, 45);
        assert_eq!(config.log_filter, "tally_db=debug");

        let db = config.db_config();
        assert_eq!(db.max_connections, 8);
        assert_eq!(db.payable_term_days, 45);
    }

    #[test]
    fn test_bad_values() {
        assert!(matches!(
            LedgerConfig::from_lookup(lookup(&[("TALLY_PAYABLE_TERM_DAYS", "thirty")])),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            LedgerConfig::from_lookup(lookup(&[("TALLY_DB_MAX_CONNECTIONS", "0")])),
            Err(ConfigError::OutOfRange { .. })
        ));
        assert!(matches!(
            LedgerConfig::from_lookup(lookup(&[("TALLY_PAYABLE_TERM_DAYS", "-1")])),
            Err(ConfigError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_memory_path_uses_in_memory_pool() {
        let config =
            LedgerConfig::from_lookup(lookup(&[("TALLY_DATABASE_PATH", ":memory:")])).unwrap();
        assert!(config.db_config().is_in_memory());
    }
}
