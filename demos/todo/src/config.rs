//! Configuration for the todo demo.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default confirmation delay for additions
pub const DEFAULT_ADD_DELAY: Duration = Duration::from_millis(1500);

/// Default confirmation delay for deletions
pub const DEFAULT_DELETE_DELAY: Duration = Duration::from_millis(1000);

/// Default delay before the user profile resolves
pub const DEFAULT_PROFILE_DELAY: Duration = Duration::from_millis(1500);

/// Errors raised while reading configuration
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set but could not be parsed
    #[error("invalid value {value:?} for {key}: expected {expected}")]
    Invalid {
        /// Variable name
        key: &'static str,
        /// Raw value
        value: String,
        /// What was expected
        expected: &'static str,
    },
}

/// Demo configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoConfig {
    /// Confirmation delay for additions (`TODO_ADD_DELAY_MS`)
    pub add_delay: Duration,
    /// Confirmation delay for deletions (`TODO_DELETE_DELAY_MS`)
    pub delete_delay: Duration,
    /// Delay before the user profile resolves (`TODO_PROFILE_DELAY_MS`)
    pub profile_delay: Duration,
    /// Graceful shutdown timeout (`TODO_SHUTDOWN_TIMEOUT_SECS`)
    pub shutdown_timeout: Duration,
    /// Log filter (`RUST_LOG`)
    pub log_level: String,
}

impl Default for TodoConfig {
    fn default() -> Self {
        Self {
            add_delay: DEFAULT_ADD_DELAY,
            delete_delay: DEFAULT_DELETE_DELAY,
            profile_delay: DEFAULT_PROFILE_DELAY,
            shutdown_timeout: Duration::from_secs(5),
            log_level: "info".to_string(),
        }
    }
}

impl TodoConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a variable is set to a value that
    /// is not a non-negative integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`TodoConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let millis = |key: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            parse_u64(&lookup, key, "milliseconds")
                .map(|value| value.map_or(default, Duration::from_millis))
        };

        Ok(Self {
            add_delay: millis("TODO_ADD_DELAY_MS", defaults.add_delay)?,
            delete_delay: millis("TODO_DELETE_DELAY_MS", defaults.delete_delay)?,
            profile_delay: millis("TODO_PROFILE_DELAY_MS", defaults.profile_delay)?,
            shutdown_timeout: parse_u64(&lookup, "TODO_SHUTDOWN_TIMEOUT_SECS", "seconds")?
                .map_or(defaults.shutdown_timeout, Duration::from_secs),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
        })
    }
}

fn parse_u64<F>(lookup: &F, key: &'static str, expected: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                key,
                value: raw.clone(),
                expected,
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = TodoConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, TodoConfig::default());
        assert_eq!(config.add_delay, Duration::from_millis(1500));
        assert_eq!(config.delete_delay, Duration::from_millis(1000));
    }

    #[test]
    fn reads_overrides() {
        let config = TodoConfig::from_lookup(lookup_from(&[
            ("TODO_ADD_DELAY_MS", "200"),
            ("TODO_DELETE_DELAY_MS", " 50 "),
            ("TODO_SHUTDOWN_TIMEOUT_SECS", "1"),
            ("RUST_LOG", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.add_delay, Duration::from_millis(200));
        assert_eq!(config.delete_delay, Duration::from_millis(50));
        assert_eq!(config.profile_delay, DEFAULT_PROFILE_DELAY);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn rejects_garbage() {
        let err = TodoConfig::from_lookup(lookup_from(&[("TODO_ADD_DELAY_MS", "soon")]))
            .unwrap_err();

        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "TODO_ADD_DELAY_MS",
                value: "soon".to_string(),
                expected: "milliseconds",
            }
        );
        assert!(err.to_string().contains("TODO_ADD_DELAY_MS"));
    }
}
