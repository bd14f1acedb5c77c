//! Dispatcher configuration
//!
//! Defaults suit an interactive session. Every field can be overridden from
//! the environment (`DispatcherConfig::from_env`) or a YAML file
//! (`DispatcherConfig::from_file`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Argument limit per command
pub const DEFAULT_MAX_ARGS: usize = 64;

/// Nesting limit for aliases that run other aliases
pub const DEFAULT_MAX_ALIAS_DEPTH: usize = 16;

/// Configuration for a `CommandDispatcher`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Interval between checks of a poll-backed pending result
    #[serde(with = "millis")]
    pub poll_interval: Duration,
    /// How often the watcher re-checks the shutdown flag while following a
    /// pending result
    #[serde(with = "millis")]
    pub wait_timeout: Duration,
    /// Captured arguments passed to a handler, at most
    pub max_args: usize,
    /// `vrun` nesting depth, at most
    pub max_alias_depth: usize,
    /// YAML file of aliases defined at construction
    pub alias_file: Option<PathBuf>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1),
            wait_timeout: Duration::from_millis(50),
            max_args: DEFAULT_MAX_ARGS,
            max_alias_depth: DEFAULT_MAX_ALIAS_DEPTH,
            alias_file: None,
        }
    }
}

impl DispatcherConfig {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            poll_interval: std::env::var("DISPATCH_POLL_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            wait_timeout: std::env::var("DISPATCH_WAIT_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.wait_timeout),
            max_args: std::env::var("DISPATCH_MAX_ARGS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_args),
            max_alias_depth: std::env::var("DISPATCH_MAX_ALIAS_DEPTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_alias_depth),
            alias_file: std::env::var("DISPATCH_ALIAS_FILE")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Load from a YAML file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            origin: format!("{:?}", path),
            source,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_alias_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.alias_file = Some(path.into());
        self
    }
}

/// Durations as integer milliseconds in config files
mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DispatcherConfig::default();
        assert_eq!(config.max_args, DEFAULT_MAX_ARGS);
        assert_eq!(config.max_alias_depth, DEFAULT_MAX_ALIAS_DEPTH);
        assert!(config.alias_file.is_none());
    }

    #[test]
    fn test_from_file_partial_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "poll_interval: 5\nmax_args: 8").unwrap();
        let config = DispatcherConfig::from_file(file.path()).unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(5));
        assert_eq!(config.max_args, 8);
        assert_eq!(config.wait_timeout, DispatcherConfig::default().wait_timeout);
    }

    #[test]
    fn test_from_file_rejects_wrong_types() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_args: lots").unwrap();
        assert!(matches!(
            DispatcherConfig::from_file(file.path()),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn test_builders() {
        let config = DispatcherConfig::default()
            .with_poll_interval(Duration::from_millis(3))
            .with_alias_file("aliases.yaml");
        assert_eq!(config.poll_interval, Duration::from_millis(3));
        assert_eq!(config.alias_file, Some(PathBuf::from("aliases.yaml")));
    }
}
