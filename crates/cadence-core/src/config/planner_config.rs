//! Planner configuration file support.
//!
//! Configuration is layered: built-in defaults, then the global file
//! (`~/.cadence/config.toml`), then the local file (`./.cadence.toml`), then
//! `CADENCE_*` environment variables.

use crate::models::ValueFactors;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Environment variable overriding `max_item_size`.
pub const ENV_MAX_ITEM_SIZE: &str = "CADENCE_MAX_ITEM_SIZE";

/// Environment variable overriding `cycle_policy`.
pub const ENV_CYCLE_POLICY: &str = "CADENCE_CYCLE_POLICY";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}")]
    ReadError(String),

    /// Failed to parse configuration file.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// What the orchestrator does when Hard dependencies form a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// Halt the run and report every cycle.
    #[default]
    Abort,

    /// Downgrade the edges on each cycle to Soft and continue.
    SoftFallback,
}

impl FromStr for CyclePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "abort" => Ok(Self::Abort),
            "soft_fallback" => Ok(Self::SoftFallback),
            other => Err(ConfigError::InvalidValue(format!("unknown cycle policy '{other}'"))),
        }
    }
}

impl fmt::Display for CyclePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abort => f.write_str("abort"),
            Self::SoftFallback => f.write_str("soft_fallback"),
        }
    }
}

/// Which built-in edge inferencers are enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Text keyword inferencer ("depends on", "blocked by", ...).
    #[serde(default = "default_true")]
    pub keywords: bool,

    /// Enabler-first ordering within shared components.
    #[serde(default = "default_true")]
    pub shared_components: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            keywords: true,
            shared_components: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_item_size() -> u32 {
    5
}

fn default_max_split_children() -> usize {
    crate::planning::decomposer::DEFAULT_MAX_SPLIT_CHILDREN
}

/// Tunables for one planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Decomposition threshold and readiness size limit.
    #[serde(default = "default_max_item_size")]
    pub max_item_size: u32,

    /// Hard ceiling on children per split
    #[serde(default = "default_max_split_children")]
    pub max_split_children: usize,

    /// Demote items below their Hard predecessors when ranking.
    #[serde(default = "default_true")]
    pub dependency_aware_priority: bool,

    /// Reaction to Hard cycles.
    #[serde(default)]
    pub cycle_policy: CyclePolicy,

    /// Factors used for items the caller did not score.
    #[serde(default)]
    pub default_value_factors: ValueFactors,

    /// Built-in inferencers
    #[serde(default)]
    pub inference: InferenceConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_item_size: default_max_item_size(),
            max_split_children: default_max_split_children(),
            dependency_aware_priority: true,
            cycle_policy: CyclePolicy::default(),
            default_value_factors: ValueFactors::default(),
            inference: InferenceConfig::default(),
        }
    }
}

impl PlannerConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let table = read_table(path)?;
        toml::Value::Table(table)
            .try_into()
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
    }

    /// Get default global configuration file path.
    pub fn default_global_path() -> PathBuf {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".cadence")
            .join("config.toml")
    }

    /// Get default local configuration file path.
    pub fn default_local_path() -> PathBuf {
        PathBuf::from(".cadence.toml")
    }

    /// Discover and load configuration files, then apply environment overrides.
    ///
    /// Missing files are skipped; keys in the local file override the global
    /// file key by key.
    pub fn discover_and_load() -> Result<Self> {
        let mut config =
            Self::load_layered(&[Self::default_global_path(), Self::default_local_path()])?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Merge the files that exist in `paths`, later files overriding earlier ones.
    pub fn load_layered(paths: &[PathBuf]) -> Result<Self> {
        let mut merged = toml::Table::new();
        for path in paths {
            match read_table(path) {
                Ok(table) => {
                    debug!(path = %path.display(), "loaded planner configuration");
                    merge_tables(&mut merged, table);
                }
                Err(ConfigError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        toml::Value::Table(merged)
            .try_into()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Apply `CADENCE_*` environment overrides.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<()> {
        if let Some(value) = lookup(ENV_MAX_ITEM_SIZE) {
            self.max_item_size = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("{ENV_MAX_ITEM_SIZE}={value}")))?;
        }
        if let Some(value) = lookup(ENV_CYCLE_POLICY) {
            self.cycle_policy = value.parse()?;
        }
        Ok(())
    }

    /// Reject values the planner cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_item_size == 0 {
            return Err(ConfigError::InvalidValue("max_item_size must be positive".into()));
        }
        if self.max_split_children < 2 {
            return Err(ConfigError::InvalidValue("max_split_children must be at least 2".into()));
        }
        if let Some(factor) = self.default_value_factors.first_invalid() {
            return Err(ConfigError::InvalidValue(format!(
                "default_value_factors.{factor} must be positive"
            )));
        }
        Ok(())
    }
}

fn read_table(path: &Path) -> Result<toml::Table> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
    content
        .parse::<toml::Table>()
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
}

/// Recursive key-by-key overlay of `overlay` onto `base`.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                merge_tables(existing, nested);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = PlannerConfig::default();
        assert_eq!(config.max_item_size, 5);
        assert_eq!(config.max_split_children, 6);
        assert!(config.dependency_aware_priority);
        assert_eq!(config.cycle_policy, CyclePolicy::Abort);
        assert!(config.inference.keywords && config.inference.shared_components);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_str() {
        let config = PlannerConfig::from_toml_str(
            r#"
            max_item_size = 8
            cycle_policy = "soft_fallback"

            [inference]
            keywords = false
            "#,
        )
        .unwrap();

        assert_eq!(config.max_item_size, 8);
        assert_eq!(config.cycle_policy, CyclePolicy::SoftFallback);
        assert!(!config.inference.keywords);
        assert!(config.inference.shared_components);
        assert_eq!(config.max_split_children, 6);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "max_split_children = 8\n").unwrap();

        let config = PlannerConfig::load_from_file(&path).unwrap();
        assert_eq!(config.max_split_children, 8);

        let missing = temp_dir.path().join("missing.toml");
        assert!(matches!(
            PlannerConfig::load_from_file(&missing),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_layered_local_overrides_global() {
        let temp_dir = TempDir::new().unwrap();
        let global = temp_dir.path().join("global.toml");
        let local = temp_dir.path().join("local.toml");
        std::fs::write(
            &global,
            "max_item_size = 8\n[inference]\nkeywords = false\nshared_components = false\n",
        )
        .unwrap();
        std::fs::write(
            &local,
            "max_item_size = 3\n[inference]\nshared_components = true\n",
        )
        .unwrap();

        let absent = temp_dir.path().join("absent.toml");
        let config = PlannerConfig::load_layered(&[global, local, absent]).unwrap();
        assert_eq!(config.max_item_size, 3);
        assert!(!config.inference.keywords);
        assert!(config.inference.shared_components);
    }

    #[test]
    fn test_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.toml");
        std::fs::write(&path, "max_item_size = \"five\"\n").unwrap();
        assert!(matches!(
            PlannerConfig::load_from_file(&path),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> =
            HashMap::from([(ENV_MAX_ITEM_SIZE, "13"), (ENV_CYCLE_POLICY, "soft-fallback")]);
        let mut config = PlannerConfig::default();
        config.apply_overrides_from(|key| vars.get(key).map(ToString::to_string)).unwrap();

        assert_eq!(config.max_item_size, 13);
        assert_eq!(config.cycle_policy, CyclePolicy::SoftFallback);

        let mut config = PlannerConfig::default();
        let err = config
            .apply_overrides_from(|key| (key == ENV_MAX_ITEM_SIZE).then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_validate() {
        let config = PlannerConfig {
            max_item_size: 0,
            ..PlannerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PlannerConfig {
            max_split_children: 1,
            ..PlannerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PlannerConfig {
            default_value_factors: ValueFactors::new(1.0, 0.0, 1.0),
            ..PlannerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
