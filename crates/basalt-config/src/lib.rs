//! Configuration management for basalt
//!
//! The policy engine takes an explicit [`EngineSettings`] value at
//! construction. This crate produces that value for hosts, merging sources
//! in order of precedence:
//! 1. Environment variables (BASALT_* prefix, highest precedence)
//! 2. basalt.local.toml (gitignored, local overrides)
//! 3. basalt.toml (git-tracked, project config)
//! 4. ~/.config/basalt/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::{ConfigLoader, LOCAL_CONFIG_FILE, PROJECT_CONFIG_FILE};

/// Main basalt configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasaltConfig {
    pub engine: EngineSettings,
}

/// Settings handed to the policy engine at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Maximum nesting of policy sets, policy references and variable
    /// references followed during one evaluation.
    pub max_depth: usize,
    /// Answer the XACML current-time/current-date/current-dateTime
    /// environment attributes from the clock when the request lacks them.
    pub supply_current_time: bool,
    /// Record a trace of visited nodes in every response.
    pub verbose: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_depth: 64,
            supply_current_time: true,
            verbose: false,
        }
    }
}

impl EngineSettings {
    /// Checks the settings for values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::ValidationError(
                "engine.max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl BasaltConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Read exactly one TOML file, without merging other sources.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Configuration for diagnosing policies: every response carries a trace.
    pub fn diagnostic() -> Self {
        Self {
            engine: EngineSettings {
                verbose: true,
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = BasaltConfig::default();
        assert_eq!(config.engine.max_depth, 64);
        assert!(config.engine.supply_current_time);
        assert!(!config.engine.verbose);
        assert!(config.engine.validate().is_ok());
    }

    #[test]
    fn test_diagnostic_config() {
        let config = BasaltConfig::diagnostic();
        assert!(config.engine.verbose);
        assert_eq!(config.engine.max_depth, 64);
    }

    #[test]
    fn test_zero_depth_is_invalid() {
        let settings = EngineSettings {
            max_depth: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_from_toml_file() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("engine.toml");
        std::fs::write(&path, "[engine]\nmax_depth = 8\n").expect("Failed to write config");

        let config = BasaltConfig::from_toml_file(&path).expect("Failed to read config");
        assert_eq!(config.engine.max_depth, 8);
        assert!(config.engine.supply_current_time, "unset keys keep defaults");
    }

    #[test]
    fn test_from_toml_file_errors() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let missing = temp_dir.path().join("missing.toml");
        assert!(matches!(
            BasaltConfig::from_toml_file(&missing),
            Err(ConfigError::ReadError { .. })
        ));

        let broken = temp_dir.path().join("broken.toml");
        std::fs::write(&broken, "[engine\nmax_depth = ").expect("Failed to write config");
        assert!(matches!(
            BasaltConfig::from_toml_file(&broken),
            Err(ConfigError::ParseError { .. })
        ));
    }
}
