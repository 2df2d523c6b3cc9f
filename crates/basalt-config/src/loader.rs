//! Configuration loader with multi-source merging

use crate::BasaltConfig;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::env;
use std::path::{Path, PathBuf};

/// Project config file, tracked in git.
pub const PROJECT_CONFIG_FILE: &str = "basalt.toml";
/// Local overrides, gitignored.
pub const LOCAL_CONFIG_FILE: &str = "basalt.local.toml";

/// ~/.config/basalt/config.toml, or the platform equivalent.
fn user_config_file() -> Option<PathBuf> {
    ProjectDirs::from("dev", "Basalt", "basalt").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    include_user_config: bool,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "BASALT".to_string(),
            include_user_config: true,
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "BASALT")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Skip ~/.config/basalt/config.toml
    pub fn without_user_config(mut self) -> Self {
        self.include_user_config = false;
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<BasaltConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = BasaltConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. User config, 3. project config, 4. local config
        let user = self
            .include_user_config
            .then(user_config_file)
            .flatten();
        let files = user.into_iter().chain([
            self.project_dir.join(PROJECT_CONFIG_FILE),
            self.project_dir.join(LOCAL_CONFIG_FILE),
        ]);
        for file in files.filter(|file| file.exists()) {
            builder = builder.add_source(
                config::File::from(file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 5. Environment variables (BASALT_ENGINE__MAX_DEPTH=...)
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // Build and deserialize
        let config = builder.build().context("Failed to build configuration")?;

        let basalt_config: BasaltConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        basalt_config
            .engine
            .validate()
            .context("Configuration failed validation")?;

        Ok(basalt_config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default(self) -> BasaltConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
