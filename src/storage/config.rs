//! JSON Configuration Management
//!
//! Loads the hub configuration from `<config-dir>/validation-config.json`,
//! resolves relative paths against the config directory, and applies the
//! environment overrides of the CI runner.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::models::config::HubConfig;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::config_path;

/// Configuration service for one hub
#[derive(Debug)]
pub struct ConfigService {
    config_dir: PathBuf,
    config: HubConfig,
}

impl ConfigService {
    /// Load the configuration of a config directory, with process
    /// environment overrides applied.
    pub fn load(config_dir: impl AsRef<Path>) -> AppResult<Self> {
        Self::load_with_env(config_dir, |name| std::env::var(name).ok())
    }

    /// Load the configuration with a custom environment lookup.
    pub fn load_with_env<F>(config_dir: impl AsRef<Path>, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_dir = config_dir.as_ref().to_path_buf();
        if !config_dir.is_dir() {
            return Err(AppError::config(format!(
                "configuration directory {} does not exist",
                config_dir.display()
            )));
        }

        let path = config_path(&config_dir);
        let mut config = Self::load_from_file(&path)?;
        config.resolve_paths(&config_dir);
        config.apply_environment(lookup);
        config.validate().map_err(AppError::config)?;

        info!(
            repository = %config.hub_repository_name,
            forecast_folder = %config.forecast_folder_name,
            automerge = config.automerge,
            "loaded hub configuration"
        );

        Ok(Self { config_dir, config })
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> AppResult<HubConfig> {
        if !path.exists() {
            return Err(AppError::config(format!(
                "configuration file {} not found",
                path.display()
            )));
        }
        debug!(path = %path.display(), "reading hub configuration");
        let content = fs::read_to_string(path)?;
        HubConfig::from_json(&content)
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &HubConfig {
        &self.config
    }

    /// Take ownership of the configuration
    pub fn into_config(self) -> HubConfig {
        self.config
    }

    /// Directory the configuration was loaded from
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// The GitHub token from the configured environment variable
    pub fn github_token<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(&self.config.github_token_environment_variable_name).filter(|token| !token.is_empty())
    }
}
