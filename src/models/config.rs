//! Hub Configuration Models
//!
//! The hub configuration is read once from `validation-config.json` in the
//! configuration directory and placed into the run store before any step
//! executes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use hub_validations_pipeline::classifier::{default_rule_definitions, FilenameRuleDefinition};
use hub_validations_pipeline::FileClassifier;

use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::resolve_against;

/// Environment variable naming the repository the workflow runs in.
pub const REPOSITORY_ENV: &str = "GITHUB_REPOSITORY";

/// Environment variable pointing at the triggering event payload.
pub const EVENT_PATH_ENV: &str = "GITHUB_EVENT_PATH";

/// Keys and value rules for model metadata documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataSchema {
    /// Keys every metadata document must contain
    #[serde(default = "default_required_keys")]
    pub required_keys: Vec<String>,
    /// Keys whose value must be a lowercase `true` or `false`
    #[serde(default = "default_boolean_keys")]
    pub boolean_keys: Vec<String>,
    /// Keys whose value must be a `YYYY-MM-DD` date
    #[serde(default = "default_date_keys")]
    pub date_keys: Vec<String>,
}

fn default_required_keys() -> Vec<String> {
    [
        "team_name",
        "model_name",
        "model_abbr",
        "model_contributors",
        "license",
        "team_model_designation",
        "methods",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_boolean_keys() -> Vec<String> {
    [
        "this_model_is_an_ensemble",
        "this_model_is_unconditional",
        "include_in_ensemble_and_visualization",
        "ensemble_of_hub_models",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_date_keys() -> Vec<String> {
    vec!["forecast_startdate".to_string()]
}

impl Default for MetadataSchema {
    fn default() -> Self {
        Self {
            required_keys: default_required_keys(),
            boolean_keys: default_boolean_keys(),
            date_keys: default_date_keys(),
        }
    }
}

/// Static configuration of one forecast hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubConfig {
    /// `owner/name` of the hub repository
    pub hub_repository_name: String,
    /// Folder holding one sub-folder per team-model
    #[serde(default = "default_forecast_folder_name")]
    pub forecast_folder_name: String,
    /// Branch the pull request merges into
    #[serde(default = "default_baseline_branch")]
    pub baseline_branch: String,
    /// Where baseline copies of modified or removed files are mirrored
    pub hub_mirrored_directory_root: PathBuf,
    /// Where the pull request's files are downloaded
    pub pull_request_directory_root: PathBuf,
    /// Ordered filename rules; derived from the forecast folder when empty
    #[serde(default)]
    pub filename_patterns: Vec<FilenameRuleDefinition>,
    /// Whether eligible pull requests get the automerge label
    #[serde(default)]
    pub automerge: bool,
    /// Licenses a model may be published under
    #[serde(default)]
    pub accepted_licenses: Vec<String>,
    /// CSV with `location` and `population` columns for value sanity checks
    #[serde(default)]
    pub population_file: Option<PathBuf>,
    /// Enforce at most one primary model per team
    #[serde(default = "default_true")]
    pub check_team_model_designation: bool,
    /// Environment variable holding the GitHub token
    #[serde(default = "default_token_variable")]
    pub github_token_environment_variable_name: String,
    #[serde(default)]
    pub metadata_schema: MetadataSchema,
}

fn default_forecast_folder_name() -> String {
    "data-processed".to_string()
}

fn default_baseline_branch() -> String {
    "master".to_string()
}

fn default_true() -> bool {
    true
}

fn default_token_variable() -> String {
    "GH_TOKEN".to_string()
}

impl HubConfig {
    /// A configuration with defaults for everything but the required fields.
    pub fn new(
        hub_repository_name: impl Into<String>,
        hub_mirrored_directory_root: impl Into<PathBuf>,
        pull_request_directory_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            hub_repository_name: hub_repository_name.into(),
            forecast_folder_name: default_forecast_folder_name(),
            baseline_branch: default_baseline_branch(),
            hub_mirrored_directory_root: hub_mirrored_directory_root.into(),
            pull_request_directory_root: pull_request_directory_root.into(),
            filename_patterns: Vec::new(),
            automerge: false,
            accepted_licenses: Vec::new(),
            population_file: None,
            check_team_model_designation: true,
            github_token_environment_variable_name: default_token_variable(),
            metadata_schema: MetadataSchema::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        let name = self.hub_repository_name.trim();
        let mut parts = name.split('/');
        let valid_name = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty()
        );
        if !valid_name {
            return Err(format!(
                "hub_repository_name must look like 'owner/name', got '{}'",
                self.hub_repository_name
            ));
        }

        if self.forecast_folder_name.trim_matches('/').is_empty() {
            return Err("forecast_folder_name cannot be empty".to_string());
        }

        if self.baseline_branch.trim().is_empty() {
            return Err("baseline_branch cannot be empty".to_string());
        }

        if self.hub_mirrored_directory_root == self.pull_request_directory_root {
            return Err(
                "hub_mirrored_directory_root and pull_request_directory_root must differ".to_string(),
            );
        }

        if self.github_token_environment_variable_name.trim().is_empty() {
            return Err("github_token_environment_variable_name cannot be empty".to_string());
        }

        if self.filename_patterns.is_empty() {
            return Ok(());
        }
        FileClassifier::from_definitions(&self.filename_patterns)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    /// Resolve relative directory and file paths against `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        self.hub_mirrored_directory_root = resolve_against(base, &self.hub_mirrored_directory_root);
        self.pull_request_directory_root = resolve_against(base, &self.pull_request_directory_root);
        if let Some(population_file) = &self.population_file {
            self.population_file = Some(resolve_against(base, population_file));
        }
    }

    /// Apply environment overrides through a lookup function.
    pub fn apply_environment<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(repository) = lookup(REPOSITORY_ENV).filter(|value| !value.trim().is_empty()) {
            self.hub_repository_name = repository;
        }
    }

    /// The filename rules in effect.
    pub fn filename_rules(&self) -> Vec<FilenameRuleDefinition> {
        if self.filename_patterns.is_empty() {
            default_rule_definitions(&self.forecast_folder_name)
        } else {
            self.filename_patterns.clone()
        }
    }

    /// Compile the file classifier for this hub.
    pub fn classifier(&self) -> AppResult<FileClassifier> {
        Ok(FileClassifier::from_definitions(&self.filename_rules())?)
    }

    /// The forecast folder without surrounding slashes.
    pub fn forecast_folder(&self) -> &str {
        self.forecast_folder_name.trim_matches('/')
    }

    /// Whether a license is accepted. An empty list accepts everything.
    pub fn accepts_license(&self, license: &str) -> bool {
        self.accepted_licenses.is_empty() || self.accepted_licenses.iter().any(|l| l == license)
    }

    /// Load and validate a configuration document.
    pub fn from_json(content: &str) -> AppResult<Self> {
        let config: HubConfig = serde_json::from_str(content)?;
        config.validate().map_err(AppError::config)?;
        Ok(config)
    }
}
