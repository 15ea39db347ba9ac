//! Hub Validations - Forecast Hub Pull Request Checks
//!
//! This library validates pull requests submitted to a forecast hub repository.
//! It includes:
//! - Configuration loading and validation
//! - A GitHub REST API implementation of the hub remote
//! - The pull request validation steps, run by the pipeline crate
//! - Forecast (CSV) and metadata (YAML) document readers

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use models::config::HubConfig;
pub use services::github::GitHubRemote;
pub use services::validation::{build_pull_request_run, PullRequestSource};
pub use storage::config::ConfigService;
pub use utils::error::{AppError, AppResult};
