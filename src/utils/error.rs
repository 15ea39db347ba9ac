//! Application Errors
//!
//! Failures of the configuration, storage and GitHub layers. Steps convert
//! them into `CoreError` at the step boundary.

use hub_validations_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Errors raised by the pipeline or the store
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading or writing the working copy and mirror trees
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file and GitHub payloads
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML metadata errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// CSV errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GitHub API errors (unexpected status or payload)
    #[error("GitHub API error: {0}")]
    GitHub(String),

    /// A document that parsed but lacks what the reader needs
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn github(msg: impl Into<String>) -> Self {
        Self::GitHub(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

/// Steps return `CoreResult`; application failures cross that boundary here.
impl From<AppError> for CoreError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Core(core) => core,
            AppError::Config(msg) => CoreError::Config(msg),
            AppError::Io(io) => CoreError::Io(io),
            AppError::Serialization(json) => CoreError::Serialization(json),
            AppError::Yaml(e) => CoreError::parse(e.to_string()),
            AppError::Csv(e) => CoreError::parse(e.to_string()),
            AppError::Http(e) => CoreError::remote(e.to_string()),
            AppError::GitHub(msg) => CoreError::Remote(msg),
            AppError::Validation(msg) => CoreError::Validation(msg),
            AppError::NotFound(msg) => CoreError::NotFound(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::github("status 502 for /repos/a/b");
        assert_eq!(err.to_string(), "GitHub API error: status 502 for /repos/a/b");
    }

    #[test]
    fn test_yaml_error_becomes_parse_error() {
        let yaml = serde_yaml::from_str::<serde_yaml::Mapping>("a: [").unwrap_err();
        let core: CoreError = AppError::from(yaml).into();
        assert!(matches!(core, CoreError::Parse(_)));
    }

    #[test]
    fn test_missing_file_stays_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "locations.csv");
        let core: CoreError = AppError::from(io_err).into();
        assert!(matches!(core, CoreError::Io(_)));
    }

    #[test]
    fn test_core_error_round_trip() {
        let app_err: AppError = CoreError::contract("no logic").into();
        let core: CoreError = app_err.into();
        assert!(core.is_contract_violation());

        let core: CoreError = AppError::github("rate limited").into();
        assert!(matches!(core, CoreError::Remote(_)));
    }
}
