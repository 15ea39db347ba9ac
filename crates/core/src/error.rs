//! Core Error Types
//!
//! Defines the foundational error types shared by the hub-validations
//! workspace. Only fatal conditions are represented here: recoverable
//! validation findings travel inside step results, never as errors.

use thiserror::Error;

/// Core error type for the hub-validations workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Missing or inconsistent hub configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local file tree I/O
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Event payloads and remote JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Input that breaks an invariant of a core algorithm
    #[error("Validation error: {0}")]
    Validation(String),

    /// A pull request, label or store entry that does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unreadable forecast, metadata or event documents
    #[error("Parse error: {0}")]
    Parse(String),

    /// Remote repository errors (unreachable host, bad status, bad payload)
    #[error("Remote error: {0}")]
    Remote(String),

    /// Pipeline contract violations (step without logic, malformed result,
    /// store type mismatch). Always aborts the run.
    #[error("Contract violation: {0}")]
    Contract(String),

    /// Anything else that should never happen
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }

    pub fn contract(msg: impl Into<String>) -> Self {
        Self::Contract(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error is a pipeline contract violation.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::Contract(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::config("missing hub_repository_name");
        assert_eq!(
            err.to_string(),
            "Configuration error: missing hub_repository_name"
        );
    }

    #[test]
    fn test_event_payload_error_converts() {
        let err: CoreError = serde_json::from_str::<u64>("{").unwrap_err().into();
        assert!(matches!(err, CoreError::Serialization(_)));
        assert!(err.to_string().starts_with("Serialization error"));
    }

    #[test]
    fn test_contract_violation() {
        let err = CoreError::contract("step 'download' has no logic");
        assert!(err.is_contract_violation());
        assert_eq!(
            err.to_string(),
            "Contract violation: step 'download' has no logic"
        );
        assert!(!CoreError::internal("x").is_contract_violation());
    }
}
