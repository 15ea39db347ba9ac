//! Repository connection and pull request resolution.

use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use hub_validations_core::{CoreError, CoreResult, Store};
use hub_validations_pipeline::keys::{POSSIBLE_LABELS, PULL_REQUEST};
use hub_validations_pipeline::{Step, StepResult};

use super::keys::PULL_REQUEST_SOURCE;
use super::{config, remote};

/// Where the number of the pull request under validation comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullRequestSource {
    /// Given explicitly, e.g. on the command line
    Number(u64),
    /// A workflow event payload on disk
    EventFile(PathBuf),
}

#[derive(Debug, Deserialize)]
struct EventPayload {
    #[serde(default)]
    number: Option<u64>,
    #[serde(default)]
    pull_request: Option<EventPullRequest>,
}

#[derive(Debug, Deserialize)]
struct EventPullRequest {
    number: u64,
}

/// Pull request number from an event payload (`number`, or `pull_request.number`).
pub fn event_pull_request_number(payload: &str) -> CoreResult<u64> {
    let event: EventPayload = serde_json::from_str(payload)?;
    event
        .number
        .or(event.pull_request.map(|pr| pr.number))
        .ok_or_else(|| CoreError::parse("event payload carries no pull request number"))
}

impl PullRequestSource {
    pub fn resolve(&self) -> CoreResult<u64> {
        match self {
            PullRequestSource::Number(number) => Ok(*number),
            PullRequestSource::EventFile(path) => {
                let payload = fs::read_to_string(path).map_err(|e| {
                    CoreError::config(format!("cannot read event file {}: {}", path.display(), e))
                })?;
                event_pull_request_number(&payload)
            }
        }
    }
}

/// Binds the run to the configured repository and loads its labels.
pub struct EstablishConnection;

#[async_trait]
impl Step for EstablishConnection {
    async fn execute(&self, store: &Store) -> CoreResult<StepResult> {
        let config = config(store)?;
        let remote = remote(store)?;

        let repository = remote.repository_name().await?;
        if !repository.eq_ignore_ascii_case(&config.hub_repository_name) {
            return Err(CoreError::config(format!(
                "connected to {}, expected {}",
                repository, config.hub_repository_name
            )));
        }

        let labels = remote.list_labels().await?;
        info!(repository = %repository, labels = labels.len(), "connected to hub repository");

        Ok(StepResult::passed().with_store(POSSIBLE_LABELS, labels))
    }
}

/// Fetches the pull request under validation.
pub struct ExtractPullRequest;

#[async_trait]
impl Step for ExtractPullRequest {
    async fn execute(&self, store: &Store) -> CoreResult<StepResult> {
        let number = store.require(PULL_REQUEST_SOURCE)?.resolve()?;
        let pull_request = remote(store)?.pull_request(number).await?;
        info!(pull_request = pull_request.number, title = %pull_request.title, "using pull request");

        Ok(StepResult::passed().with_store(PULL_REQUEST, pull_request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::validation::testing::{fixture, FakeRemote};
    use hub_validations_pipeline::PullRequest;

    #[test]
    fn test_event_number() {
        assert_eq!(event_pull_request_number(r#"{"number": 12, "action": "opened"}"#).unwrap(), 12);
        assert_eq!(
            event_pull_request_number(r#"{"pull_request": {"number": 7}}"#).unwrap(),
            7
        );
        assert!(event_pull_request_number(r#"{"action": "push"}"#).is_err());
    }

    #[test]
    fn test_event_file_source() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("event.json");
        fs::write(&path, r#"{"number": 31}"#).unwrap();

        assert_eq!(PullRequestSource::EventFile(path).resolve().unwrap(), 31);
        let missing = PullRequestSource::EventFile(temp.path().join("absent.json"));
        assert!(matches!(missing.resolve().unwrap_err(), CoreError::Config(_)));
    }

    #[tokio::test]
    async fn test_establish_connection_loads_labels() {
        let fixture = fixture(FakeRemote::new("Owner/Hub"));
        let result = EstablishConnection.execute(&fixture.store).await.unwrap();
        assert!(result.success);
        assert_eq!(result.store_updates.names(), vec!["possible_labels"]);
    }

    #[tokio::test]
    async fn test_establish_connection_rejects_other_repository() {
        let fixture = fixture(FakeRemote::new("someone/else"));
        let err = EstablishConnection.execute(&fixture.store).await.unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[tokio::test]
    async fn test_extract_pull_request() {
        let mut remote = FakeRemote::new("owner/hub");
        remote.pull_request = PullRequest::new(5);
        let mut fixture = fixture(remote);
        fixture.store.insert(PULL_REQUEST_SOURCE, PullRequestSource::Number(5));

        let result = ExtractPullRequest.execute(&fixture.store).await.unwrap();
        assert!(result.success);
        assert_eq!(result.store_updates.names(), vec!["pull_request"]);
    }
}
