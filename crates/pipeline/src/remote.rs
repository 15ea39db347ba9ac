//! Remote Repository Collaborator
//!
//! The pipeline never talks to a source-control host directly. Steps reach
//! the hub repository through this trait, which the application implements
//! on top of the GitHub REST API and tests implement in memory.

use std::collections::BTreeSet;

use async_trait::async_trait;

use hub_validations_core::CoreResult;

use crate::models::{ChangedFile, Label, LabelVocabulary, PullRequest};

/// Access to the hub repository and the pull request under validation.
///
/// Retries and timeouts are the implementation's concern; every error
/// returned here is treated as fatal by the step that made the call.
#[async_trait]
pub trait HubRemote: Send + Sync {
    /// Full `owner/name` of the repository this remote is bound to.
    async fn repository_name(&self) -> CoreResult<String>;

    /// Fetch a pull request by number.
    async fn pull_request(&self, number: u64) -> CoreResult<PullRequest>;

    /// Every file changed by the pull request.
    async fn list_changed_files(&self, pull_request: &PullRequest) -> CoreResult<Vec<ChangedFile>>;

    /// Download the content behind a changed file's content URL.
    async fn fetch_file_content(&self, url: &str) -> CoreResult<Vec<u8>>;

    /// Content of a file on the baseline branch, `None` when it does not exist.
    async fn fetch_baseline_file(&self, path: &str) -> CoreResult<Option<Vec<u8>>>;

    /// Names of the sub-directories of a baseline directory.
    async fn list_baseline_directories(&self, path: &str) -> CoreResult<Vec<String>>;

    /// Labels defined in the repository.
    async fn list_labels(&self) -> CoreResult<LabelVocabulary>;

    /// Attach labels and post a comment on the pull request.
    ///
    /// An empty label set leaves the pull request's labels untouched and a
    /// `None` comment posts nothing.
    async fn publish(
        &self,
        pull_request: &PullRequest,
        labels: &BTreeSet<Label>,
        comment: Option<&str>,
    ) -> CoreResult<()>;
}
