//! GitHub REST Remote
//!
//! `HubRemote` implementation on top of the GitHub REST API v3. All requests
//! are bound to one repository; baseline reads go to the configured branch.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use hub_validations_core::CoreResult;
use hub_validations_pipeline::{ChangedFile, FileStatus, HubRemote, Label, LabelVocabulary, PullRequest};

use crate::utils::error::{AppError, AppResult};

/// Public GitHub API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const PER_PAGE: usize = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const USER_AGENT: &str = concat!("hub-validations/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct RepositoryPayload {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct PullRequestPayload {
    number: u64,
    #[serde(default)]
    title: String,
    head: HeadPayload,
}

#[derive(Debug, Deserialize)]
struct HeadPayload {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct FilePayload {
    filename: String,
    status: FileStatus,
    #[serde(default)]
    raw_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LabelPayload {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ContentPayload {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    #[serde(default)]
    sha: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BlobPayload {
    content: String,
}

impl From<PullRequestPayload> for PullRequest {
    fn from(payload: PullRequestPayload) -> Self {
        PullRequest {
            number: payload.number,
            title: payload.title,
            head_sha: payload.head.sha,
        }
    }
}

impl From<FilePayload> for ChangedFile {
    fn from(payload: FilePayload) -> Self {
        ChangedFile::new(payload.filename, payload.status, payload.raw_url.unwrap_or_default())
    }
}

/// Decode a base64 payload as returned by the contents and blob APIs, which
/// wrap lines.
fn decode_content(encoded: &str) -> AppResult<Vec<u8>> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| AppError::github(format!("invalid base64 content: {}", e)))
}

// ============================================================================
// Client
// ============================================================================

/// GitHub remote for one hub repository.
pub struct GitHubRemote {
    client: reqwest::Client,
    api_url: String,
    repository: String,
    baseline_branch: String,
    token: Option<String>,
}

impl GitHubRemote {
    pub fn new(
        repository: impl Into<String>,
        baseline_branch: impl Into<String>,
        token: Option<String>,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_url: DEFAULT_API_URL.to_string(),
            repository: repository.into(),
            baseline_branch: baseline_branch.into(),
            token,
        })
    }

    /// Point the client at another API endpoint (GitHub Enterprise).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    fn repo_url(&self, path: &str) -> String {
        if path.is_empty() {
            format!("{}/repos/{}", self.api_url, self.repository)
        } else {
            format!("{}/repos/{}/{}", self.api_url, self.repository, path.trim_start_matches('/'))
        }
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}?ref={}",
            self.repo_url(&format!("contents/{}", path.trim_matches('/'))),
            self.baseline_branch
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check(response: Response) -> AppResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let url = response.url().path().to_string();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::github(format!("HTTP {} for {}: {}", status, url, body)))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> AppResult<T> {
        debug!(url, "GET");
        let response = self.request(Method::GET, url).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// GET that maps 404 to `None`.
    async fn get_optional_json<T: DeserializeOwned>(&self, url: &str) -> AppResult<Option<T>> {
        debug!(url, "GET");
        let response = self.request(Method::GET, url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::check(response).await?.json().await?))
    }

    async fn get_paginated<T: DeserializeOwned>(&self, path: &str) -> AppResult<Vec<T>> {
        let mut items = Vec::new();
        for page in 1.. {
            let url = format!("{}?per_page={}&page={}", self.repo_url(path), PER_PAGE, page);
            let batch: Vec<T> = self.get_json(&url).await?;
            let done = batch.len() < PER_PAGE;
            items.extend(batch);
            if done {
                break;
            }
        }
        Ok(items)
    }

    async fn fetch_repository_name(&self) -> AppResult<String> {
        let payload: RepositoryPayload = self.get_json(&self.repo_url("")).await?;
        Ok(payload.full_name)
    }

    async fn fetch_pull_request(&self, number: u64) -> AppResult<PullRequest> {
        let payload: Option<PullRequestPayload> = self
            .get_optional_json(&self.repo_url(&format!("pulls/{}", number)))
            .await?;
        payload
            .map(PullRequest::from)
            .ok_or_else(|| AppError::not_found(format!("pull request #{} in {}", number, self.repository)))
    }

    async fn fetch_changed_files(&self, pull_request: &PullRequest) -> AppResult<Vec<ChangedFile>> {
        let files: Vec<FilePayload> = self
            .get_paginated(&format!("pulls/{}/files", pull_request.number))
            .await?;
        Ok(files.into_iter().map(ChangedFile::from).collect())
    }

    async fn download(&self, url: &str) -> AppResult<Vec<u8>> {
        if url.is_empty() {
            return Err(AppError::github("changed file has no download URL"));
        }
        debug!(url, "download");
        let builder = self.client.get(url);
        let builder = match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };
        let response = Self::check(builder.send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn fetch_baseline(&self, path: &str) -> AppResult<Option<Vec<u8>>> {
        let Some(payload) = self.get_optional_json::<ContentPayload>(&self.contents_url(path)).await? else {
            return Ok(None);
        };
        if payload.kind != "file" {
            return Err(AppError::github(format!("{} is a {}, not a file", path, payload.kind)));
        }

        match (payload.content.as_deref(), payload.sha.as_deref()) {
            (Some(content), _) if !content.is_empty() => Ok(Some(decode_content(content)?)),
            // Files over 1 MB come back without inline content.
            (_, Some(sha)) => {
                let blob: BlobPayload = self.get_json(&self.repo_url(&format!("git/blobs/{}", sha))).await?;
                Ok(Some(decode_content(&blob.content)?))
            }
            _ => Ok(Some(Vec::new())),
        }
    }

    async fn fetch_directories(&self, path: &str) -> AppResult<Vec<String>> {
        let entries: Vec<ContentPayload> = self
            .get_optional_json(&self.contents_url(path))
            .await?
            .unwrap_or_default();
        Ok(entries
            .into_iter()
            .filter(|entry| entry.kind == "dir")
            .map(|entry| entry.name)
            .collect())
    }

    async fn fetch_labels(&self) -> AppResult<LabelVocabulary> {
        let labels: Vec<LabelPayload> = self.get_paginated("labels").await?;
        Ok(LabelVocabulary::from_names(labels.into_iter().map(|l| l.name)))
    }

    async fn post_results(
        &self,
        pull_request: &PullRequest,
        labels: &BTreeSet<Label>,
        comment: Option<&str>,
    ) -> AppResult<()> {
        if !labels.is_empty() {
            let names: Vec<&str> = labels.iter().map(|l| l.name.as_str()).collect();
            let url = self.repo_url(&format!("issues/{}/labels", pull_request.number));
            let response = self
                .request(Method::PUT, &url)
                .json(&serde_json::json!({ "labels": names }))
                .send()
                .await?;
            Self::check(response).await?;
            info!(pull_request = pull_request.number, labels = ?names, "labels set");
        }

        if let Some(body) = comment {
            let url = self.repo_url(&format!("issues/{}/comments", pull_request.number));
            let response = self
                .request(Method::POST, &url)
                .json(&serde_json::json!({ "body": body }))
                .send()
                .await?;
            Self::check(response).await?;
            info!(pull_request = pull_request.number, "comment posted");
        }
        Ok(())
    }
}

#[async_trait]
impl HubRemote for GitHubRemote {
    async fn repository_name(&self) -> CoreResult<String> {
        Ok(self.fetch_repository_name().await?)
    }

    async fn pull_request(&self, number: u64) -> CoreResult<PullRequest> {
        Ok(self.fetch_pull_request(number).await?)
    }

    async fn list_changed_files(&self, pull_request: &PullRequest) -> CoreResult<Vec<ChangedFile>> {
        Ok(self.fetch_changed_files(pull_request).await?)
    }

    async fn fetch_file_content(&self, url: &str) -> CoreResult<Vec<u8>> {
        Ok(self.download(url).await?)
    }

    async fn fetch_baseline_file(&self, path: &str) -> CoreResult<Option<Vec<u8>>> {
        Ok(self.fetch_baseline(path).await?)
    }

    async fn list_baseline_directories(&self, path: &str) -> CoreResult<Vec<String>> {
        Ok(self.fetch_directories(path).await?)
    }

    async fn list_labels(&self) -> CoreResult<LabelVocabulary> {
        Ok(self.fetch_labels().await?)
    }

    async fn publish(
        &self,
        pull_request: &PullRequest,
        labels: &BTreeSet<Label>,
        comment: Option<&str>,
    ) -> CoreResult<()> {
        Ok(self.post_results(pull_request, labels, comment).await?)
    }
}
