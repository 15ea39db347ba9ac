//! Shared fixtures for the integration tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use hub_validations::{build_pull_request_run, HubConfig, PullRequestSource};
use hub_validations_core::{CoreError, CoreResult};
use hub_validations_pipeline::{
    label_names, ChangedFile, FileStatus, HubRemote, Label, LabelVocabulary, PullRequest, RunOutcome,
};

pub const PR_NUMBER: u64 = 42;

/// What the run handed to the remote when publishing.
#[derive(Debug, Clone)]
pub struct Publication {
    pub labels: BTreeSet<String>,
    pub comment: Option<String>,
}

/// A hub remote held in memory that records what gets published.
pub struct RecordingRemote {
    repository: String,
    changed_files: Vec<ChangedFile>,
    contents: BTreeMap<String, Vec<u8>>,
    baseline: BTreeMap<String, Vec<u8>>,
    published: Mutex<Vec<Publication>>,
}

impl RecordingRemote {
    pub fn new(repository: &str) -> Self {
        Self {
            repository: repository.to_string(),
            changed_files: Vec::new(),
            contents: BTreeMap::new(),
            baseline: BTreeMap::new(),
            published: Mutex::new(Vec::new()),
        }
    }

    pub fn with_file(mut self, path: &str, status: FileStatus, content: &str) -> Self {
        let url = format!("memory://{}", path);
        self.contents.insert(url.clone(), content.as_bytes().to_vec());
        self.changed_files.push(ChangedFile::new(path, status, url));
        self
    }

    pub fn with_baseline(mut self, path: &str, content: &str) -> Self {
        self.baseline.insert(path.to_string(), content.as_bytes().to_vec());
        self
    }

    pub fn publications(&self) -> Vec<Publication> {
        self.published.lock().unwrap().clone()
    }

    /// The single publication of a run.
    pub fn publication(&self) -> Publication {
        let publications = self.publications();
        assert_eq!(publications.len(), 1, "expected exactly one publication");
        publications[0].clone()
    }
}

#[async_trait]
impl HubRemote for RecordingRemote {
    async fn repository_name(&self) -> CoreResult<String> {
        Ok(self.repository.clone())
    }

    async fn pull_request(&self, number: u64) -> CoreResult<PullRequest> {
        if number != PR_NUMBER {
            return Err(CoreError::not_found(format!("pull request {}", number)));
        }
        let mut pull_request = PullRequest::new(number);
        pull_request.title = "Forecast submission".to_string();
        Ok(pull_request)
    }

    async fn list_changed_files(&self, _pull_request: &PullRequest) -> CoreResult<Vec<ChangedFile>> {
        Ok(self.changed_files.clone())
    }

    async fn fetch_file_content(&self, url: &str) -> CoreResult<Vec<u8>> {
        self.contents
            .get(url)
            .cloned()
            .ok_or_else(|| CoreError::remote(format!("no content at {}", url)))
    }

    async fn fetch_baseline_file(&self, path: &str) -> CoreResult<Option<Vec<u8>>> {
        Ok(self.baseline.get(path).cloned())
    }

    async fn list_baseline_directories(&self, path: &str) -> CoreResult<Vec<String>> {
        let prefix = format!("{}/", path);
        let dirs: BTreeSet<String> = self
            .baseline
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter_map(|rest| rest.split_once('/').map(|(dir, _)| dir.to_string()))
            .collect();
        Ok(dirs.into_iter().collect())
    }

    async fn list_labels(&self) -> CoreResult<LabelVocabulary> {
        Ok(LabelVocabulary::from_names([
            label_names::AUTOMERGE,
            label_names::CODE,
            label_names::DATA_SUBMISSION,
            label_names::DEPENDENCIES,
            label_names::DUPLICATE_FORECAST,
            label_names::FILE_DELETION,
            label_names::FORECAST_IMPLICIT_RETRACTIONS,
            label_names::FORECAST_RETRACTION,
            label_names::FORECAST_UPDATED,
            label_names::METADATA_CHANGE,
            label_names::NEW_TEAM_SUBMISSION,
            label_names::OTHER_FILES_UPDATED,
            label_names::PASSED_VALIDATION,
        ]))
    }

    async fn publish(
        &self,
        _pull_request: &PullRequest,
        labels: &BTreeSet<Label>,
        comment: Option<&str>,
    ) -> CoreResult<()> {
        self.published.lock().unwrap().push(Publication {
            labels: labels.iter().map(|label| label.name.clone()).collect(),
            comment: comment.map(str::to_string),
        });
        Ok(())
    }
}

/// Configuration rooted in a temporary directory.
pub fn hub_config(temp: &TempDir) -> HubConfig {
    let mut config = HubConfig::new("owner/hub", temp.path().join("mirror"), temp.path().join("pull-request"));
    config.automerge = true;
    config
}

/// Run every validation step for `PR_NUMBER`.
pub async fn run(config: HubConfig, remote: Arc<RecordingRemote>) -> CoreResult<RunOutcome> {
    let mut validation = build_pull_request_run(config, remote, PullRequestSource::Number(PR_NUMBER))
        .map_err(CoreError::from)?;
    validation.run().await
}

pub fn labels(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}

pub const HEADER: &str = "forecast_date,target,target_end_date,location,type,quantile,value\n";

/// A well-formed forecast with one point row per `(location, value)`.
pub fn forecast(date: &str, rows: &[(&str, &str)]) -> String {
    let mut content = HEADER.to_string();
    for (location, value) in rows {
        content.push_str(&format!("{},1 wk ahead inc death,2022-03-12,{},point,NA,{}\n", date, location, value));
    }
    content
}

/// Metadata for a team-model with the given designation.
pub fn metadata(model_abbr: &str, designation: &str) -> String {
    let model_name = model_abbr.split_once('-').map(|(_, model)| model).unwrap_or(model_abbr);
    format!(
        "team_name: Team\n\
         model_name: {}\n\
         model_abbr: {}\n\
         model_contributors: Someone <someone@example.com>\n\
         license: cc-by-4.0\n\
         team_model_designation: {}\n\
         methods: A model.\n\
         this_model_is_an_ensemble: false\n",
        model_name, model_abbr, designation
    )
}
