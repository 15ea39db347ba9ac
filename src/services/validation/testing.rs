//! In-memory remote and store fixtures for step tests.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use hub_validations_core::{CoreError, CoreResult, Store};
use hub_validations_pipeline::keys::{CLASSIFIED_FILES, POSSIBLE_LABELS, PULL_REQUEST, REMOTE};
use hub_validations_pipeline::{
    label_names, ChangedFile, FileStatus, HubRemote, Label, LabelVocabulary, PullRequest,
};

use crate::models::config::HubConfig;
use crate::storage::files::write_file;
use crate::utils::paths::local_path;

use super::keys::{CONFIG, FILE_CLASSIFIER};

pub const ALL_LABELS: [&str; 13] = [
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
];

pub struct FakeRemote {
    pub repository: String,
    pub pull_request: PullRequest,
    pub changed_files: Vec<ChangedFile>,
    /// Pull request file contents by content URL
    pub contents: BTreeMap<String, Vec<u8>>,
    /// Baseline branch files by repository path
    pub baseline: BTreeMap<String, Vec<u8>>,
    pub labels: Vec<String>,
}

impl FakeRemote {
    pub fn new(repository: &str) -> Self {
        Self {
            repository: repository.to_string(),
            pull_request: PullRequest::new(1),
            changed_files: Vec::new(),
            contents: BTreeMap::new(),
            baseline: BTreeMap::new(),
            labels: ALL_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_file(mut self, path: &str, status: FileStatus, content: &str) -> Self {
        let url = format!("fake://{}", path);
        if status.is_present() {
            self.contents.insert(url.clone(), content.as_bytes().to_vec());
        }
        self.changed_files.push(ChangedFile::new(path, status, url));
        self
    }

    pub fn with_baseline(mut self, path: &str, content: &str) -> Self {
        self.baseline.insert(path.to_string(), content.as_bytes().to_vec());
        self
    }
}

#[async_trait]
impl HubRemote for FakeRemote {
    async fn repository_name(&self) -> CoreResult<String> {
        Ok(self.repository.clone())
    }

    async fn pull_request(&self, number: u64) -> CoreResult<PullRequest> {
        if number == self.pull_request.number {
            Ok(self.pull_request.clone())
        } else {
            Err(CoreError::not_found(format!("pull request {}", number)))
        }
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
        let prefix = format!("{}/", path.trim_matches('/'));
        let dirs: BTreeSet<String> = self
            .baseline
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter_map(|rest| rest.split_once('/').map(|(dir, _)| dir.to_string()))
            .collect();
        Ok(dirs.into_iter().collect())
    }

    async fn list_labels(&self) -> CoreResult<LabelVocabulary> {
        Ok(LabelVocabulary::from_names(self.labels.iter().cloned()))
    }

    async fn publish(
        &self,
        _pull_request: &PullRequest,
        _labels: &BTreeSet<Label>,
        _comment: Option<&str>,
    ) -> CoreResult<()> {
        Ok(())
    }
}

pub struct Fixture {
    pub temp: TempDir,
    pub config: HubConfig,
    pub store: Store,
}

/// A store seeded as if the connection and classification steps had run.
pub fn fixture(remote: FakeRemote) -> Fixture {
    let temp = tempfile::tempdir().unwrap();
    let config = HubConfig::new(
        "owner/hub",
        temp.path().join("mirror"),
        temp.path().join("pull-request"),
    );
    let classifier = config.classifier().unwrap();

    let mut store = Store::new();
    store.insert(
        CLASSIFIED_FILES,
        classifier.classify_files(remote.changed_files.iter().cloned()),
    );
    store.insert(POSSIBLE_LABELS, LabelVocabulary::from_names(remote.labels.iter().cloned()));
    store.insert(PULL_REQUEST, remote.pull_request.clone());
    store.insert(CONFIG, config.clone());
    store.insert(FILE_CLASSIFIER, classifier);
    store.insert(REMOTE, Arc::new(remote) as Arc<dyn HubRemote>);

    Fixture { temp, config, store }
}

impl Fixture {
    pub fn pr_path(&self, repository_path: &str) -> PathBuf {
        local_path(&self.config.pull_request_directory_root, repository_path)
    }

    pub fn write_pr_file(&self, repository_path: &str, content: &str) -> PathBuf {
        let path = self.pr_path(repository_path);
        write_file(&path, content.as_bytes()).unwrap();
        path
    }

    pub fn write_mirror_file(&self, repository_path: &str, content: &str) -> PathBuf {
        let path = local_path(&self.config.hub_mirrored_directory_root, repository_path);
        write_file(&path, content.as_bytes()).unwrap();
        path
    }

    /// Replace the configuration in both the fixture and the store.
    pub fn set_config(&mut self, config: HubConfig) {
        self.store.insert(CONFIG, config.clone());
        self.config = config;
    }
}
