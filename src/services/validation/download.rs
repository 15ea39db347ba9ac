//! Downloading pull-request files and seeding the working file set.

use std::collections::BTreeSet;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, info};

use hub_validations_core::{CoreResult, Store};
use hub_validations_pipeline::keys::CLASSIFIED_FILES;
use hub_validations_pipeline::{FileKind, Step, StepResult};

use crate::storage::files::write_file;
use crate::utils::paths::ensure_dir;

use super::keys::{DOWNLOADED_FILES, METADATA_FILES};
use super::{config, download_path, remote};

/// Downloads every classified file that still exists in the pull request.
pub struct DownloadFiles;

#[async_trait]
impl Step for DownloadFiles {
    async fn execute(&self, store: &Store) -> CoreResult<StepResult> {
        let config = config(store)?;
        let remote = remote(store)?;
        let classified = store.require(CLASSIFIED_FILES)?;

        ensure_dir(&config.pull_request_directory_root)?;

        let mut downloaded = BTreeSet::new();
        for (kind, file) in classified.iter() {
            if !file.status.is_present() {
                continue;
            }
            let content = remote.fetch_file_content(&file.content_url).await?;
            let path = download_path(config, &file.path);
            write_file(&path, &content)?;
            debug!(path = %file.path, kind = %kind, bytes = content.len(), "downloaded");
            downloaded.insert(path);
        }

        info!(count = downloaded.len(), "downloaded pull request files");
        Ok(StepResult::passed().with_store(DOWNLOADED_FILES, downloaded))
    }
}

/// Adds forecast files, and CSVs that may be misplaced forecasts, to the
/// working file set.
pub struct CollectForecastFiles;

#[async_trait]
impl Step for CollectForecastFiles {
    async fn execute(&self, store: &Store) -> CoreResult<StepResult> {
        let config = config(store)?;
        let classified = store.require(CLASSIFIED_FILES)?;

        let misplaced = classified
            .get(FileKind::OtherTracked)
            .iter()
            .chain(classified.get(FileKind::OtherUntracked))
            .filter(|file| file.path.ends_with(".csv") && !file.path.contains("ensemble-metadata/"));

        let files: Vec<PathBuf> = classified
            .get(FileKind::Forecast)
            .iter()
            .chain(misplaced)
            .filter(|file| file.status.is_present())
            .map(|file| download_path(config, &file.path))
            .collect();

        info!(count = files.len(), "collected forecast files");
        Ok(StepResult::passed().with_files(files))
    }
}

/// Records the downloaded metadata files.
pub struct CollectMetadataFiles;

#[async_trait]
impl Step for CollectMetadataFiles {
    async fn execute(&self, store: &Store) -> CoreResult<StepResult> {
        let config = config(store)?;
        let classified = store.require(CLASSIFIED_FILES)?;

        let files: BTreeSet<PathBuf> = classified
            .get(FileKind::Metadata)
            .iter()
            .filter(|file| file.status.is_present())
            .map(|file| download_path(config, &file.path))
            .collect();

        info!(count = files.len(), "collected metadata files");
        Ok(StepResult::passed().with_store(METADATA_FILES, files))
    }
}
