//! Checks against the baseline branch of the hub.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::{info, warn};

use hub_validations_core::{CoreResult, Store};
use hub_validations_pipeline::keys::CLASSIFIED_FILES;
use hub_validations_pipeline::{label_names, FileKind, FileStatus, Step, StepResult};

use crate::storage::files::write_file;

use super::keys::{DELETED_FILES, MIRRORED_FILES, MODEL_NAMES};
use super::{config, label, mirror_path, remote};

const DELETED_FILE_ERROR: &str = "The forecast CSV or metadata file is deleted. Please put the \
file back as we do not allow file deletion at the moment.";

/// Mirrors the baseline copy of every modified forecast so later steps can
/// compare against it.
pub struct CheckModifiedForecasts;

#[async_trait]
impl Step for CheckModifiedForecasts {
    async fn execute(&self, store: &Store) -> CoreResult<StepResult> {
        let config = config(store)?;
        let remote = remote(store)?;
        let classified = store.require(CLASSIFIED_FILES)?;

        let mut mirrored = BTreeSet::new();
        for file in classified.get(FileKind::Forecast) {
            if file.status != FileStatus::Modified {
                continue;
            }
            match remote.fetch_baseline_file(&file.path).await? {
                Some(content) => {
                    write_file(&mirror_path(config, &file.path), &content)?;
                    mirrored.insert(file.path.clone());
                }
                None => warn!(path = %file.path, "modified forecast has no baseline copy"),
            }
        }

        if mirrored.is_empty() {
            info!("pull request does not update existing forecasts");
        } else {
            info!(count = mirrored.len(), "pull request updates existing forecasts");
        }
        Ok(StepResult::passed().with_store(MIRRORED_FILES, mirrored))
    }
}

/// Rejects deletion of forecast or metadata files that exist on the baseline.
pub struct CheckRemovedFiles;

#[async_trait]
impl Step for CheckRemovedFiles {
    async fn execute(&self, store: &Store) -> CoreResult<StepResult> {
        let config = config(store)?;
        let remote = remote(store)?;
        let classified = store.require(CLASSIFIED_FILES)?;

        let mut result = StepResult::passed();
        let mut deleted = BTreeSet::new();
        let removed = classified
            .get(FileKind::Forecast)
            .iter()
            .chain(classified.get(FileKind::Metadata))
            .filter(|file| file.status == FileStatus::Removed);

        for file in removed {
            let Some(content) = remote.fetch_baseline_file(&file.path).await? else {
                continue;
            };
            write_file(&mirror_path(config, &file.path), &content)?;
            result.add_file_error(file.as_path(), DELETED_FILE_ERROR);
            deleted.insert(file.path.clone());
        }

        if deleted.is_empty() {
            info!("pull request does not delete files");
        } else {
            warn!(count = deleted.len(), "pull request deletes existing forecast/metadata files");
            result.success = false;
            result = result.with_label(label(store, label_names::FILE_DELETION)?);
        }
        Ok(result.with_store(DELETED_FILES, deleted))
    }
}

/// Lists the team-model folders on the baseline branch.
pub struct GetAllModels;

#[async_trait]
impl Step for GetAllModels {
    async fn execute(&self, store: &Store) -> CoreResult<StepResult> {
        let config = config(store)?;
        let names: BTreeSet<String> = remote(store)?
            .list_baseline_directories(config.forecast_folder())
            .await?
            .into_iter()
            .collect();
        info!(models = names.len(), "retrieved existing model names");
        Ok(StepResult::passed().with_store(MODEL_NAMES, names))
    }
}
