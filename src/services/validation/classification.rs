//! Pull request type and file placement checks.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::{info, warn};

use hub_validations_core::{CoreResult, Store};
use hub_validations_pipeline::keys::{CLASSIFIED_FILES, PULL_REQUEST};
use hub_validations_pipeline::{label_names, FileKind, Step, StepResult};

use super::keys::FILE_CLASSIFIER;
use super::{label, remote};

const MISPLACED_FILE_ERROR: &str = "The forecast CSV or metadata file is located in an incorrect \
location and/or is misnamed. Please correct the errors accordingly.\n\
We will still check any misplaced CSV(s) for you, so that you can be sure that the CSVs are \
correct, or correct any actual file content validation errors if not.";

/// Classifies the changed files; stops the run when the pull request does
/// not touch the forecast folder.
pub struct DeterminePullRequestType;

#[async_trait]
impl Step for DeterminePullRequestType {
    async fn execute(&self, store: &Store) -> CoreResult<StepResult> {
        let pull_request = store.require(PULL_REQUEST)?;
        let classifier = store.require(FILE_CLASSIFIER)?;

        let changed = remote(store)?.list_changed_files(pull_request).await?;
        let classified = classifier.classify_files(changed);
        info!(
            pull_request = pull_request.number,
            forecasts = classified.count(FileKind::Forecast),
            metadata = classified.count(FileKind::Metadata),
            other_tracked = classified.count(FileKind::OtherTracked),
            other_untracked = classified.count(FileKind::OtherUntracked),
            "classified changed files"
        );

        if !classified.touches_tracked_files() {
            info!("pull request is not a forecast submission; skipping validations");
            let mut result = StepResult::passed();
            for file in classified.get(FileKind::OtherUntracked) {
                result = result.with_label(label(store, label_names::OTHER_FILES_UPDATED)?);
                if file.path.starts_with("code/") {
                    result = result.with_label(label(store, label_names::CODE)?);
                }
                if file.file_name() == "package.json" {
                    result = result.with_label(label(store, label_names::DEPENDENCIES)?);
                }
            }
            return Ok(result.with_store(CLASSIFIED_FILES, classified).skip_remaining());
        }

        let mut result = StepResult::passed();
        if classified.has(FileKind::Forecast) {
            result = result.with_label(label(store, label_names::DATA_SUBMISSION)?);
        }
        Ok(result.with_store(CLASSIFIED_FILES, classified))
    }
}

/// Warns when more than one team-model is touched.
pub struct CheckMultipleModelNames;

#[async_trait]
impl Step for CheckMultipleModelNames {
    async fn execute(&self, store: &Store) -> CoreResult<StepResult> {
        let classified = store.require(CLASSIFIED_FILES)?;

        let models: BTreeSet<&str> = classified
            .get(FileKind::Forecast)
            .iter()
            .chain(classified.get(FileKind::Metadata))
            .filter_map(|file| file.parent_dir_name())
            .collect();

        if models.len() <= 1 {
            return Ok(StepResult::passed());
        }

        let updated = models.into_iter().collect::<Vec<_>>().join(", ");
        warn!(models = %updated, "pull request updates multiple models");
        Ok(StepResult::passed().with_comment(format!(
            "⚠️ You are adding/updating multiple models' files. Could you provide a reason for \
             this? If this is unintentional, please check to make sure to put your files are in \
             the appropriate folder, and update the PR when you have done that. If you do mean \
             to update multiple models, we will review the PR manually.\n\
             Models that are being updated: {}",
            updated
        )))
    }
}

/// Flags files outside a valid submission layout and metadata changes.
pub struct CheckFileLocations;

#[async_trait]
impl Step for CheckFileLocations {
    async fn execute(&self, store: &Store) -> CoreResult<StepResult> {
        let classified = store.require(CLASSIFIED_FILES)?;
        let mut result = StepResult::passed();

        if classified.has(FileKind::OtherUntracked) || classified.has(FileKind::OtherTracked) {
            info!("pull request changes files outside a valid submission");
            result = result
                .with_comment(
                    "⚠️ PR contains file changes that are not part of a valid forecast submission \
                     (misnamed/misplaced forecast CSV, non CSV files, etc.)",
                )
                .with_label(label(store, label_names::OTHER_FILES_UPDATED)?);
        }

        if !classified.has(FileKind::Forecast) && classified.has(FileKind::OtherTracked) {
            warn!("pull request contains misplaced forecast files");
            result.success = false;
            for file in classified.get(FileKind::OtherTracked) {
                result.add_file_error(file.as_path(), MISPLACED_FILE_ERROR);
            }
        }

        if classified.has(FileKind::Metadata) {
            info!("pull request changes metadata");
            result = result
                .with_comment("💡 PR contains metadata file changes.")
                .with_label(label(store, label_names::METADATA_CHANGE)?);
        }

        Ok(result)
    }
}
