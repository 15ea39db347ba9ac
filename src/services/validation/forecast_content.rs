//! New-model and retraction checks on forecast content.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{error, info};

use hub_validations_core::{CoreResult, Store};
use hub_validations_pipeline::keys::CLASSIFIED_FILES;
use hub_validations_pipeline::{compare_forecasts, label_names, FileKind, PerFileStep, StepResult};

use crate::storage::files::read_forecast_table;
use crate::utils::paths::repository_path;

use super::keys::MODEL_NAMES;
use super::{config, download_path, error_key, label, mirror_path};

const IMPLICIT_RETRACTION_ERROR: &str = "Forecast file contains implicit retraction(s), which are \
disallowed. Please review the retraction rules for a forecast in the wiki.";

const FORECAST_UPDATE_COMMENT: &str = "💡 Your submission seem to have updated some existing \
forecasts. Could you provide a reason for the update and confirm that any updated forecasts only \
used data that were available at the time the original forecasts were made?";

/// Team-model folder of a repository path.
fn model_of(path: &str) -> Option<&str> {
    let (dir, _) = path.rsplit_once('/')?;
    dir.rsplit('/').next()
}

/// Labels submissions for models not yet in the hub and requires a metadata
/// file alongside them.
pub struct CheckNewModel;

#[async_trait]
impl PerFileStep for CheckNewModel {
    async fn execute(&self, store: &Store, files: &BTreeSet<PathBuf>) -> CoreResult<StepResult> {
        let config = config(store)?;
        let classified = store.require(CLASSIFIED_FILES)?;
        let existing = store.require(MODEL_NAMES)?;

        let forecast_paths: BTreeSet<&str> = classified
            .get(FileKind::Forecast)
            .iter()
            .map(|file| file.path.as_str())
            .collect();

        let mut files_by_model: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for file in files {
            let Some(path) = repository_path(&config.pull_request_directory_root, file) else {
                continue;
            };
            if !forecast_paths.contains(path.as_str()) {
                continue;
            }
            if let Some(model) = model_of(&path) {
                files_by_model.entry(model.to_string()).or_default().push(PathBuf::from(&path));
            }
        }

        let models_with_metadata: BTreeSet<&str> = classified
            .get(FileKind::Metadata)
            .iter()
            .filter(|file| download_path(config, &file.path).exists())
            .filter_map(|file| file.parent_dir_name())
            .collect();

        let mut result = StepResult::passed();
        let new_models: Vec<&String> = files_by_model
            .keys()
            .filter(|model| !existing.contains(*model))
            .collect();
        if new_models.is_empty() {
            return Ok(result);
        }

        info!(models = ?new_models, "pull request submits new models");
        result = result.with_label(label(store, label_names::NEW_TEAM_SUBMISSION)?);

        for model in new_models {
            if models_with_metadata.contains(model.as_str()) {
                continue;
            }
            error!(model = %model, "new model without metadata file");
            result.success = false;
            for path in &files_by_model[model] {
                result.add_file_error(
                    path,
                    format!(
                        "Looks like you are submitting a new model ({}), but you have not \
                         submitted a new metadata file along with it in the same team-model \
                         folder. Please update your pull request to contain a metadata file for \
                         the model in the same team-model folder that also contains the forecast \
                         files.",
                        model
                    ),
                );
            }
        }
        Ok(result)
    }
}

/// Compares updated forecasts with their published versions.
pub struct CheckForecastRetraction;

#[async_trait]
impl PerFileStep for CheckForecastRetraction {
    async fn execute(&self, store: &Store, files: &BTreeSet<PathBuf>) -> CoreResult<StepResult> {
        let config = config(store)?;
        let mut result = StepResult::passed();
        let mut checked = 0usize;

        for file in files {
            let key = error_key(config, file);
            let Some(published) = key.to_str().map(|path| mirror_path(config, path)) else {
                continue;
            };
            if !published.exists() {
                continue;
            }
            checked += 1;
            info!(path = %key.display(), "checking published forecast for retractions");

            let tables = read_forecast_table(&published)
                .and_then(|old| read_forecast_table(file).map(|new| (old, new)));
            let (old, new) = match tables {
                Ok(tables) => tables,
                Err(e) => {
                    result.success = false;
                    result.add_file_error(
                        &key,
                        format!("Forecast file could not be compared with the published version: {}", e),
                    );
                    continue;
                }
            };

            let comparison = compare_forecasts(&old, &new);
            if comparison.is_all_duplicate {
                error!(path = %key.display(), "forecast is all duplicate");
                result.success = false;
                result = result.with_label(label(store, label_names::DUPLICATE_FORECAST)?);
                result.add_file_error(
                    &key,
                    comparison.error.clone().unwrap_or_else(|| "Forecast is all duplicate.".to_string()),
                );
            }
            if comparison.has_implicit_retraction {
                error!(
                    path = %key.display(),
                    missing = comparison.missing_keys.len(),
                    "forecast has implicit retractions"
                );
                result.success = false;
                result = result.with_label(label(store, label_names::FORECAST_IMPLICIT_RETRACTIONS)?);
                let message = match &comparison.error {
                    Some(detail) => format!("{} ({})", IMPLICIT_RETRACTION_ERROR, detail),
                    None => IMPLICIT_RETRACTION_ERROR.to_string(),
                };
                result.add_file_error(&key, message);
            }
            if comparison.has_explicit_retraction {
                info!(
                    path = %key.display(),
                    nulled = comparison.nulled_keys.len(),
                    "forecast has explicit retractions"
                );
                result = result
                    .with_label(label(store, label_names::FORECAST_RETRACTION)?)
                    .with_comment("💡 Submission contains explicit retractions.");
            }
            if comparison.has_no_retraction_or_duplication() {
                info!(path = %key.display(), "forecast updates existing forecasts");
                result = result
                    .with_label(label(store, label_names::FORECAST_UPDATED)?)
                    .with_comment(FORECAST_UPDATE_COMMENT);
            }
        }

        if checked == 0 {
            info!("no published forecasts to compare; no retractions detected");
        }
        Ok(result)
    }
}
