//! Pull Request Validations
//!
//! The concrete steps run against a forecast hub pull request, in order:
//!
//! 1. `establish_connection` - bind to the hub repository, load labels
//! 2. `extract_pull_request` - resolve and fetch the pull request
//! 3. `determine_pull_request_type` - classify files, skip non-submissions
//! 4. `check_multiple_model_names`
//! 5. `check_file_locations`
//! 6. `check_modified_forecasts` - mirror baseline copies of updated forecasts
//! 7. `check_removed_files`
//! 8. `get_all_models`
//! 9. `download_files`
//! 10. `collect_forecast_files` - seed the working file set
//! 11. `collect_metadata_files`
//! 12. `validate_forecast_files` (per file)
//! 13. `check_forecast_dates` (per file)
//! 14. `check_new_model` (per file)
//! 15. `check_forecast_retraction` (per file)
//! 16. `validate_metadata_files`

mod baseline;
mod classification;
mod connection;
mod download;
mod forecast_content;
mod forecast_date;
mod forecast_format;
pub mod keys;
mod metadata;

#[cfg(test)]
pub(crate) mod testing;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hub_validations_core::{CoreResult, Store};
use hub_validations_pipeline::keys::{AUTOMERGE, POSSIBLE_LABELS, REMOTE};
use hub_validations_pipeline::{HubRemote, Label, ValidationRun, ValidationStep};

use crate::models::config::HubConfig;
use crate::utils::error::AppResult;
use crate::utils::paths::{local_path, repository_path};

pub use baseline::{CheckModifiedForecasts, CheckRemovedFiles, GetAllModels};
pub use classification::{CheckFileLocations, CheckMultipleModelNames, DeterminePullRequestType};
pub use connection::{event_pull_request_number, EstablishConnection, ExtractPullRequest, PullRequestSource};
pub use download::{CollectForecastFiles, CollectMetadataFiles, DownloadFiles};
pub use forecast_content::{CheckForecastRetraction, CheckNewModel};
pub use forecast_date::{check_date_format, CheckForecastDates};
pub use forecast_format::{check_forecast_format, check_forecast_values, ValidateForecastFiles};
pub use metadata::{check_metadata_document, ValidateMetadataFiles};

/// The validation steps for a pull request, in execution order.
pub fn pull_request_steps() -> Vec<ValidationStep> {
    vec![
        ValidationStep::whole("establish_connection", EstablishConnection),
        ValidationStep::whole("extract_pull_request", ExtractPullRequest),
        ValidationStep::whole("determine_pull_request_type", DeterminePullRequestType),
        ValidationStep::whole("check_multiple_model_names", CheckMultipleModelNames),
        ValidationStep::whole("check_file_locations", CheckFileLocations),
        ValidationStep::whole("check_modified_forecasts", CheckModifiedForecasts),
        ValidationStep::whole("check_removed_files", CheckRemovedFiles),
        ValidationStep::whole("get_all_models", GetAllModels),
        ValidationStep::whole("download_files", DownloadFiles),
        ValidationStep::whole("collect_forecast_files", CollectForecastFiles),
        ValidationStep::whole("collect_metadata_files", CollectMetadataFiles),
        ValidationStep::per_file("validate_forecast_files", ValidateForecastFiles),
        ValidationStep::per_file("check_forecast_dates", CheckForecastDates::new()),
        ValidationStep::per_file("check_new_model", CheckNewModel),
        ValidationStep::per_file("check_forecast_retraction", CheckForecastRetraction),
        ValidationStep::whole("validate_metadata_files", ValidateMetadataFiles),
    ]
}

/// The store every pull request run starts from.
pub fn seed_store(
    config: HubConfig,
    remote: Arc<dyn HubRemote>,
    source: PullRequestSource,
) -> AppResult<Store> {
    let classifier = config.classifier()?;

    let mut store = Store::new();
    store.insert(AUTOMERGE, config.automerge);
    store.insert(keys::FILE_CLASSIFIER, classifier);
    store.insert(keys::PULL_REQUEST_SOURCE, source);
    store.insert(keys::CONFIG, config);
    store.insert(REMOTE, remote);
    Ok(store)
}

/// A ready-to-run validation of one pull request.
pub fn build_pull_request_run(
    config: HubConfig,
    remote: Arc<dyn HubRemote>,
    source: PullRequestSource,
) -> AppResult<ValidationRun> {
    let store = seed_store(config, remote, source)?;
    Ok(ValidationRun::new(pull_request_steps()).with_store(store))
}

// ============================================================================
// Store access shared by the steps
// ============================================================================

fn config(store: &Store) -> CoreResult<&HubConfig> {
    store.require(keys::CONFIG)
}

fn remote(store: &Store) -> CoreResult<&Arc<dyn HubRemote>> {
    store.require(REMOTE)
}

/// A label from the repository vocabulary; an undefined label is fatal.
fn label(store: &Store, name: &str) -> CoreResult<Label> {
    store.require(POSSIBLE_LABELS)?.get(name)
}

/// Repository-relative path of a downloaded file, used to key file errors.
fn error_key(config: &HubConfig, local: &Path) -> PathBuf {
    repository_path(&config.pull_request_directory_root, local)
        .map(PathBuf::from)
        .unwrap_or_else(|| local.to_path_buf())
}

/// Where the baseline copy of a repository file is mirrored.
fn mirror_path(config: &HubConfig, repository_path: &str) -> PathBuf {
    local_path(&config.hub_mirrored_directory_root, repository_path)
}

/// Where a pull-request file is downloaded.
fn download_path(config: &HubConfig, repository_path: &str) -> PathBuf {
    local_path(&config.pull_request_directory_root, repository_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use testing::FakeRemote;

    #[test]
    fn test_step_order() {
        let names: Vec<String> = pull_request_steps().iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names.len(), 16);
        assert_eq!(names.first().map(String::as_str), Some("establish_connection"));
        assert_eq!(names.last().map(String::as_str), Some("validate_metadata_files"));
        assert!(pull_request_steps().iter().all(|s| s.shape().is_some()));
    }

    #[test]
    fn test_seed_store() {
        let temp = tempfile::tempdir().unwrap();
        let mut config = HubConfig::new("owner/hub", temp.path().join("m"), temp.path().join("p"));
        config.automerge = true;
        let store = seed_store(
            config,
            Arc::new(FakeRemote::new("owner/hub")),
            PullRequestSource::Number(3),
        )
        .unwrap();

        assert_eq!(store.get(AUTOMERGE), Some(&true));
        assert!(store.contains(keys::FILE_CLASSIFIER));
        assert_eq!(store.get(keys::PULL_REQUEST_SOURCE), Some(&PullRequestSource::Number(3)));
        assert!(store.contains(REMOTE));
    }

    #[test]
    fn test_error_key_is_repository_relative() {
        let config = HubConfig::new("owner/hub", "/tmp/m", "/tmp/p");
        let local = download_path(&config, "data-processed/t-m/2022-01-03-t-m.csv");
        assert_eq!(
            error_key(&config, &local),
            PathBuf::from("data-processed/t-m/2022-01-03-t-m.csv")
        );
        assert_eq!(error_key(&config, Path::new("/elsewhere/x.csv")), PathBuf::from("/elsewhere/x.csv"));
    }
}
