//! Config Directory Integration Tests
//!
//! Loads a hub configuration the way the CLI does and runs a validation
//! with it.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use hub_validations::utils::paths::config_path;
use hub_validations::{AppError, ConfigService};
use hub_validations_pipeline::FileStatus;

use crate::support::{forecast, run, RecordingRemote};

const FORECAST: &str = "data-processed/teamA-modelA/2022-03-07-teamA-modelA.csv";

fn write_hub(dir: &Path) {
    fs::write(
        config_path(dir),
        r#"{
            "hub_repository_name": "placeholder/hub",
            "hub_mirrored_directory_root": "mirror",
            "pull_request_directory_root": "pull-request",
            "population_file": "locations.csv",
            "automerge": true
        }"#,
    )
    .unwrap();
    fs::write(dir.join("locations.csv"), "location,population\nUS,1000\n06,50\n").unwrap();
}

fn load(dir: &Path) -> ConfigService {
    ConfigService::load_with_env(dir, |name| match name {
        "GITHUB_REPOSITORY" => Some("owner/hub".to_string()),
        "GH_TOKEN" => Some("secret".to_string()),
        _ => None,
    })
    .unwrap()
}

#[test]
fn test_load_resolves_paths_and_environment() {
    let temp = tempfile::tempdir().unwrap();
    write_hub(temp.path());

    let service = load(temp.path());
    let config = service.get_config();
    assert_eq!(config.hub_repository_name, "owner/hub");
    assert_eq!(config.pull_request_directory_root, temp.path().join("pull-request"));
    assert_eq!(config.population_file.as_deref(), Some(temp.path().join("locations.csv").as_path()));
    assert_eq!(
        service.github_token(|name| (name == "GH_TOKEN").then(|| "secret".to_string())),
        Some("secret".to_string())
    );
}

#[test]
fn test_missing_config_file_is_a_config_error() {
    let temp = tempfile::tempdir().unwrap();
    let err = ConfigService::load_with_env(temp.path(), |_| None).unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
}

#[tokio::test]
async fn test_run_with_loaded_config_checks_populations() {
    let temp = tempfile::tempdir().unwrap();
    write_hub(temp.path());
    let config = load(temp.path()).into_config();

    let remote = Arc::new(
        RecordingRemote::new("owner/hub")
            .with_baseline("data-processed/teamA-modelA/metadata-teamA-modelA.txt", "model_abbr: teamA-modelA\n")
            .with_file(FORECAST, FileStatus::Added, &forecast("2022-03-07", &[("US", "10"), ("06", "75")])),
    );

    let outcome = run(config, remote.clone()).await.unwrap();
    assert!(!outcome.success);
    assert!(temp.path().join("pull-request").join("data-processed").is_dir());

    let errors = &outcome.results.file_errors[Path::new(FORECAST)];
    assert_eq!(
        errors,
        &vec![
            "Error when validating forecast values: Found 1 predictions with forecasted value larger \
             than population size of locality in your file, at row(s) [1]"
                .to_string()
        ]
    );
    assert!(!remote.publication().labels.contains("passed-validation"));
}
