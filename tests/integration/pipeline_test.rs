//! Pull Request Validation Runs
//!
//! Drives all validation steps against an in-memory hub and checks what is
//! published on the pull request.

use std::sync::Arc;

use hub_validations_core::CoreError;
use hub_validations_pipeline::FileStatus;

use crate::support::{forecast, hub_config, labels, metadata, run, RecordingRemote};

const FORECAST: &str = "data-processed/teamA-modelA/2022-03-07-teamA-modelA.csv";
const METADATA: &str = "data-processed/teamA-modelA/metadata-teamA-modelA.txt";

/// A hub where teamA-modelA already exists.
fn existing_hub() -> RecordingRemote {
    RecordingRemote::new("owner/hub").with_baseline(METADATA, &metadata("teamA-modelA", "primary"))
}

// ============================================================================
// Skipped runs
// ============================================================================

#[tokio::test]
async fn test_non_submission_publishes_labels_and_passed_comment() {
    let temp = tempfile::tempdir().unwrap();
    let remote = Arc::new(
        RecordingRemote::new("owner/hub")
            .with_file("code/validation/check.py", FileStatus::Modified, "print()")
            .with_file("package.json", FileStatus::Modified, "{}"),
    );

    let outcome = run(hub_config(&temp), remote.clone()).await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.skipped_at.as_deref(), Some("determine_pull_request_type"));
    assert_eq!(outcome.executed_steps, 3);

    let publication = remote.publication();
    assert_eq!(
        publication.labels,
        labels(&["code", "dependencies", "other-files-updated", "passed-validation"])
    );
    let comment = publication.comment.unwrap();
    assert!(comment.starts_with("### Validations v"));
    assert!(comment.ends_with("✔️ No validation errors in this PR."));
}

// ============================================================================
// Successful submissions
// ============================================================================

#[tokio::test]
async fn test_clean_forecast_is_automerged() {
    let temp = tempfile::tempdir().unwrap();
    let remote = Arc::new(existing_hub().with_file(
        FORECAST,
        FileStatus::Added,
        &forecast("2022-03-07", &[("US", "10"), ("06", "2")]),
    ));

    let outcome = run(hub_config(&temp), remote.clone()).await.unwrap();
    assert!(outcome.success);
    assert!(outcome.skipped_at.is_none());
    assert_eq!(outcome.executed_steps, 16);

    let publication = remote.publication();
    assert_eq!(publication.labels, labels(&["automerge", "data-submission", "passed-validation"]));
    let comment = publication.comment.unwrap();
    assert!(comment.starts_with("### Validations v4"));
    assert!(comment.contains(&format!("✔️ {} passed (non-filename) format checks.", FORECAST)));
    assert!(comment.ends_with("✔️ No validation errors in this PR."));
}

#[tokio::test]
async fn test_automerge_disabled() {
    let temp = tempfile::tempdir().unwrap();
    let mut config = hub_config(&temp);
    config.automerge = false;
    let remote = Arc::new(existing_hub().with_file(
        FORECAST,
        FileStatus::Added,
        &forecast("2022-03-07", &[("US", "10")]),
    ));

    let outcome = run(config, remote.clone()).await.unwrap();
    assert!(outcome.success);
    assert_eq!(remote.publication().labels, labels(&["data-submission", "passed-validation"]));
}

#[tokio::test]
async fn test_explicit_retraction_is_labelled() {
    let temp = tempfile::tempdir().unwrap();
    let remote = Arc::new(
        existing_hub()
            .with_baseline(FORECAST, &forecast("2022-03-07", &[("US", "10"), ("06", "2")]))
            .with_file(
                FORECAST,
                FileStatus::Modified,
                &forecast("2022-03-07", &[("US", "10"), ("06", "NA")]),
            ),
    );

    let outcome = run(hub_config(&temp), remote.clone()).await.unwrap();
    assert!(outcome.success);

    let publication = remote.publication();
    assert_eq!(
        publication.labels,
        labels(&["data-submission", "forecast-retractions", "passed-validation"])
    );
    assert!(publication
        .comment
        .unwrap()
        .contains("💡 Submission contains explicit retractions."));
}

// ============================================================================
// Failing submissions
// ============================================================================

#[tokio::test]
async fn test_errors_from_two_steps_on_one_file() {
    let temp = tempfile::tempdir().unwrap();
    let content = forecast("2022-03-08", &[("US", "10")]).replace("point", "median");
    let remote = Arc::new(existing_hub().with_file(FORECAST, FileStatus::Added, &content));

    let outcome = run(hub_config(&temp), remote.clone()).await.unwrap();
    assert!(!outcome.success);

    let errors = &outcome.results.file_errors[std::path::Path::new(FORECAST)];
    assert!(errors.iter().any(|e| e.starts_with("Error when validating format: row 2: type")));
    assert!(errors
        .iter()
        .any(|e| e == "date in filename does not match date in `forecast_date` column: 2022-03-07 vs 2022-03-08."));

    let publication = remote.publication();
    assert_eq!(publication.labels, labels(&["data-submission"]));
    let comment = publication.comment.unwrap();
    assert!(comment.contains("❌ There are errors in this PR."));
    assert!(comment.contains(&format!("**{}**:", FORECAST)));
}

#[tokio::test]
async fn test_implicit_retraction_fails() {
    let temp = tempfile::tempdir().unwrap();
    let remote = Arc::new(
        existing_hub()
            .with_baseline(FORECAST, &forecast("2022-03-07", &[("US", "10"), ("06", "2")]))
            .with_file(FORECAST, FileStatus::Modified, &forecast("2022-03-07", &[("US", "10")])),
    );

    let outcome = run(hub_config(&temp), remote.clone()).await.unwrap();
    assert!(!outcome.success);
    assert_eq!(
        remote.publication().labels,
        labels(&["data-submission", "forecast-implicit-retractions"])
    );
}

#[tokio::test]
async fn test_deleted_forecast_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let old = "data-processed/teamA-modelA/2022-02-28-teamA-modelA.csv";
    let remote = Arc::new(
        existing_hub()
            .with_baseline(old, &forecast("2022-02-28", &[("US", "10")]))
            .with_file(old, FileStatus::Removed, "")
            .with_file(FORECAST, FileStatus::Added, &forecast("2022-03-07", &[("US", "10")])),
    );

    let outcome = run(hub_config(&temp), remote.clone()).await.unwrap();
    assert!(!outcome.success);
    assert!(outcome.results.file_errors[std::path::Path::new(old)][0].contains("is deleted"));
    assert!(remote.publication().labels.contains("file-deletion"));
}

#[tokio::test]
async fn test_second_primary_model_conflicts() {
    let temp = tempfile::tempdir().unwrap();
    let forecast_b = "data-processed/teamA-modelB/2022-03-07-teamA-modelB.csv";
    let metadata_b = "data-processed/teamA-modelB/metadata-teamA-modelB.txt";
    let remote = Arc::new(
        existing_hub()
            .with_file(forecast_b, FileStatus::Added, &forecast("2022-03-07", &[("US", "10")]))
            .with_file(metadata_b, FileStatus::Added, &metadata("teamA-modelB", "primary")),
    );

    let outcome = run(hub_config(&temp), remote.clone()).await.unwrap();
    assert!(!outcome.success);
    assert!(outcome.results.file_errors.is_empty());

    let publication = remote.publication();
    assert_eq!(
        publication.labels,
        labels(&["data-submission", "metadata-change", "new-team-submission"])
    );
    assert!(publication.comment.unwrap().contains(
        "more than one 'primary' model for the same team: 'teamA-modelA', 'teamA-modelB'"
    ));
}

#[tokio::test]
async fn test_secondary_model_is_accepted() {
    let temp = tempfile::tempdir().unwrap();
    let forecast_b = "data-processed/teamA-modelB/2022-03-07-teamA-modelB.csv";
    let metadata_b = "data-processed/teamA-modelB/metadata-teamA-modelB.txt";
    let remote = Arc::new(
        existing_hub()
            .with_file(forecast_b, FileStatus::Added, &forecast("2022-03-07", &[("US", "10")]))
            .with_file(metadata_b, FileStatus::Added, &metadata("teamA-modelB", "secondary")),
    );

    let outcome = run(hub_config(&temp), remote.clone()).await.unwrap();
    assert!(outcome.success);
    let publication = remote.publication();
    assert!(publication.labels.contains("passed-validation"));
    assert!(!publication.labels.contains("automerge"));
}

// ============================================================================
// Fatal errors
// ============================================================================

#[tokio::test]
async fn test_wrong_repository_aborts_without_publishing() {
    let temp = tempfile::tempdir().unwrap();
    let remote = Arc::new(RecordingRemote::new("someone/else").with_file(
        FORECAST,
        FileStatus::Added,
        &forecast("2022-03-07", &[("US", "10")]),
    ));

    let err = run(hub_config(&temp), remote.clone()).await.unwrap_err();
    assert!(matches!(err, CoreError::Config(_)));
    assert!(remote.publications().is_empty());
}
