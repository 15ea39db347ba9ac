//! Result Aggregation
//!
//! Merges the results of every executed step, decides whether the pull
//! request may be merged automatically, renders the consolidated comment,
//! and hands labels and comment to the remote.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use tracing::{info, warn};

use hub_validations_core::{CoreResult, Store};

use crate::keys;
use crate::models::{label_names, ClassifiedFiles, FileKind, Label, LabelVocabulary};
use crate::pipeline::ExecutedStep;
use crate::VALIDATIONS_VERSION;

// ============================================================================
// Merge Functions
// ============================================================================

/// Set union of labels.
pub fn merge_labels(into: &mut BTreeSet<Label>, from: &BTreeSet<Label>) {
    into.extend(from.iter().cloned());
}

/// Ordered append of comments.
pub fn append_comments(into: &mut Vec<String>, from: &[String]) {
    into.extend(from.iter().cloned());
}

/// Per-file append of errors; entries already present are kept.
pub fn merge_file_errors(
    into: &mut BTreeMap<PathBuf, Vec<String>>,
    from: &BTreeMap<PathBuf, Vec<String>>,
) {
    for (path, errors) in from {
        into.entry(path.clone())
            .or_default()
            .extend(errors.iter().cloned());
    }
}

// ============================================================================
// Aggregated Results
// ============================================================================

/// Merged results of the executed steps of one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedResults {
    /// Every executed step succeeded
    pub success: bool,
    pub labels: BTreeSet<Label>,
    pub comments: Vec<String>,
    pub file_errors: BTreeMap<PathBuf, Vec<String>>,
}

impl AggregatedResults {
    /// Merge the results of executed steps, in execution order.
    pub fn from_executed(steps: &[ExecutedStep]) -> Self {
        let mut aggregated = Self {
            success: true,
            ..Self::default()
        };
        for step in steps {
            aggregated.success &= step.result.success;
            merge_labels(&mut aggregated.labels, &step.result.labels);
            append_comments(&mut aggregated.comments, &step.result.comments);
            merge_file_errors(&mut aggregated.file_errors, &step.result.file_errors);
        }
        aggregated
    }

    /// Whether any file error was collected.
    pub fn has_file_errors(&self) -> bool {
        self.file_errors.values().any(|errors| !errors.is_empty())
    }

    /// Total number of file errors.
    pub fn error_count(&self) -> usize {
        self.file_errors.values().map(Vec::len).sum()
    }
}

// ============================================================================
// Automerge
// ============================================================================

/// Whether a pull request qualifies for automatic merging.
///
/// Requires no file errors, `data-submission` as the only requested label,
/// exactly one forecast file and nothing else, and automerge enabled.
pub fn is_automerge_eligible(
    results: &AggregatedResults,
    files: &ClassifiedFiles,
    automerge_enabled: bool,
) -> bool {
    let only_data_submission = results.labels.len() == 1
        && results
            .labels
            .iter()
            .all(|label| label.name == label_names::DATA_SUBMISSION);
    let only_one_forecast = files.count(FileKind::Forecast) == 1;
    let nothing_else = !files.has(FileKind::Metadata)
        && !files.has(FileKind::OtherTracked)
        && !files.has(FileKind::OtherUntracked);

    automerge_enabled
        && !results.has_file_errors()
        && only_data_submission
        && only_one_forecast
        && nothing_else
}

// ============================================================================
// Comment
// ============================================================================

/// Render the consolidated pull-request comment.
pub fn render_comment(results: &AggregatedResults) -> String {
    let mut comment = format!("### Validations v{}\n\n", VALIDATIONS_VERSION);

    if !results.comments.is_empty() {
        comment.push_str("Comments:\n\n");
        comment.push_str(&results.comments.join("\n\n"));
        comment.push_str("\n\n");
    }

    comment.push_str("Errors:\n\n");
    if results.success && !results.has_file_errors() {
        comment.push_str("✔️ No validation errors in this PR.");
        return comment;
    }

    comment.push_str("❌ There are errors in this PR.\n\n");
    for (path, errors) in &results.file_errors {
        comment.push_str(&format!("**{}**:\n", path.display()));
        for error in errors {
            comment.push_str(error);
            comment.push('\n');
        }
        comment.push('\n');
    }
    comment.trim_end().to_string()
}

// ============================================================================
// Publishing
// ============================================================================

/// What a run hands to the remote.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedResults {
    pub labels: BTreeSet<Label>,
    pub comment: String,
    pub automerge: bool,
}

/// Decide the final labels and comment without touching the remote.
pub fn prepare_publication(
    results: &AggregatedResults,
    files: &ClassifiedFiles,
    vocabulary: &LabelVocabulary,
    automerge_enabled: bool,
) -> PublishedResults {
    let mut labels = results.labels.clone();

    let automerge = is_automerge_eligible(results, files, automerge_enabled);
    if automerge {
        add_if_defined(&mut labels, vocabulary, label_names::AUTOMERGE);
    }
    if results.success {
        add_if_defined(&mut labels, vocabulary, label_names::PASSED_VALIDATION);
    }

    let comment = render_comment(results);

    PublishedResults {
        labels,
        comment,
        automerge,
    }
}

fn add_if_defined(labels: &mut BTreeSet<Label>, vocabulary: &LabelVocabulary, name: &str) {
    match vocabulary.find(name) {
        Some(label) => {
            labels.insert(label.clone());
        }
        None => warn!(label = name, "label is not defined in the repository; not applied"),
    }
}

/// Publish aggregated results when the store holds everything needed.
///
/// Returns `None` when the run never got far enough to know where to
/// publish (no remote, pull request, classified files or label vocabulary).
pub async fn publish(store: &Store, results: &AggregatedResults) -> CoreResult<Option<PublishedResults>> {
    let (Some(remote), Some(pull_request), Some(files), Some(vocabulary)) = (
        store.try_get(keys::REMOTE)?,
        store.try_get(keys::PULL_REQUEST)?,
        store.try_get(keys::CLASSIFIED_FILES)?,
        store.try_get(keys::POSSIBLE_LABELS)?,
    ) else {
        info!("run state is incomplete; nothing to publish");
        return Ok(None);
    };
    let automerge_enabled = store.try_get(keys::AUTOMERGE)?.copied().unwrap_or(false);

    let publication = prepare_publication(results, files, vocabulary, automerge_enabled);
    if publication.automerge {
        info!(pull_request = pull_request.number, "pull request can be automerged");
    }

    let applied: Vec<&str> = publication.labels.iter().map(|l| l.name.as_str()).collect();
    info!(
        pull_request = pull_request.number,
        labels = ?applied,
        errors = results.error_count(),
        "publishing validation results"
    );

    remote
        .publish(pull_request, &publication.labels, Some(publication.comment.as_str()))
        .await?;

    Ok(Some(publication))
}
