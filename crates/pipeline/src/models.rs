//! Hub Validation Models
//!
//! Data structures describing a pull request, its changed files and their
//! classification, and the labels a run may attach to it.

use std::collections::BTreeMap;
use std::path::Path;

use hub_validations_core::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Well-known label names used by the validation steps.
pub mod label_names {
    pub const AUTOMERGE: &str = "automerge";
    pub const CODE: &str = "code";
    pub const DATA_SUBMISSION: &str = "data-submission";
    pub const DEPENDENCIES: &str = "dependencies";
    pub const DUPLICATE_FORECAST: &str = "duplicate-forecast";
    pub const FILE_DELETION: &str = "file-deletion";
    pub const FORECAST_IMPLICIT_RETRACTIONS: &str = "forecast-implicit-retractions";
    pub const FORECAST_RETRACTION: &str = "forecast-retractions";
    pub const FORECAST_UPDATED: &str = "forecast-updated";
    pub const METADATA_CHANGE: &str = "metadata-change";
    pub const NEW_TEAM_SUBMISSION: &str = "new-team-submission";
    pub const OTHER_FILES_UPDATED: &str = "other-files-updated";
    pub const PASSED_VALIDATION: &str = "passed-validation";
}

// ============================================================================
// File classification
// ============================================================================

/// The kind of a changed file, decided by the filename rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// A forecast table in its team-model folder
    Forecast,
    /// A team-model metadata document
    Metadata,
    /// Any other csv/txt file inside the forecast folder
    OtherTracked,
    /// Everything else (code, docs, dependencies)
    OtherUntracked,
}

impl FileKind {
    /// All kinds, in classification priority order.
    pub const ALL: [FileKind; 4] = [
        FileKind::Forecast,
        FileKind::Metadata,
        FileKind::OtherTracked,
        FileKind::OtherUntracked,
    ];

    /// Get human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            FileKind::Forecast => "forecast",
            FileKind::Metadata => "metadata",
            FileKind::OtherTracked => "other tracked",
            FileKind::OtherUntracked => "other untracked",
        }
    }

    /// Whether files of this kind live inside the forecast folder.
    pub fn is_tracked(&self) -> bool {
        !matches!(self, FileKind::OtherUntracked)
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Change status reported by the remote for a pull-request file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Modified,
    Removed,
    Renamed,
    /// Copied, changed, unchanged, or anything newer the host reports
    #[serde(other)]
    Other,
}

impl FileStatus {
    /// Whether the file still exists after the pull request is merged.
    pub fn is_present(&self) -> bool {
        !matches!(self, FileStatus::Removed)
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileStatus::Added => write!(f, "added"),
            FileStatus::Modified => write!(f, "modified"),
            FileStatus::Removed => write!(f, "removed"),
            FileStatus::Renamed => write!(f, "renamed"),
            FileStatus::Other => write!(f, "other"),
        }
    }
}

/// A file touched by a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    /// Repository-relative path, always `/`-separated
    pub path: String,
    /// Change status
    pub status: FileStatus,
    /// URL the file content can be downloaded from
    pub content_url: String,
}

impl ChangedFile {
    /// Create a changed-file record.
    pub fn new(path: impl Into<String>, status: FileStatus, content_url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status,
            content_url: content_url.into(),
        }
    }

    /// Final path component.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Name of the folder holding the file; for forecast and metadata files
    /// this is the team-model name.
    pub fn parent_dir_name(&self) -> Option<&str> {
        let mut parts = self.path.rsplit('/');
        parts.next()?;
        parts.next()
    }

    /// Relative path as a `Path`.
    pub fn as_path(&self) -> &Path {
        Path::new(&self.path)
    }
}

/// Changed files grouped by kind, preserving the order the remote listed them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedFiles {
    files: BTreeMap<FileKind, Vec<ChangedFile>>,
}

impl ClassifiedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file under its kind.
    pub fn push(&mut self, kind: FileKind, file: ChangedFile) {
        self.files.entry(kind).or_default().push(file);
    }

    /// Files of one kind (empty when none were classified).
    pub fn get(&self, kind: FileKind) -> &[ChangedFile] {
        self.files.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of files of one kind.
    pub fn count(&self, kind: FileKind) -> usize {
        self.get(kind).len()
    }

    /// Whether at least one file of the kind is present.
    pub fn has(&self, kind: FileKind) -> bool {
        self.count(kind) > 0
    }

    /// Every classified file with its kind, in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (FileKind, &ChangedFile)> {
        self.files
            .iter()
            .flat_map(|(kind, files)| files.iter().map(move |file| (*kind, file)))
    }

    /// Total number of files.
    pub fn len(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the pull request touches anything in the forecast folder.
    pub fn touches_tracked_files(&self) -> bool {
        FileKind::ALL
            .iter()
            .filter(|kind| kind.is_tracked())
            .any(|kind| self.has(*kind))
    }
}

// ============================================================================
// Labels
// ============================================================================

/// A label that exists in the hub repository.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
}

impl Label {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The set of labels defined in the hub repository, keyed by name.
///
/// Steps may only request labels from this vocabulary; asking for an unknown
/// label is a configuration problem in the hub, not a validation finding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelVocabulary {
    labels: BTreeMap<String, Label>,
}

impl LabelVocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a vocabulary from label names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels = names
            .into_iter()
            .map(|name| {
                let label = Label::new(name);
                (label.name.clone(), label)
            })
            .collect();
        Self { labels }
    }

    pub fn insert(&mut self, label: Label) {
        self.labels.insert(label.name.clone(), label);
    }

    /// Look up a label that steps require to exist.
    pub fn get(&self, name: &str) -> CoreResult<Label> {
        self.labels.get(name).cloned().ok_or_else(|| {
            CoreError::not_found(format!("label '{}' is not defined in the repository", name))
        })
    }

    /// Look up a label that may be absent.
    pub fn find(&self, name: &str) -> Option<&Label> {
        self.labels.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.labels.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

// ============================================================================
// Pull request
// ============================================================================

/// The pull request under validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    /// Commit SHA at the head of the pull request
    #[serde(default)]
    pub head_sha: String,
}

impl PullRequest {
    pub fn new(number: u64) -> Self {
        Self {
            number,
            title: String::new(),
            head_sha: String::new(),
        }
    }
}
