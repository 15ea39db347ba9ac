//! Changed File Classification
//!
//! Maps repository paths to a `FileKind` by walking an ordered rule list;
//! the first matching rule wins and unmatched paths fall through to
//! `FileKind::OtherUntracked`.
//!
//! A rule is a regular expression plus an optional list of named capture
//! groups that must all capture the same text. This expresses constraints
//! such as "the forecast filename repeats its folder name" without regex
//! back-references.

use regex::Regex;
use serde::{Deserialize, Serialize};

use hub_validations_core::{CoreError, CoreResult};

use crate::models::{ChangedFile, ClassifiedFiles, FileKind};

/// Serializable form of a filename rule, as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilenameRuleDefinition {
    /// Kind assigned to matching paths
    pub kind: FileKind,
    /// Regular expression matched against the repository-relative path
    pub pattern: String,
    /// Named groups that must capture identical text
    #[serde(default)]
    pub matching_groups: Vec<String>,
}

/// A compiled filename rule.
#[derive(Debug, Clone)]
pub struct FilenameRule {
    kind: FileKind,
    pattern: Regex,
    matching_groups: Vec<String>,
}

impl FilenameRule {
    /// Compile a rule without group constraints.
    pub fn new(kind: FileKind, pattern: &str) -> CoreResult<Self> {
        let pattern = Regex::new(pattern).map_err(|e| {
            CoreError::config(format!("invalid filename pattern for {} files: {}", kind, e))
        })?;
        Ok(Self {
            kind,
            pattern,
            matching_groups: Vec::new(),
        })
    }

    /// Require the named groups to capture identical text.
    pub fn with_matching_groups<I, S>(mut self, groups: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let groups: Vec<String> = groups.into_iter().map(Into::into).collect();
        for group in &groups {
            let known = self.pattern.capture_names().flatten().any(|name| name == group);
            if !known {
                return Err(CoreError::config(format!(
                    "filename pattern '{}' has no capture group named '{}'",
                    self.pattern.as_str(),
                    group
                )));
            }
        }
        self.matching_groups = groups;
        Ok(self)
    }

    /// Compile a rule from its configuration form.
    pub fn from_definition(definition: &FilenameRuleDefinition) -> CoreResult<Self> {
        Self::new(definition.kind, &definition.pattern)?
            .with_matching_groups(definition.matching_groups.iter().cloned())
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    /// Whether the path matches the expression and every group constraint.
    pub fn matches(&self, path: &str) -> bool {
        let Some(captures) = self.pattern.captures(path) else {
            return false;
        };

        let mut expected: Option<&str> = None;
        for group in &self.matching_groups {
            let Some(value) = captures.name(group).map(|m| m.as_str()) else {
                return false;
            };
            match expected {
                Some(previous) if previous != value => return false,
                Some(_) => {}
                None => expected = Some(value),
            }
        }
        true
    }
}

/// The default rule definitions for a forecast folder, in priority order.
pub fn default_rule_definitions(forecast_folder: &str) -> Vec<FilenameRuleDefinition> {
    let folder = regex::escape(forecast_folder.trim_matches('/'));
    let same_model = vec!["dir".to_string(), "model".to_string()];
    vec![
        FilenameRuleDefinition {
            kind: FileKind::Forecast,
            pattern: format!(
                r"^{}/(?P<dir>[^/]+)/\d{{4}}-\d{{2}}-\d{{2}}-(?P<model>[^/]+)\.csv$",
                folder
            ),
            matching_groups: same_model.clone(),
        },
        FilenameRuleDefinition {
            kind: FileKind::Metadata,
            pattern: format!(r"^{}/(?P<dir>[^/]+)/metadata-(?P<model>[^/]+)\.txt$", folder),
            matching_groups: same_model,
        },
        FilenameRuleDefinition {
            kind: FileKind::OtherTracked,
            pattern: format!(r"^{}/.+\.(csv|txt)$", folder),
            matching_groups: Vec::new(),
        },
    ]
}

/// Ordered filename classifier.
#[derive(Debug, Clone)]
pub struct FileClassifier {
    rules: Vec<FilenameRule>,
}

impl FileClassifier {
    /// Create a classifier from compiled rules; order is priority.
    pub fn new(rules: Vec<FilenameRule>) -> Self {
        Self { rules }
    }

    /// Compile a classifier from configuration definitions.
    pub fn from_definitions(definitions: &[FilenameRuleDefinition]) -> CoreResult<Self> {
        let rules = definitions
            .iter()
            .map(FilenameRule::from_definition)
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Self::new(rules))
    }

    /// The default classifier for a forecast folder.
    pub fn for_forecast_folder(forecast_folder: &str) -> CoreResult<Self> {
        Self::from_definitions(&default_rule_definitions(forecast_folder))
    }

    /// Kind of a single path.
    pub fn classify(&self, path: &str) -> FileKind {
        self.rules
            .iter()
            .find(|rule| rule.matches(path))
            .map(FilenameRule::kind)
            .unwrap_or(FileKind::OtherUntracked)
    }

    /// Group changed files by kind, preserving input order within a kind.
    pub fn classify_files<I>(&self, files: I) -> ClassifiedFiles
    where
        I: IntoIterator<Item = ChangedFile>,
    {
        let mut classified = ClassifiedFiles::new();
        for file in files {
            let kind = self.classify(&file.path);
            tracing::debug!(path = %file.path, kind = %kind, "classified changed file");
            classified.push(kind, file);
        }
        classified
    }
}
