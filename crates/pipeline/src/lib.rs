//! Hub Validations Pipeline
//!
//! Core types, the validation run engine, and the comparison algorithms used
//! to gate forecast submissions to a data hub:
//!
//! - `models` - Changed files, file kinds, labels, pull requests
//! - `classifier` - Ordered filename rules mapping paths to a `FileKind`
//! - `pipeline` - Sequential step engine (`ValidationRun`, `ValidationStep`, `StepResult`)
//! - `aggregator` - Merges step results, decides automerge, renders the PR comment
//! - `retraction` - Forecast table comparison (retractions and duplicates)
//! - `designation` - Team/model designation merge and the single-primary rule
//! - `remote` - The remote repository collaborator trait
//! - `keys` - Well-known store keys shared by the engine and the steps
//!
//! Network access, local storage, and the concrete validation steps live in
//! the application crate.

pub mod aggregator;
pub mod classifier;
pub mod designation;
pub mod keys;
pub mod models;
pub mod pipeline;
pub mod remote;
pub mod retraction;

/// Version stamped on every published validation comment.
pub const VALIDATIONS_VERSION: u32 = 4;

// Re-export core model types
pub use models::{
    label_names, ChangedFile, ClassifiedFiles, FileKind, FileStatus, Label, LabelVocabulary,
    PullRequest,
};

// Re-export pipeline types
pub use pipeline::{
    ExecutedStep, PerFileStep, RunOutcome, Step, StepLogic, StepResult, StepShape,
    ValidationRun, ValidationStep,
};

// Re-export aggregation
pub use aggregator::{is_automerge_eligible, render_comment, AggregatedResults, PublishedResults};

// Re-export classifier
pub use classifier::{default_rule_definitions, FileClassifier, FilenameRule, FilenameRuleDefinition};

// Re-export comparison algorithms
pub use designation::{check_team_designations, Designation, DesignationCheck, DesignationMap};
pub use retraction::{compare_forecasts, ForecastKey, ForecastTable, RetractionCheckResult};

// Re-export the remote collaborator
pub use remote::HubRemote;
