//! Validation Run Engine
//!
//! A `ValidationRun` owns an ordered list of `ValidationStep`s, the run
//! `Store`, and the working file set. Steps execute strictly one at a time in
//! list order:
//!
//! - whole-run steps receive the store,
//! - per-file steps receive the store and the working file set.
//!
//! Each `StepResult` is merged back additively (store entries and new working
//! files). A failed step never stops the run; only `skip_remaining` does.
//! A step without logic, or a per-file step that tries to grow the working
//! file set, is a contract violation that aborts the run.
//!
//! After the last executed step the results are aggregated and, when the
//! store holds a remote, a pull request, classified files and the label
//! vocabulary, published through the remote.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use hub_validations_core::{CoreError, CoreResult, Store, StoreKey, StoreUpdates};

use crate::aggregator::{self, AggregatedResults, PublishedResults};
use crate::models::Label;

// ============================================================================
// Step Result
// ============================================================================

/// Outcome of one step.
#[derive(Debug)]
pub struct StepResult {
    /// Whether the step's checks passed
    pub success: bool,
    /// Stop the run after this step
    pub skip_remaining: bool,
    /// Entries to merge into the store
    pub store_updates: StoreUpdates,
    /// Paths to add to the working file set
    pub new_files: BTreeSet<PathBuf>,
    /// Labels requested for the pull request
    pub labels: BTreeSet<Label>,
    /// Comments, in the order they should appear
    pub comments: Vec<String>,
    /// Errors scoped to a single file
    pub file_errors: BTreeMap<PathBuf, Vec<String>>,
}

impl StepResult {
    /// A result with the given success flag and nothing else.
    pub fn with_success(success: bool) -> Self {
        Self {
            success,
            skip_remaining: false,
            store_updates: StoreUpdates::new(),
            new_files: BTreeSet::new(),
            labels: BTreeSet::new(),
            comments: Vec::new(),
            file_errors: BTreeMap::new(),
        }
    }

    /// A successful result.
    pub fn passed() -> Self {
        Self::with_success(true)
    }

    /// A failed result.
    pub fn failed() -> Self {
        Self::with_success(false)
    }

    /// Add a store entry.
    pub fn with_store<T: std::any::Any + Send + Sync>(mut self, key: StoreKey<T>, value: T) -> Self {
        self.store_updates.insert(key, value);
        self
    }

    /// Add paths to the working file set.
    pub fn with_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.new_files.extend(files.into_iter().map(Into::into));
        self
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.insert(label);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comments.push(comment.into());
        self
    }

    /// Stop the run after this step.
    pub fn skip_remaining(mut self) -> Self {
        self.skip_remaining = true;
        self
    }

    /// Append an error for a file, keeping earlier errors for the same file.
    pub fn add_file_error(&mut self, path: impl AsRef<Path>, error: impl Into<String>) {
        self.file_errors
            .entry(path.as_ref().to_path_buf())
            .or_default()
            .push(error.into());
    }

    /// Append several errors for a file.
    pub fn extend_file_errors<I, S>(&mut self, path: impl AsRef<Path>, errors: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.file_errors.entry(path.as_ref().to_path_buf()).or_default();
        entry.extend(errors.into_iter().map(Into::into));
    }

    /// Whether any file error was recorded.
    pub fn has_file_errors(&self) -> bool {
        self.file_errors.values().any(|errors| !errors.is_empty())
    }
}

// ============================================================================
// Step Traits
// ============================================================================

/// A step that runs once over the whole store.
#[async_trait]
pub trait Step: Send + Sync {
    async fn execute(&self, store: &Store) -> CoreResult<StepResult>;
}

/// A step that runs once over the working file set.
///
/// Per-file steps may not add to the working file set.
#[async_trait]
pub trait PerFileStep: Send + Sync {
    async fn execute(&self, store: &Store, files: &BTreeSet<PathBuf>) -> CoreResult<StepResult>;
}

/// The arguments a step declares it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepShape {
    /// Store only
    Whole,
    /// Store and working file set
    PerFile,
}

impl std::fmt::Display for StepShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepShape::Whole => write!(f, "whole"),
            StepShape::PerFile => write!(f, "per_file"),
        }
    }
}

/// Step logic tagged with its shape.
pub enum StepLogic {
    Whole(Box<dyn Step>),
    PerFile(Box<dyn PerFileStep>),
}

impl StepLogic {
    pub fn shape(&self) -> StepShape {
        match self {
            StepLogic::Whole(_) => StepShape::Whole,
            StepLogic::PerFile(_) => StepShape::PerFile,
        }
    }
}

/// A named step in a run.
pub struct ValidationStep {
    name: String,
    logic: Option<StepLogic>,
}

impl ValidationStep {
    /// A whole-run step.
    pub fn whole(name: impl Into<String>, step: impl Step + 'static) -> Self {
        Self {
            name: name.into(),
            logic: Some(StepLogic::Whole(Box::new(step))),
        }
    }

    /// A per-file step.
    pub fn per_file(name: impl Into<String>, step: impl PerFileStep + 'static) -> Self {
        Self {
            name: name.into(),
            logic: Some(StepLogic::PerFile(Box::new(step))),
        }
    }

    #[cfg(test)]
    fn unattached(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            logic: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> Option<StepShape> {
        self.logic.as_ref().map(StepLogic::shape)
    }

    /// Invoke the step with the arguments its shape declares.
    async fn invoke(&self, store: &Store, files: &BTreeSet<PathBuf>) -> CoreResult<(StepShape, StepResult)> {
        let logic = self.logic.as_ref().ok_or_else(|| {
            CoreError::contract(format!("step '{}' has no logic attached", self.name))
        })?;

        match logic {
            StepLogic::Whole(step) => Ok((StepShape::Whole, step.execute(store).await?)),
            StepLogic::PerFile(step) => {
                let result = step.execute(store, files).await?;
                if !result.new_files.is_empty() {
                    return Err(CoreError::contract(format!(
                        "per-file step '{}' returned {} working file addition(s)",
                        self.name,
                        result.new_files.len()
                    )));
                }
                Ok((StepShape::PerFile, result))
            }
        }
    }
}

impl std::fmt::Debug for ValidationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationStep")
            .field("name", &self.name)
            .field("shape", &self.shape())
            .finish()
    }
}

// ============================================================================
// Run
// ============================================================================

/// Record of a step that was executed.
#[derive(Debug)]
pub struct ExecutedStep {
    pub name: String,
    pub shape: StepShape,
    pub result: StepResult,
    pub duration_ms: u64,
}

/// Final state of a run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Every executed step succeeded
    pub success: bool,
    /// Name of the step that asked to skip the rest, if any
    pub skipped_at: Option<String>,
    /// Number of steps executed
    pub executed_steps: usize,
    /// Merged results of the executed steps
    pub results: AggregatedResults,
    /// What was published, if the store allowed publishing
    pub published: Option<PublishedResults>,
}

/// One validation run.
pub struct ValidationRun {
    steps: Vec<ValidationStep>,
    store: Store,
    working_files: BTreeSet<PathBuf>,
    executed: Vec<ExecutedStep>,
    skipped_at: Option<String>,
}

impl ValidationRun {
    /// Create a run with an empty store and working file set.
    pub fn new(steps: Vec<ValidationStep>) -> Self {
        Self {
            steps,
            store: Store::new(),
            working_files: BTreeSet::new(),
            executed: Vec::new(),
            skipped_at: None,
        }
    }

    /// Seed the store before running.
    pub fn with_store(mut self, store: Store) -> Self {
        self.store = store;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn working_files(&self) -> &BTreeSet<PathBuf> {
        &self.working_files
    }

    pub fn executed_steps(&self) -> &[ExecutedStep] {
        &self.executed
    }

    /// Whether every executed step succeeded.
    pub fn success(&self) -> bool {
        self.executed.iter().all(|step| step.result.success)
    }

    /// Execute the steps, then aggregate and publish.
    pub async fn run(&mut self) -> CoreResult<RunOutcome> {
        info!(steps = self.steps.len(), "starting validation run");

        for step in &self.steps {
            let started = Instant::now();
            debug!(step = %step.name(), "executing step");

            let (shape, mut result) = step.invoke(&self.store, &self.working_files).await?;
            let duration_ms = started.elapsed().as_millis() as u64;

            let updates = std::mem::take(&mut result.store_updates);
            self.store.merge(updates);
            self.working_files.extend(result.new_files.iter().cloned());

            if result.success {
                info!(step = %step.name(), duration_ms, "step passed");
            } else {
                warn!(
                    step = %step.name(),
                    duration_ms,
                    file_errors = result.file_errors.len(),
                    "step failed"
                );
            }

            let skip = result.skip_remaining;
            self.executed.push(ExecutedStep {
                name: step.name().to_string(),
                shape,
                result,
                duration_ms,
            });

            if skip {
                info!(step = %step.name(), "skipping remaining steps");
                self.skipped_at = Some(step.name().to_string());
                break;
            }
        }

        let results = AggregatedResults::from_executed(&self.executed);
        let published = aggregator::publish(&self.store, &results).await?;

        Ok(RunOutcome {
            success: results.success,
            skipped_at: self.skipped_at.clone(),
            executed_steps: self.executed.len(),
            results,
            published,
        })
    }
}
