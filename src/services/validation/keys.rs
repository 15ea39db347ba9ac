//! Store keys written and read by the pull-request validation steps.

use std::collections::BTreeSet;
use std::path::PathBuf;

use hub_validations_core::StoreKey;
use hub_validations_pipeline::FileClassifier;

use crate::models::config::HubConfig;

use super::connection::PullRequestSource;

/// Hub configuration, seeded before the run.
pub const CONFIG: StoreKey<HubConfig> = StoreKey::new("config");

/// Compiled filename rules, seeded before the run.
pub const FILE_CLASSIFIER: StoreKey<FileClassifier> = StoreKey::new("file_classifier");

/// Where the pull request number comes from, seeded before the run.
pub const PULL_REQUEST_SOURCE: StoreKey<PullRequestSource> = StoreKey::new("pull_request_source");

/// Repository paths of modified forecasts whose baseline copy was mirrored.
pub const MIRRORED_FILES: StoreKey<BTreeSet<String>> = StoreKey::new("mirrored_files");

/// Repository paths of existing files the pull request deletes.
pub const DELETED_FILES: StoreKey<BTreeSet<String>> = StoreKey::new("deleted_files");

/// Team-model folders present on the baseline branch.
pub const MODEL_NAMES: StoreKey<BTreeSet<String>> = StoreKey::new("model_names");

/// Local paths of every downloaded pull-request file.
pub const DOWNLOADED_FILES: StoreKey<BTreeSet<PathBuf>> = StoreKey::new("downloaded_files");

/// Local paths of the downloaded metadata files.
pub const METADATA_FILES: StoreKey<BTreeSet<PathBuf>> = StoreKey::new("metadata_files");
