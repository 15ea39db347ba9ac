//! Well-known store keys read by the engine when it hands a finished run to
//! the result aggregator. Application steps declare their own keys next to
//! the steps that write them.

use std::sync::Arc;

use hub_validations_core::StoreKey;

use crate::models::{ClassifiedFiles, LabelVocabulary, PullRequest};
use crate::remote::HubRemote;

/// Connection to the hub repository.
pub const REMOTE: StoreKey<Arc<dyn HubRemote>> = StoreKey::new("remote");

/// The pull request under validation.
pub const PULL_REQUEST: StoreKey<PullRequest> = StoreKey::new("pull_request");

/// Changed files grouped by kind.
pub const CLASSIFIED_FILES: StoreKey<ClassifiedFiles> = StoreKey::new("classified_files");

/// Labels defined in the hub repository.
pub const POSSIBLE_LABELS: StoreKey<LabelVocabulary> = StoreKey::new("possible_labels");

/// Whether automerge is enabled for this hub.
pub const AUTOMERGE: StoreKey<bool> = StoreKey::new("automerge");
