//! Metadata content checks and the team designation rule.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{error, info, warn};

use hub_validations_core::{CoreResult, Store};
use hub_validations_pipeline::designation::team_of;
use hub_validations_pipeline::{check_team_designations, Designation, DesignationMap, HubRemote, Step, StepResult};

use crate::models::config::HubConfig;
use crate::storage::files::MetadataDocument;

use super::keys::METADATA_FILES;
use super::{config, error_key, remote};

/// Schema problems of one metadata document; empty when valid.
///
/// A missing `model_abbr` stops the remaining checks.
pub fn check_metadata_document(document: &MetadataDocument, file_name: &str, config: &HubConfig) -> Vec<String> {
    let schema = &config.metadata_schema;
    let mut errors: Vec<String> = schema
        .required_keys
        .iter()
        .filter(|key| !document.contains_key(key))
        .map(|key| format!("METADATA_ERROR: Cannot find required key '{}'.", key))
        .collect();

    let Some(model_abbr) = document.get_str("model_abbr") else {
        if !schema.required_keys.iter().any(|key| key == "model_abbr") {
            errors.push("METADATA_ERROR: Cannot find required key 'model_abbr'.".to_string());
        }
        return errors;
    };

    let file_model = file_name
        .strip_prefix("metadata-")
        .and_then(|rest| rest.strip_suffix(".txt"))
        .unwrap_or(file_name);
    if file_model != model_abbr {
        errors.push(format!(
            "METADATA_ERROR: Model abreviation in metadata inconsistent with folder name for \
             model_abbr={} as specified in metadata. NOTE: model name on file is: {}",
            model_abbr, file_model
        ));
    }

    for key in &schema.date_keys {
        let Some(value) = document.get_str(key) else {
            continue;
        };
        if NaiveDate::parse_from_str(&value, "%Y-%m-%d").is_err() {
            errors.push(format!(
                "METADATA_ERROR: '{}' must be a date in YYYY-MM-DD format, not '{}'",
                key, value
            ));
        }
    }

    for key in &schema.boolean_keys {
        if !document.contains_key(key) {
            continue;
        }
        let raw = document.raw_scalar(key).unwrap_or("");
        if raw != "true" && raw != "false" {
            errors.push(format!(
                "METADATA_ERROR: '{}' field must be lowercase boolean (true, false) not '{}'",
                key, raw
            ));
        }
    }

    if let Some(license) = document.get_str("license") {
        if !config.accepts_license(&license) {
            errors.push(format!(
                "METADATA_ERROR: 'license' field must be one of the accepted licenses, not '{}'",
                license
            ));
        }
    }

    if let Some(designation) = document.get_str("team_model_designation") {
        if designation.parse::<Designation>().is_err() {
            errors.push(format!(
                "METADATA_ERROR: 'team_model_designation' must be one of primary, secondary, \
                 proposed or other, not '{}'",
                designation
            ));
        }
    }

    errors
}

/// `(team, model_name, designation)` declared by a metadata document.
fn declared_designation(document: &MetadataDocument) -> Option<(String, String, Designation)> {
    let model_abbr = document.get_str("model_abbr")?;
    let model_name = document.get_str("model_name")?;
    let designation = document.get_str("team_model_designation")?.parse().ok()?;
    Some((team_of(&model_abbr).to_string(), model_name, designation))
}

/// Designations of the baseline models of the given teams.
async fn baseline_designations(
    remote: &dyn HubRemote,
    config: &HubConfig,
    teams: &BTreeSet<String>,
) -> CoreResult<DesignationMap> {
    let folder = config.forecast_folder();
    let mut designations = DesignationMap::new();

    for dir in remote.list_baseline_directories(folder).await? {
        if !teams.contains(team_of(&dir)) {
            continue;
        }
        let path = format!("{}/{}/metadata-{}.txt", folder, dir, dir);
        let Some(content) = remote.fetch_baseline_file(&path).await? else {
            continue;
        };
        let document = match MetadataDocument::parse(&String::from_utf8_lossy(&content)) {
            Ok(document) => document,
            Err(e) => {
                warn!(path = %path, error = %e, "unreadable baseline metadata; ignored");
                continue;
            }
        };
        if let Some((team, model, designation)) = declared_designation(&document) {
            designations.insert(team, model, designation);
        }
    }
    Ok(designations)
}

/// Validates every metadata file in the pull request, then checks that the
/// merge keeps at most one primary model per team.
pub struct ValidateMetadataFiles;

#[async_trait]
impl Step for ValidateMetadataFiles {
    async fn execute(&self, store: &Store) -> CoreResult<StepResult> {
        let config = config(store)?;
        let files = store.require(METADATA_FILES)?;

        let mut result = StepResult::passed();
        let mut declared = DesignationMap::new();

        for file in files {
            let key = error_key(config, file);
            info!(path = %key.display(), "checking metadata content");
            let file_name = file.file_name().and_then(|n| n.to_str()).unwrap_or("");

            let errors = match MetadataDocument::read(file) {
                Ok(document) => {
                    if let Some((team, model, designation)) = declared_designation(&document) {
                        declared.insert(team, model, designation);
                    }
                    check_metadata_document(&document, file_name, config)
                }
                Err(e) => vec![format!("METADATA_ERROR: Metadata YAML format error: {}", e)],
            };

            if errors.is_empty() {
                result
                    .comments
                    .push(format!("✔️ {} passed (non-filename) content checks.", key.display()));
                continue;
            }
            result.success = false;
            for e in &errors {
                error!(path = %key.display(), error = %e, "metadata error");
            }
            result.extend_file_errors(
                &key,
                errors
                    .iter()
                    .map(|e| format!("Error when validating metadata content: {}", e)),
            );
        }

        if config.check_team_model_designation && !declared.is_empty() {
            let baseline = baseline_designations(remote(store)?.as_ref(), config, &declared.teams()).await?;
            let check = check_team_designations(&baseline, &declared);
            if let Some(message) = check.error_message() {
                error!(conflicts = check.conflicts.len(), "team model designation conflict");
                result.success = false;
                result.comments.push(message);
            }
        }

        Ok(result)
    }
}
