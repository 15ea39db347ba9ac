//! Team Model Designations
//!
//! Every model declares a `team_model_designation` in its metadata. A team
//! may have any number of models but at most one `primary` one. A pull
//! request's declarations are merged over the baseline declarations of the
//! teams it touches, and the merged map is checked for that rule.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use hub_validations_core::CoreError;

/// A model's status within its team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Designation {
    Primary,
    Secondary,
    Proposed,
    Other,
}

impl Designation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Designation::Primary => "primary",
            Designation::Secondary => "secondary",
            Designation::Proposed => "proposed",
            Designation::Other => "other",
        }
    }
}

impl std::fmt::Display for Designation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Designation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(Designation::Primary),
            "secondary" => Ok(Designation::Secondary),
            "proposed" => Ok(Designation::Proposed),
            "other" => Ok(Designation::Other),
            other => Err(CoreError::parse(format!(
                "'{}' is not a team_model_designation (expected primary, secondary, proposed or other)",
                other
            ))),
        }
    }
}

/// Team abbreviation of a `team-model` abbreviation (text before the first `-`).
pub fn team_of(model_abbr: &str) -> &str {
    model_abbr.split('-').next().unwrap_or(model_abbr)
}

// ============================================================================
// Designation Map
// ============================================================================

/// Designations keyed by team, then by model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesignationMap {
    teams: BTreeMap<String, BTreeMap<String, Designation>>,
}

impl DesignationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a model's designation, replacing any earlier one.
    pub fn insert(&mut self, team: impl Into<String>, model: impl Into<String>, designation: Designation) {
        self.teams
            .entry(team.into())
            .or_default()
            .insert(model.into(), designation);
    }

    pub fn get(&self, team: &str, model: &str) -> Option<Designation> {
        self.teams.get(team).and_then(|models| models.get(model)).copied()
    }

    /// Teams with at least one entry.
    pub fn teams(&self) -> BTreeSet<String> {
        self.teams.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Only the entries of the given teams.
    pub fn restricted_to(&self, teams: &BTreeSet<String>) -> Self {
        let teams = self
            .teams
            .iter()
            .filter(|(team, _)| teams.contains(*team))
            .map(|(team, models)| (team.clone(), models.clone()))
            .collect();
        Self { teams }
    }

    /// Deep merge: `overlay` wins per (team, model); other entries survive.
    pub fn merged_with(&self, overlay: &DesignationMap) -> Self {
        let mut merged = self.clone();
        for (team, models) in &overlay.teams {
            let entry = merged.teams.entry(team.clone()).or_default();
            for (model, designation) in models {
                entry.insert(model.clone(), *designation);
            }
        }
        merged
    }

    /// Models of a team designated `primary`, in name order.
    pub fn primary_models(&self, team: &str) -> Vec<&str> {
        self.teams
            .get(team)
            .map(|models| {
                models
                    .iter()
                    .filter(|(_, designation)| **designation == Designation::Primary)
                    .map(|(model, _)| model.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ============================================================================
// Check
// ============================================================================

/// A team with more than one primary model after the merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignationConflict {
    pub team: String,
    pub models: Vec<String>,
}

/// Result of merging pull-request designations over the baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignationCheck {
    pub merged: DesignationMap,
    pub conflicts: Vec<DesignationConflict>,
}

impl DesignationCheck {
    pub fn is_valid(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Message naming every conflicting team-model pair, if any.
    pub fn error_message(&self) -> Option<String> {
        if self.is_valid() {
            return None;
        }
        let pairs: Vec<String> = self
            .conflicts
            .iter()
            .flat_map(|conflict| {
                conflict
                    .models
                    .iter()
                    .map(move |model| format!("'{}-{}'", conflict.team, model))
            })
            .collect();
        Some(format!(
            "❌ PR merge would result in team_model_designations with more than one 'primary' \
             model for the same team: {}",
            pairs.join(", ")
        ))
    }
}

/// Merge `pull_request` over the part of `baseline` it touches and check
/// that no team ends up with two primary models.
pub fn check_team_designations(baseline: &DesignationMap, pull_request: &DesignationMap) -> DesignationCheck {
    let touched = pull_request.teams();
    let merged = baseline.restricted_to(&touched).merged_with(pull_request);

    let conflicts = merged
        .teams()
        .into_iter()
        .filter_map(|team| {
            let primaries = merged.primary_models(&team);
            (primaries.len() >= 2).then(|| DesignationConflict {
                models: primaries.into_iter().map(String::from).collect(),
                team,
            })
        })
        .collect();

    DesignationCheck { merged, conflicts }
}
