//! Forecast Update Classification
//!
//! Compares a previously published forecast table with its replacement and
//! decides what kind of update the replacement is:
//!
//! - **implicit retraction**: a published row is missing from the new table,
//! - **all duplicate**: every published value is unchanged and no row was added,
//! - **explicit retraction**: a published value was overwritten with null,
//! - otherwise a plain update or extension.
//!
//! Missing rows are checked first and dominate; values are only compared
//! when every published key is still present.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use hub_validations_core::{CoreError, CoreResult};

/// Column names that make up a forecast row key, in key order.
pub const KEY_COLUMNS: [&str; 6] = [
    "forecast_date",
    "target",
    "target_end_date",
    "location",
    "type",
    "quantile",
];

/// How many keys an error message lists before summarizing the rest.
const MAX_LISTED_KEYS: usize = 10;

// ============================================================================
// Forecast Table
// ============================================================================

/// Composite key of a forecast row. Compared as raw text, no normalization.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ForecastKey {
    pub forecast_date: String,
    pub target: String,
    pub target_end_date: String,
    pub location: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub quantile: String,
}

impl ForecastKey {
    pub fn new(
        forecast_date: impl Into<String>,
        target: impl Into<String>,
        target_end_date: impl Into<String>,
        location: impl Into<String>,
        kind: impl Into<String>,
        quantile: impl Into<String>,
    ) -> Self {
        Self {
            forecast_date: forecast_date.into(),
            target: target.into(),
            target_end_date: target_end_date.into(),
            location: location.into(),
            kind: kind.into(),
            quantile: quantile.into(),
        }
    }
}

impl fmt::Display for ForecastKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {}, {}, {})",
            self.forecast_date, self.target, self.target_end_date, self.location, self.kind, self.quantile
        )
    }
}

/// Forecast rows keyed by `ForecastKey`; `None` values are nulls.
///
/// Only the value is kept. Other non-key columns such as `location_name` take
/// no part in the comparison, so a file that changes only those columns is
/// all duplicate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastTable {
    rows: BTreeMap<ForecastKey, Option<f64>>,
}

impl ForecastTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table, rejecting repeated keys.
    pub fn from_rows<I>(rows: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = (ForecastKey, Option<f64>)>,
    {
        let mut table = Self::new();
        for (key, value) in rows {
            table.insert(key, value)?;
        }
        Ok(table)
    }

    /// Add a row; a key may appear only once.
    pub fn insert(&mut self, key: ForecastKey, value: Option<f64>) -> CoreResult<()> {
        if self.rows.contains_key(&key) {
            return Err(CoreError::validation(format!("duplicate forecast row {}", key)));
        }
        self.rows.insert(key, value);
        Ok(())
    }

    /// Value at a key: `None` when absent, `Some(None)` when null.
    pub fn get(&self, key: &ForecastKey) -> Option<Option<f64>> {
        self.rows.get(key).copied()
    }

    pub fn contains_key(&self, key: &ForecastKey) -> bool {
        self.rows.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ForecastKey, Option<f64>)> {
        self.rows.iter().map(|(key, value)| (key, *value))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Outcome of comparing a published forecast with its replacement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetractionCheckResult {
    pub has_implicit_retraction: bool,
    pub has_explicit_retraction: bool,
    pub is_all_duplicate: bool,
    /// Published keys missing from the new table
    pub missing_keys: Vec<ForecastKey>,
    /// Published keys whose value was set to null
    pub nulled_keys: Vec<ForecastKey>,
    pub error: Option<String>,
}

impl RetractionCheckResult {
    /// A plain update: nothing retracted, something changed or was added.
    pub fn has_no_retraction_or_duplication(&self) -> bool {
        !(self.has_implicit_retraction || self.has_explicit_retraction || self.is_all_duplicate)
    }
}

/// Classify `new` as an update of `old`.
pub fn compare_forecasts(old: &ForecastTable, new: &ForecastTable) -> RetractionCheckResult {
    let missing_keys: Vec<ForecastKey> = old
        .rows
        .keys()
        .filter(|key| !new.contains_key(key))
        .cloned()
        .collect();

    if !missing_keys.is_empty() {
        let error = format!("implicit retractions: {}", list_keys(&missing_keys));
        return RetractionCheckResult {
            has_implicit_retraction: true,
            missing_keys,
            error: Some(error),
            ..RetractionCheckResult::default()
        };
    }

    let mut all_equal = true;
    let mut nulled_keys = Vec::new();
    for (key, old_value) in old.iter() {
        let new_value = new.get(key).flatten();
        if old_value != new_value {
            all_equal = false;
            if new_value.is_none() {
                nulled_keys.push(key.clone());
            }
        }
    }

    if all_equal && old.len() == new.len() {
        return RetractionCheckResult {
            is_all_duplicate: true,
            error: Some("Forecast is all duplicate.".to_string()),
            ..RetractionCheckResult::default()
        };
    }

    RetractionCheckResult {
        has_explicit_retraction: !nulled_keys.is_empty(),
        nulled_keys,
        ..RetractionCheckResult::default()
    }
}

fn list_keys(keys: &[ForecastKey]) -> String {
    let mut listed: Vec<String> = keys
        .iter()
        .take(MAX_LISTED_KEYS)
        .map(ToString::to_string)
        .collect();
    if keys.len() > MAX_LISTED_KEYS {
        listed.push(format!("and {} more", keys.len() - MAX_LISTED_KEYS));
    }
    listed.join(", ")
}
