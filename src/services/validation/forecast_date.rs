//! Forecast date checks.

use std::collections::BTreeSet;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tracing::{error, info, warn};

use hub_validations_core::{CoreResult, Store};
use hub_validations_pipeline::{PerFileStep, StepResult};

use crate::storage::files::CsvDocument;

use super::{config, error_key, mirror_path};

const FORECAST_DATE_COLUMN: &str = "forecast_date";

/// Check that a date string has exactly three dash-separated components with
/// a two-digit month and day.
pub fn check_date_format(date: &str) -> Result<(), String> {
    let parts: Vec<&str> = date.split('-').collect();
    let [_, month, day] = parts.as_slice() else {
        return Err(format!(
            "error while parsing date string {}; expected 3 dash-separated components, found {}",
            date,
            parts.len()
        ));
    };
    if month.len() != 2 {
        return Err(format!("error while parsing date string {}; must have 2-digit month", date));
    }
    if day.len() != 2 {
        return Err(format!("error while parsing date string {}; must have 2-digit day", date));
    }
    Ok(())
}

/// Checks that each forecast file carries a single forecast date equal to
/// the date in its filename, and warns about new files not made recently.
pub struct CheckForecastDates {
    today: Option<NaiveDate>,
}

impl CheckForecastDates {
    /// Compare against the current UTC date.
    pub fn new() -> Self {
        Self { today: None }
    }

    /// Compare against a fixed date.
    pub fn on(today: NaiveDate) -> Self {
        Self { today: Some(today) }
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }
}

impl Default for CheckForecastDates {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PerFileStep for CheckForecastDates {
    async fn execute(&self, store: &Store, files: &BTreeSet<PathBuf>) -> CoreResult<StepResult> {
        let config = config(store)?;
        let today = self.today();
        let mut result = StepResult::passed();

        for file in files {
            let key = error_key(config, file);
            info!(path = %key.display(), "checking forecast dates");

            let document = match CsvDocument::read(file) {
                Ok(document) => document,
                Err(e) => {
                    result.success = false;
                    result.add_file_error(&key, format!("Forecast file could not be read: {}", e));
                    continue;
                }
            };
            let Some(column) = document.column(FORECAST_DATE_COLUMN) else {
                error!(path = %key.display(), "missing forecast_date column");
                result.success = false;
                result.add_file_error(
                    &key,
                    "Forecast files must have a column named forecast_date that contains the \
                     forecast date of the file.",
                );
                continue;
            };

            let mut unparseable = false;
            let mut dates = BTreeSet::new();
            for value in column {
                if let Err(e) = check_date_format(value) {
                    result.success = false;
                    result.add_file_error(
                        &key,
                        format!(
                            "column forecast_date contains dates that are not in the YYYY-MM-DD \
                             format; specifically, {}",
                            e
                        ),
                    );
                }
                match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
                    Ok(date) => {
                        dates.insert(date);
                    }
                    Err(e) => {
                        unparseable = true;
                        result.success = false;
                        result.add_file_error(
                            &key,
                            format!(
                                "column forecast_date contains dates that are not parseable; \
                                 specifically, {} ({})",
                                value, e
                            ),
                        );
                    }
                }
            }

            let file_name = file.file_name().and_then(|n| n.to_str()).unwrap_or("");
            let filename_date = file_name
                .get(..10)
                .ok_or_else(|| "filename is too short to hold a date".to_string())
                .and_then(|prefix| {
                    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").map_err(|e| format!("{} ({})", prefix, e))
                });
            let filename_date = match filename_date {
                Ok(date) => date,
                Err(e) => {
                    result.success = false;
                    result.add_file_error(
                        &key,
                        format!("filename contains dates that are not parseable; specifically, {}", e),
                    );
                    continue;
                }
            };
            if unparseable {
                continue;
            }

            if dates.len() > 1 {
                let listed: Vec<String> = dates.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect();
                result.success = false;
                result.add_file_error(
                    &key,
                    format!(
                        "Forecast file contains multiple forecast dates: {}. There must only be \
                         one unique forecast date in one forecast file.",
                        listed.join(", ")
                    ),
                );
            }
            for date in dates.iter().filter(|date| **date != filename_date) {
                error!(path = %key.display(), filename = %filename_date, column = %date, "forecast dates do not match");
                result.success = false;
                result.add_file_error(
                    &key,
                    format!(
                        "date in filename does not match date in `forecast_date` column: {} vs {}.",
                        filename_date, date
                    ),
                );
            }

            let is_update = key
                .to_str()
                .map(|path| mirror_path(config, path).exists())
                .unwrap_or(false);
            if (filename_date - today).num_days().abs() > 1 && !is_update {
                warn!(path = %key.display(), forecast_date = %filename_date, %today, "forecast file is not made today");
                result.comments.push(format!(
                    "⚠️ Warning: The forecast file {} is not made today. date of the forecast - {}, \
                     today - {}.",
                    key.display(),
                    filename_date,
                    today
                ));
            }
        }

        if result.success {
            info!("forecast date validation successful");
            result.comments.push("✔️ Forecast date validation successful.".to_string());
        }
        Ok(result)
    }
}
