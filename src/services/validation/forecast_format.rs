//! Forecast file format and value checks.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, error, info};

use hub_validations_core::{CoreResult, Store};
use hub_validations_pipeline::retraction::KEY_COLUMNS;
use hub_validations_pipeline::{PerFileStep, StepResult};

use crate::storage::files::{parse_forecast_value, read_population_table, CsvDocument, VALUE_COLUMN};

use super::forecast_date::check_date_format;
use super::{config, error_key};

/// Columns a forecast file may carry besides the key and value columns.
const OPTIONAL_COLUMNS: [&str; 1] = ["location_name"];

const DATE_COLUMNS: [&str; 2] = ["forecast_date", "target_end_date"];

const MAX_REPORTED_ROW_ERRORS: usize = 20;

/// Structural problems of a forecast table; empty when well formed.
pub fn check_forecast_format(document: &CsvDocument) -> Vec<String> {
    let mut errors = Vec::new();

    let required: Vec<&str> = KEY_COLUMNS.iter().copied().chain([VALUE_COLUMN]).collect();
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|column| document.column_index(column).is_none())
        .collect();
    if !missing.is_empty() {
        errors.push(format!("invalid header: missing column(s) {}", missing.join(", ")));
    }
    let unexpected: Vec<&str> = document
        .headers()
        .iter()
        .map(String::as_str)
        .filter(|header| !required.contains(header) && !OPTIONAL_COLUMNS.contains(header))
        .collect();
    if !unexpected.is_empty() {
        errors.push(format!("invalid header: unexpected column(s) {}", unexpected.join(", ")));
    }
    if !errors.is_empty() {
        return errors;
    }
    if document.is_empty() {
        return vec!["file contains no forecast rows".to_string()];
    }

    let index: BTreeMap<&str, usize> = required
        .iter()
        .filter_map(|column| document.column_index(column).map(|i| (*column, i)))
        .collect();

    let mut row_errors = Vec::new();
    let mut seen = BTreeSet::new();
    for (i, record) in document.records().iter().enumerate() {
        let row = i + 2;
        let cell = |column: &str| {
            index
                .get(column)
                .and_then(|i| record.get(*i))
                .map(String::as_str)
                .unwrap_or("")
        };

        for column in DATE_COLUMNS {
            let value = cell(column);
            if check_date_format(value).is_err() || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() {
                row_errors.push(format!("row {}: {} '{}' is not a YYYY-MM-DD date", row, column, value));
            }
        }
        if cell("target").is_empty() {
            row_errors.push(format!("row {}: target is empty", row));
        }
        if cell("location").is_empty() {
            row_errors.push(format!("row {}: location is empty", row));
        }

        let quantile = cell("quantile");
        match cell("type") {
            "point" => {
                if !matches!(quantile, "" | "NA") {
                    row_errors.push(format!(
                        "row {}: point forecasts must have an empty or NA quantile, not '{}'",
                        row, quantile
                    ));
                }
            }
            "quantile" => match quantile.parse::<f64>() {
                Ok(q) if (0.0..=1.0).contains(&q) => {}
                _ => row_errors.push(format!(
                    "row {}: quantile must be a number between 0 and 1, not '{}'",
                    row, quantile
                )),
            },
            other => row_errors.push(format!(
                "row {}: type must be 'point' or 'quantile', not '{}'",
                row, other
            )),
        }

        if let Err(e) = parse_forecast_value(cell(VALUE_COLUMN)) {
            row_errors.push(format!("row {}: value {}", row, e));
        }

        let key: Vec<&str> = KEY_COLUMNS.iter().map(|column| cell(*column)).collect();
        if !seen.insert(key.clone()) {
            row_errors.push(format!("row {}: duplicate forecast for ({})", row, key.join(", ")));
        }
    }

    if row_errors.len() > MAX_REPORTED_ROW_ERRORS {
        let more = row_errors.len() - MAX_REPORTED_ROW_ERRORS;
        row_errors.truncate(MAX_REPORTED_ROW_ERRORS);
        row_errors.push(format!("and {} more row error(s)", more));
    }
    errors.extend(row_errors);
    errors
}

/// Flags forecast values not smaller than the population of their location.
/// Rows are reported by zero-based data row index.
pub fn check_forecast_values(document: &CsvDocument, populations: &BTreeMap<String, f64>) -> Option<String> {
    let location = document.column_index("location")?;
    let value = document.column_index(VALUE_COLUMN)?;

    let invalid: Vec<usize> = document
        .records()
        .iter()
        .enumerate()
        .filter_map(|(i, record)| {
            let population = populations.get(record.get(location)?)?;
            let forecast = parse_forecast_value(record.get(value)?).ok().flatten()?;
            (forecast >= *population).then_some(i)
        })
        .collect();

    if invalid.is_empty() {
        return None;
    }
    Some(format!(
        "Found {} predictions with forecasted value larger than population size of locality \
         in your file, at row(s) {:?}",
        invalid.len(),
        invalid
    ))
}

/// Checks the format of every forecast file, then sanity-checks the values
/// of the well-formed ones against location populations.
pub struct ValidateForecastFiles;

#[async_trait]
impl PerFileStep for ValidateForecastFiles {
    async fn execute(&self, store: &Store, files: &BTreeSet<PathBuf>) -> CoreResult<StepResult> {
        let config = config(store)?;
        let populations = match &config.population_file {
            Some(path) => Some(read_population_table(path)?),
            None => None,
        };

        let mut result = StepResult::passed();
        for file in files {
            let key = error_key(config, file);
            info!(path = %key.display(), "checking forecast format");

            let (document, format_errors) = match CsvDocument::read(file) {
                Ok(document) => {
                    let errors = check_forecast_format(&document);
                    (Some(document), errors)
                }
                Err(e) => (None, vec![format!("could not read CSV: {}", e)]),
            };

            let document = match document {
                Some(document) if format_errors.is_empty() => {
                    result
                        .comments
                        .push(format!("✔️ {} passed (non-filename) format checks.", key.display()));
                    document
                }
                _ => {
                    for e in &format_errors {
                        error!(path = %key.display(), error = %e, "format error");
                    }
                    result.success = false;
                    result.extend_file_errors(
                        &key,
                        format_errors.iter().map(|e| format!("Error when validating format: {}", e)),
                    );
                    result.add_file_error(
                        &key,
                        "Error when validating forecast values: skipped due to incorrect file format",
                    );
                    continue;
                }
            };

            let Some(populations) = &populations else {
                debug!("no population file configured; skipping value checks");
                continue;
            };
            match check_forecast_values(&document, populations) {
                Some(message) => {
                    error!(path = %key.display(), error = %message, "value error");
                    result.success = false;
                    result.add_file_error(&key, format!("Error when validating forecast values: {}", message));
                }
                None => result
                    .comments
                    .push(format!("✔️ {} passed forecast value sanity checks.", key.display())),
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::validation::testing::{fixture, FakeRemote};

    const HEADER: &str = "forecast_date,target,target_end_date,location,type,quantile,value\n";
    const GOOD: &str = "\
forecast_date,target,target_end_date,location,type,quantile,value
2022-03-07,1 wk ahead inc death,2022-03-12,US,point,NA,1000
2022-03-07,1 wk ahead inc death,2022-03-12,US,quantile,0.5,1000
2022-03-07,1 wk ahead inc death,2022-03-12,06,quantile,0.5,NA
";

    fn document(content: &str) -> CsvDocument {
        CsvDocument::from_reader(content.as_bytes()).unwrap()
    }

    #[test]
    fn test_well_formed_forecast() {
        assert!(check_forecast_format(&document(GOOD)).is_empty());
    }

    #[test]
    fn test_header_errors() {
        let errors = check_forecast_format(&document("forecast_date,target,extra\n2022-03-07,x,y\n"));
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("invalid header: missing column(s) target_end_date"));
        assert_eq!(errors[1], "invalid header: unexpected column(s) extra");
    }

    #[test]
    fn test_row_errors() {
        let content = format!(
            "{}{}{}{}",
            HEADER,
            "2022-3-07,1 wk ahead inc death,2022-03-12,US,point,0.5,1000\n",
            "2022-03-07,1 wk ahead inc death,2022-03-12,US,range,NA,lots\n",
            "2022-03-07,1 wk ahead inc death,2022-03-12,US,quantile,1.5,1\n",
        );
        let errors = check_forecast_format(&document(&content));
        assert!(errors.iter().any(|e| e.starts_with("row 2: forecast_date '2022-3-07'")));
        assert!(errors.iter().any(|e| e.starts_with("row 2: point forecasts")));
        assert!(errors.iter().any(|e| e.starts_with("row 3: type must be")));
        assert!(errors.iter().any(|e| e.starts_with("row 3: value")));
        assert!(errors.iter().any(|e| e.starts_with("row 4: quantile must be")));
    }

    #[test]
    fn test_infinite_value_is_a_row_error() {
        let content = format!(
            "{}{}{}",
            HEADER,
            "2022-03-07,1 wk ahead inc death,2022-03-12,US,point,NA,inf\n",
            "2022-03-07,1 wk ahead inc death,2022-03-12,06,point,NA,nan\n",
        );
        let errors = check_forecast_format(&document(&content));
        assert_eq!(errors, vec!["row 2: value 'inf' is not a finite number"]);
    }

    #[test]
    fn test_duplicate_rows() {
        let content = format!(
            "{}{}{}",
            HEADER,
            "2022-03-07,1 wk ahead inc death,2022-03-12,US,point,NA,1\n",
            "2022-03-07,1 wk ahead inc death,2022-03-12,US,point,NA,2\n",
        );
        let errors = check_forecast_format(&document(&content));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("row 3: duplicate forecast"));
    }

    #[test]
    fn test_row_errors_are_capped() {
        let mut content = HEADER.to_string();
        for _ in 0..30 {
            content.push_str("2022-03-07,t,2022-03-12,US,other,NA,1\n");
        }
        let errors = check_forecast_format(&document(&content));
        assert_eq!(errors.len(), MAX_REPORTED_ROW_ERRORS + 1);
        assert!(errors.last().unwrap().starts_with("and "));
    }

    #[test]
    fn test_population_check() {
        let populations: BTreeMap<String, f64> = [("US".to_string(), 1000.0)].into_iter().collect();
        let message = check_forecast_values(&document(GOOD), &populations).unwrap();
        assert_eq!(
            message,
            "Found 2 predictions with forecasted value larger than population size of locality \
             in your file, at row(s) [0, 1]"
        );

        let populations: BTreeMap<String, f64> = [("US".to_string(), 1e9)].into_iter().collect();
        assert!(check_forecast_values(&document(GOOD), &populations).is_none());
    }

    #[tokio::test]
    async fn test_step_reports_per_file() {
        let mut fixture = fixture(FakeRemote::new("owner/hub"));
        let good = fixture.write_pr_file("data-processed/a-b/2022-03-07-a-b.csv", GOOD);
        let bad = fixture.write_pr_file("data-processed/a-b/2022-03-14-a-b.csv", "forecast_date\n2022-03-14\n");

        let population = fixture.temp.path().join("locations.csv");
        std::fs::write(&population, "location,population\nUS,500\n").unwrap();
        let mut config = fixture.config.clone();
        config.population_file = Some(population);
        fixture.set_config(config);

        let files: BTreeSet<PathBuf> = [good, bad].into_iter().collect();
        let result = ValidateForecastFiles.execute(&fixture.store, &files).await.unwrap();

        assert!(!result.success);
        let bad_errors = &result.file_errors[&PathBuf::from("data-processed/a-b/2022-03-14-a-b.csv")];
        assert!(bad_errors[0].starts_with("Error when validating format: invalid header"));
        assert_eq!(
            bad_errors.last().unwrap(),
            "Error when validating forecast values: skipped due to incorrect file format"
        );

        let good_errors = &result.file_errors[&PathBuf::from("data-processed/a-b/2022-03-07-a-b.csv")];
        assert_eq!(good_errors.len(), 1);
        assert!(good_errors[0].starts_with("Error when validating forecast values: Found 2"));
        assert_eq!(
            result.comments,
            vec!["✔️ data-processed/a-b/2022-03-07-a-b.csv passed (non-filename) format checks."]
        );
    }

    #[tokio::test]
    async fn test_step_without_population_file() {
        let fixture = fixture(FakeRemote::new("owner/hub"));
        let good = fixture.write_pr_file("data-processed/a-b/2022-03-07-a-b.csv", GOOD);
        let files: BTreeSet<PathBuf> = [good].into_iter().collect();

        let result = ValidateForecastFiles.execute(&fixture.store, &files).await.unwrap();
        assert!(result.success);
        assert_eq!(result.comments.len(), 1);
    }
}
