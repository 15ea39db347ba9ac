//! Local File Storage
//!
//! Persists downloaded pull-request and baseline files, and reads them back
//! as CSV documents, forecast tables, population tables and metadata
//! documents.

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use hub_validations_pipeline::retraction::KEY_COLUMNS;
use hub_validations_pipeline::{ForecastKey, ForecastTable};

use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::ensure_parent_dir;

/// Name of the value column of a forecast table.
pub const VALUE_COLUMN: &str = "value";

/// Write bytes to a file, creating parent directories.
pub fn write_file(path: &Path, bytes: &[u8]) -> AppResult<()> {
    ensure_parent_dir(path)?;
    fs::write(path, bytes)?;
    Ok(())
}

// ============================================================================
// CSV
// ============================================================================

/// A CSV file read fully into memory, cells trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvDocument {
    headers: Vec<String>,
    records: Vec<Vec<String>>,
}

impl CsvDocument {
    /// Read a CSV file.
    pub fn read(path: &Path) -> AppResult<Self> {
        let file = fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Read CSV content from any reader.
    pub fn from_reader<R: Read>(reader: R) -> AppResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.iter().map(String::from).collect();
        let records = reader
            .records()
            .map(|record| record.map(|r| r.iter().map(String::from).collect()))
            .collect::<Result<Vec<Vec<String>>, csv::Error>>()?;

        Ok(Self { headers, records })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[Vec<String>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Position of a column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// All cells of a column, if present.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.column_index(name)?;
        Some(
            self.records
                .iter()
                .map(|record| record.get(index).map(String::as_str).unwrap_or(""))
                .collect(),
        )
    }
}

/// Parse a forecast cell; empty, `NA` and `NaN` (any case) cells are nulls.
///
/// Infinite values are rejected so that every non-null value compares equal
/// to itself.
pub fn parse_forecast_value(raw: &str) -> Result<Option<f64>, String> {
    if raw.is_empty() || raw == "NA" || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    let value = raw
        .parse::<f64>()
        .map_err(|_| format!("'{}' is not a number", raw))?;
    if !value.is_finite() {
        return Err(format!("'{}' is not a finite number", raw));
    }
    Ok(Some(value))
}

/// Build a forecast table from a CSV document.
pub fn forecast_table(document: &CsvDocument) -> AppResult<ForecastTable> {
    let mut key_indices = Vec::with_capacity(KEY_COLUMNS.len());
    for column in KEY_COLUMNS {
        let index = document
            .column_index(column)
            .ok_or_else(|| AppError::validation(format!("missing column '{}'", column)))?;
        key_indices.push(index);
    }
    let value_index = document
        .column_index(VALUE_COLUMN)
        .ok_or_else(|| AppError::validation(format!("missing column '{}'", VALUE_COLUMN)))?;

    let mut table = ForecastTable::new();
    for (row, record) in document.records().iter().enumerate() {
        let cell = |index: usize| record.get(index).cloned().unwrap_or_default();
        let key = ForecastKey::new(
            cell(key_indices[0]),
            cell(key_indices[1]),
            cell(key_indices[2]),
            cell(key_indices[3]),
            cell(key_indices[4]),
            cell(key_indices[5]),
        );
        let value = parse_forecast_value(&cell(value_index))
            .map_err(|e| AppError::validation(format!("row {}: {}", row + 2, e)))?;
        table.insert(key, value)?;
    }
    Ok(table)
}

/// Read a forecast CSV file as a table.
pub fn read_forecast_table(path: &Path) -> AppResult<ForecastTable> {
    forecast_table(&CsvDocument::read(path)?)
}

/// Read a population CSV (`location`, `population`) into a lookup.
pub fn read_population_table(path: &Path) -> AppResult<BTreeMap<String, f64>> {
    let document = CsvDocument::read(path)?;
    let locations = document
        .column("location")
        .ok_or_else(|| AppError::validation("population file has no 'location' column"))?;
    let populations = document
        .column("population")
        .ok_or_else(|| AppError::validation("population file has no 'population' column"))?;

    let mut table = BTreeMap::new();
    for (location, population) in locations.into_iter().zip(populations) {
        if let Ok(Some(population)) = parse_forecast_value(population) {
            table.insert(location.to_string(), population);
        }
    }
    Ok(table)
}

// ============================================================================
// Metadata
// ============================================================================

/// A YAML metadata document, kept with its raw text so that the literal
/// spelling of scalars can be checked.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataDocument {
    raw: String,
    values: serde_yaml::Mapping,
}

impl MetadataDocument {
    /// Read a metadata file.
    pub fn read(path: &Path) -> AppResult<Self> {
        let raw = fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Parse metadata text; the document must be a mapping.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(raw)?;
        let values = match value {
            serde_yaml::Value::Mapping(mapping) => mapping,
            serde_yaml::Value::Null => serde_yaml::Mapping::new(),
            _ => return Err(AppError::validation("metadata document is not a key-value mapping")),
        };
        Ok(Self {
            raw: raw.to_string(),
            values,
        })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.values.get(key)
    }

    /// A scalar value rendered as text.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            serde_yaml::Value::String(s) => Some(s.clone()),
            serde_yaml::Value::Bool(b) => Some(b.to_string()),
            serde_yaml::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// The literal text of a top-level scalar, without quotes.
    pub fn raw_scalar(&self, key: &str) -> Option<&str> {
        self.raw.lines().find_map(|line| {
            let rest = line.strip_prefix(key)?;
            let value = rest.trim_start().strip_prefix(':')?;
            let value = value.split(" #").next().unwrap_or(value).trim();
            Some(value.trim_matches(|c| c == '"' || c == '\''))
        })
    }
}
