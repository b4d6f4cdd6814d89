//! Enrollment Data Loader Module
//! Handles semicolon-delimited CSV loading and the year/region views using Polars.

use crate::data::schema::{SchemaReport, REGION, REQUIRED_COLUMNS, TEXT_COLUMNS, YEAR};
use log::{info, warn};
use polars::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Field separator of the enrollment dataset.
pub const SEPARATOR: u8 = b';';

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path} is not valid UTF-8: {source}")]
    Encoding {
        path: PathBuf,
        source: std::string::FromUtf8Error,
    },
    #[error("CSV has no header row")]
    EmptyFile,
    #[error("Failed to split CSV records: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to load CSV: {0}")]
    Polars(#[from] PolarsError),
    #[error("Required column '{0}' is missing")]
    MissingColumn(String),
}

/// An immutable table of enrollment records.
///
/// Filtering returns a new `Table`; the source frame is never modified so a
/// loaded table can be shared freely between render passes.
#[derive(Debug, Clone)]
pub struct Table {
    df: DataFrame,
    schema: SchemaReport,
}

impl Table {
    /// Wrap a DataFrame, resolving the known column combinations.
    pub fn new(df: DataFrame) -> Result<Self, LoadError> {
        let columns: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        if let Some(missing) = REQUIRED_COLUMNS
            .iter()
            .find(|required| !columns.iter().any(|c| c == *required))
        {
            return Err(LoadError::MissingColumn(missing.to_string()));
        }

        let schema = SchemaReport::from_columns(&columns);
        Ok(Self { df, schema })
    }

    /// Get a reference to the underlying DataFrame.
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn schema(&self) -> &SchemaReport {
        &self.schema
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.df.get_column_index(name).is_some()
    }

    /// Get the number of rows in the table.
    pub fn row_count(&self) -> usize {
        self.df.height()
    }

    /// Academic years in order of first appearance.
    pub fn distinct_years(&self) -> Vec<String> {
        self.distinct_values(YEAR)
    }

    /// Academic regions in order of first appearance.
    pub fn distinct_regions(&self) -> Vec<String> {
        self.distinct_values(REGION)
    }

    /// Rows whose academic year equals `year`.
    pub fn for_year(&self, year: &str) -> Result<Table, LoadError> {
        self.filter_eq(YEAR, year)
    }

    /// Rows whose academic region equals `region`.
    pub fn for_region(&self, region: &str) -> Result<Table, LoadError> {
        self.filter_eq(REGION, region)
    }

    fn filter_eq(&self, column: &str, value: &str) -> Result<Table, LoadError> {
        let df = self
            .df
            .clone()
            .lazy()
            .filter(col(column).eq(lit(value)))
            .collect()?;
        Ok(Table {
            df,
            schema: self.schema.clone(),
        })
    }

    fn distinct_values(&self, column: &str) -> Vec<String> {
        let Ok(values) = self.df.column(column).and_then(|c| c.str()) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        values
            .into_iter()
            .flatten()
            .filter(|v| seen.insert(*v))
            .map(str::to_string)
            .collect()
    }
}

/// Loads the enrollment CSV with a skip-and-continue policy for malformed rows.
pub struct DataLoader;

impl DataLoader {
    /// Load a semicolon-delimited, UTF-8 CSV file.
    pub fn load(path: impl AsRef<Path>) -> Result<Table, LoadError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8(bytes).map_err(|source| LoadError::Encoding {
            path: path.to_path_buf(),
            source,
        })?;

        let table = Self::load_str(&text)?;
        info!(
            "Loaded {} rows from {}",
            table.row_count(),
            path.display()
        );
        Ok(table)
    }

    /// Load CSV content that is already in memory.
    pub fn load_str(text: &str) -> Result<Table, LoadError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let (headers, cleaned) = Self::screen_records(text)?;

        // Identifier columns stay text: codes like "01" or "2A" must survive as written
        let overrides: Schema = TEXT_COLUMNS
            .iter()
            .filter(|name| headers.iter().any(|h| h == **name))
            .map(|name| Field::new((*name).into(), DataType::String))
            .collect();

        // Unparseable cells become null, which aggregation counts as zero
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
            .with_schema_overwrite(Some(Arc::new(overrides)))
            .map_parse_options(|po| po.with_separator(SEPARATOR))
            .into_reader_with_file_handle(Cursor::new(cleaned))
            .finish()?;

        Table::new(df)
    }

    /// Drop every record whose field count differs from the header's.
    ///
    /// Returns the header names and the surviving records re-encoded as CSV.
    fn screen_records(text: &str) -> Result<(Vec<String>, Vec<u8>), LoadError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(SEPARATOR)
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(LoadError::EmptyFile);
        }

        let mut writer = csv::WriterBuilder::new()
            .delimiter(SEPARATOR)
            .from_writer(Vec::new());
        writer.write_record(&headers)?;

        let mut skipped = 0usize;
        for result in reader.records() {
            let record = result?;
            if record.len() != headers.len() {
                let line = record.position().map(|p| p.line()).unwrap_or_default();
                warn!(
                    "Skipping line {}: expected {} fields, found {}",
                    line,
                    headers.len(),
                    record.len()
                );
                skipped += 1;
                continue;
            }
            writer.write_record(&record)?;
        }

        if skipped > 0 {
            info!("Skipped {} malformed rows", skipped);
        }

        let cleaned = writer
            .into_inner()
            .map_err(|e| LoadError::Csv(csv::Error::from(e.into_error())))?;
        let names = headers.iter().map(str::to_string).collect();
        Ok((names, cleaned))
    }
}
