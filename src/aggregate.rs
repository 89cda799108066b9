//! Aggregation of the raw semicolon-delimited daily files into one frame

use crate::error::{EtlError, Result};
use crate::schema::RAW_INTEGER_COLUMNS;
use csv::ReaderBuilder;
use hashbrown::{HashMap, HashSet};
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Column values collected across all files
#[derive(Debug)]
enum ColumnValues {
    Integer(Vec<Option<i64>>),
    Text(Vec<Option<String>>),
}

impl ColumnValues {
    fn for_column(name: &str, rows_so_far: usize) -> Self {
        if RAW_INTEGER_COLUMNS.contains(&name) {
            ColumnValues::Integer(vec![None; rows_so_far])
        } else {
            ColumnValues::Text(vec![None; rows_so_far])
        }
    }

    fn len(&self) -> usize {
        match self {
            ColumnValues::Integer(values) => values.len(),
            ColumnValues::Text(values) => values.len(),
        }
    }

    fn push_null(&mut self) {
        match self {
            ColumnValues::Integer(values) => values.push(None),
            ColumnValues::Text(values) => values.push(None),
        }
    }

    fn into_series(self, name: &str) -> Series {
        match self {
            ColumnValues::Integer(values) => Series::new(name, values),
            ColumnValues::Text(values) => Series::new(name, values),
        }
    }
}

/// Concatenates raw daily files, keeping every source column
#[derive(Debug, Default)]
pub struct RawAggregator {
    /// Column name to position in `columns`, in first-seen order
    index: HashMap<String, usize>,
    columns: Vec<(String, ColumnValues)>,
    rows: usize,
}

impl RawAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files in `dir` that will be read, in directory listing order
    pub fn list_files(dir: &Path, placeholder: &str) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && entry.file_name() != placeholder {
                files.push(path);
            }
        }
        Ok(files)
    }

    /// Append all rows of one `;`-delimited file
    pub fn add_file(&mut self, path: &Path) -> Result<usize> {
        let file_name = path.display().to_string();
        let csv_error = |e: csv::Error| EtlError::Csv {
            file: file_name.clone(),
            message: e.to_string(),
        };

        let mut rdr = ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .from_path(path)
            .map_err(csv_error)?;

        let headers = rdr.headers().map_err(csv_error)?.clone();
        let mut seen = HashSet::new();
        if let Some(repeated) = headers.iter().find(|h| !seen.insert(*h)) {
            return Err(EtlError::Csv {
                file: file_name.clone(),
                message: format!("header '{}' appears more than once", repeated),
            });
        }
        let positions: Vec<usize> = headers.iter().map(|h| self.column_position(h)).collect();

        let mut added = 0;
        for result in rdr.records() {
            let record = result.map_err(csv_error)?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            for (field, &position) in record.iter().zip(positions.iter()) {
                let (column, values) = &mut self.columns[position];
                let field = field.trim();
                match values {
                    ColumnValues::Integer(values) => {
                        values.push(parse_integer(field).map_err(|_| EtlError::Parse {
                            file: file_name.clone(),
                            line,
                            column: column.clone(),
                            value: field.to_string(),
                        })?);
                    }
                    ColumnValues::Text(values) => {
                        values.push((!field.is_empty()).then(|| field.to_string()));
                    }
                }
            }

            self.rows += 1;
            added += 1;
            // Columns this file lacks, or a short record, are null for this row
            for (_, values) in self.columns.iter_mut() {
                if values.len() < self.rows {
                    values.push_null();
                }
            }
        }

        Ok(added)
    }

    fn column_position(&mut self, name: &str) -> usize {
        if let Some(&position) = self.index.get(name) {
            return position;
        }
        let position = self.columns.len();
        self.columns
            .push((name.to_string(), ColumnValues::for_column(name, self.rows)));
        self.index.insert(name.to_string(), position);
        position
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Build the consolidated frame
    pub fn finish(self) -> Result<DataFrame> {
        let series: Vec<Series> = self
            .columns
            .into_iter()
            .map(|(name, values)| values.into_series(&name))
            .collect();
        Ok(DataFrame::new(series)?)
    }
}

/// Parse an integer cell; empty is null and integral floats such as `12.0` are accepted
fn parse_integer(field: &str) -> std::result::Result<Option<i64>, ()> {
    if field.is_empty() {
        return Ok(None);
    }
    if let Ok(value) = field.parse::<i64>() {
        return Ok(Some(value));
    }
    match field.parse::<f64>() {
        Ok(value) if value.is_finite() && value.fract() == 0.0 => Ok(Some(value as i64)),
        _ => Err(()),
    }
}

/// Read every file of `dir` except `placeholder` into one frame
pub fn aggregate_directory(dir: &Path, placeholder: &str) -> Result<DataFrame> {
    let files = RawAggregator::list_files(dir, placeholder)?;
    if files.is_empty() {
        log::warn!("No input files found in {}", dir.display());
    }

    let mut aggregator = RawAggregator::new();
    for file in &files {
        log::info!("Reading file {}", file.display());
        let rows = aggregator.add_file(file)?;
        log::debug!("{} rows read from {}", rows, file.display());
    }

    log::info!(
        "Aggregated {} rows from {} files",
        aggregator.row_count(),
        files.len()
    );
    aggregator.finish()
}
