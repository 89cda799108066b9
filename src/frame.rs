//! DataFrame helpers: typed column access and parquet snapshots

use crate::error::{EtlError, Result};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Nullable integer values of a column, casting when the dtype differs
pub fn i64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    let series = df
        .column(name)
        .map_err(|_| EtlError::MissingColumn(name.to_string()))?;
    let series = if series.dtype() == &DataType::Int64 {
        series.clone()
    } else {
        series.cast(&DataType::Int64)?
    };
    Ok(series.i64()?.into_iter().collect())
}

/// Nullable text values of a column, casting when the dtype differs
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df
        .column(name)
        .map_err(|_| EtlError::MissingColumn(name.to_string()))?;
    let series = if series.dtype() == &DataType::String {
        series.clone()
    } else {
        series.cast(&DataType::String)?
    };
    Ok(series
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

/// Fail with `MissingColumn` unless every listed column is present
pub fn require_columns(df: &DataFrame, columns: &[&str]) -> Result<()> {
    for column in columns {
        if df.column(column).is_err() {
            return Err(EtlError::MissingColumn(column.to_string()));
        }
    }
    Ok(())
}

/// Write a snapshot, replacing any previous file only once the write succeeded
pub fn write_snapshot(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let staging = staging_path(path);
    let file = File::create(&staging)?;
    if let Err(e) = ParquetWriter::new(file).finish(df) {
        let _ = fs::remove_file(&staging);
        return Err(e.into());
    }
    fs::rename(&staging, path)?;

    log::info!("Parquet saved as {} ({} rows)", path.display(), df.height());
    Ok(())
}

/// Read a snapshot written by [`write_snapshot`]
pub fn read_snapshot(path: &Path) -> Result<DataFrame> {
    log::info!("Reading {}", path.display());
    let file = File::open(path)?;
    let df = ParquetReader::new(file).finish()?;
    log::info!("Read {} rows from {}", df.height(), path.display());
    Ok(df)
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
