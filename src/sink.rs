//! Relational sink: replaces a SQLite table with the final dataset

use crate::error::Result;
use polars::prelude::*;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;

/// SQL column type for a frame dtype
fn sql_type(dtype: &DataType) -> &'static str {
    match dtype {
        DataType::Boolean
        | DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => "INTEGER",
        DataType::Float32 | DataType::Float64 => "REAL",
        _ => "TEXT",
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Column values converted to SQL values
fn column_values(series: &Series) -> Result<Vec<Value>> {
    let values = match series.dtype() {
        DataType::Boolean => series
            .bool()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, |b| Value::Integer(b as i64)))
            .collect(),
        dtype if sql_type(dtype) == "INTEGER" => series
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, Value::Integer))
            .collect(),
        dtype if sql_type(dtype) == "REAL" => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, Value::Real))
            .collect(),
        _ => series
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, |s| Value::Text(s.to_string())))
            .collect(),
    };
    Ok(values)
}

/// Writes frames into a SQLite database
pub struct TableSink {
    conn: Connection,
    batch_size: usize,
}

impl TableSink {
    /// Open or create the database at `path`
    pub fn open<P: AsRef<Path>>(path: P, batch_size: usize) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Ok(Self::with_connection(conn, batch_size))
    }

    /// In-memory database (for testing)
    pub fn open_in_memory(batch_size: usize) -> Result<Self> {
        Ok(Self::with_connection(Connection::open_in_memory()?, batch_size))
    }

    fn with_connection(conn: Connection, batch_size: usize) -> Self {
        Self {
            conn,
            batch_size: batch_size.max(1),
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Replace `table` with the contents of `df`.
    ///
    /// Rows go to a staging table in transactions of at most `batch_size`
    /// rows; the staging table then takes the place of `table` in a single
    /// transaction. Returns the number of rows written.
    pub fn replace_table(&mut self, table: &str, df: &DataFrame) -> Result<usize> {
        let staging = format!("{}__staging", table);
        let staging_ident = quote_identifier(&staging);

        let columns = df.get_columns();
        let definitions: Vec<String> = columns
            .iter()
            .map(|s| format!("{} {}", quote_identifier(s.name()), sql_type(s.dtype())))
            .collect();

        self.conn
            .execute(&format!("DROP TABLE IF EXISTS {}", staging_ident), [])?;
        self.conn.execute(
            &format!("CREATE TABLE {} ({})", staging_ident, definitions.join(", ")),
            [],
        )?;

        let placeholders = vec!["?"; columns.len()].join(", ");
        let insert = format!("INSERT INTO {} VALUES ({})", staging_ident, placeholders);

        let height = df.height();
        let mut start = 0;
        while start < height {
            let end = (start + self.batch_size).min(height);
            // Only the current batch is held as SQL values
            let batch = df.slice(start as i64, end - start);
            let values: Vec<Vec<Value>> = batch
                .get_columns()
                .iter()
                .map(column_values)
                .collect::<Result<_>>()?;

            let tx = self.conn.transaction()?;
            {
                let mut stmt = tx.prepare(&insert)?;
                for row in 0..batch.height() {
                    stmt.execute(params_from_iter(values.iter().map(|column| &column[row])))?;
                }
            }
            tx.commit()?;
            log::info!("Inserted rows {}..{} of {}", start, end, height);
            start = end;
        }

        let tx = self.conn.transaction()?;
        tx.execute(&format!("DROP TABLE IF EXISTS {}", quote_identifier(table)), [])?;
        tx.execute(
            &format!(
                "ALTER TABLE {} RENAME TO {}",
                staging_ident,
                quote_identifier(table)
            ),
            [],
        )?;
        tx.commit()?;

        log::info!("Table {} replaced with {} rows", table, height);
        Ok(height)
    }

    pub fn row_count(&self, table: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_identifier(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
