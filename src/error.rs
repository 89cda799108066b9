//! Error types for the case-count ETL

use thiserror::Error;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error in {file}: {message}")]
    Csv { file: String, message: String },

    #[error("Parse error in {file} at line {line}, column '{column}': invalid value '{value}'")]
    Parse {
        file: String,
        line: u64,
        column: String,
        value: String,
    },

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Unknown {kind} name: {key}")]
    UnknownCalendarKey { kind: &'static str, key: String },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Group {state}_{municipality} failed: {message}")]
    Group {
        municipality: String,
        state: String,
        message: String,
    },
}

impl From<toml::de::Error> for EtlError {
    fn from(err: toml::de::Error) -> Self {
        EtlError::Config(err.to_string())
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, EtlError>;
