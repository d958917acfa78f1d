//! Error types for influence-dash.

use thiserror::Error;

/// Result type for dashboard operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or analysing a dataset.
#[derive(Debug, Error)]
pub enum Error {
    /// The input lacks columns the dataset schema requires.
    #[error("malformed input: missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// The input could not be interpreted as a table.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Too few observations for a seasonal decomposition.
    #[error("insufficient data: need at least {needed} daily observations, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// A multiplicative decomposition met a zero or negative value.
    #[error("series value on {date} is {value}; multiplicative decomposition needs positive values")]
    NonPositiveSeries { date: chrono::NaiveDate, value: f64 },

    /// A column referenced by name does not exist in the table.
    #[error("column not found: {0}")]
    UnknownColumn(String),

    /// A numeric reducer was asked to run over a non-numeric column.
    #[error("column '{0}' is not numeric")]
    NotNumeric(String),

    /// The file extension is not one the loader understands.
    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    /// Configuration could not be read or deserialized.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[cfg(feature = "remote")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Whether the error must stop the whole dashboard rather than a single
    /// section of it.
    pub fn is_blocking(&self) -> bool {
        !matches!(
            self,
            Error::InsufficientData { .. }
                | Error::NonPositiveSeries { .. }
                | Error::UnknownColumn(_)
                | Error::NotNumeric(_)
        )
    }
}
