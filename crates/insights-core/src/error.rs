use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the watch-insights crates.
#[derive(Error, Debug)]
pub enum InsightsError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A CSV document could not be decoded.
    #[error("Failed to read CSV {source_name}: {source}")]
    Csv {
        source_name: String,
        #[source]
        source: csv::Error,
    },

    /// A required column is absent from a dataset header.
    #[error("Missing required column '{column}' in {source_name}")]
    MissingColumn { source_name: String, column: String },

    /// A watch-date cell did not match any recognised format.
    #[error("Invalid timestamp in {source_name} row {row}: {value:?}")]
    InvalidTimestamp {
        source_name: String,
        row: usize,
        value: String,
    },

    /// A numeric cell could not be parsed or is out of range.
    #[error("Invalid value for '{column}' in {source_name} row {row}: {value:?}")]
    InvalidNumber {
        source_name: String,
        column: String,
        row: usize,
        value: String,
    },

    /// A calendar date string (CLI filter) could not be parsed.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// A date range whose start is after its end.
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange { start: String, end: String },

    /// A JSON document could not be parsed or produced.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A language-model request failed for one candidate model.
    #[error("Model request to {model} failed: {message}")]
    ModelRequest { model: String, message: String },

    /// The model chain handed to the summarizer was empty.
    #[error("No model identifiers configured")]
    NoModelsConfigured,

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the insights crates.
pub type Result<T> = std::result::Result<T, InsightsError>;
