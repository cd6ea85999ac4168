//! Error types for stats-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in stats-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file (including a missing measurement file)
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File content does not match the expected table layout
    #[error("failed to parse '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    /// CSV parsing error from the csv crate
    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A column required for the merge is absent
    #[error("missing column '{column}' in {path}")]
    MissingColumn { column: String, path: PathBuf },

    /// Merging would produce two columns with the same name
    #[error("duplicate column '{column}' from {path}")]
    DuplicateColumn { column: String, path: PathBuf },

    /// Tables of one domain do not have the same number of rows
    #[error("row count mismatch: expected {expected} rows, found {found} in {path}")]
    RowCountMismatch {
        expected: usize,
        found: usize,
        path: PathBuf,
    },

    /// Index column values disagree between a table and the anchor table
    #[error("index mismatch in column '{column}' at row {row}: expected '{expected}', found '{found}' in {path}")]
    IndexMismatch {
        column: String,
        row: usize,
        expected: String,
        found: String,
        path: PathBuf,
    },

    /// No tables were supplied for a domain
    #[error("no measurement tables for {0} domain")]
    EmptyDomain(String),

    /// Run directory name does not follow the naming contract
    #[error("invalid run name '{name}': {reason}")]
    InvalidRunName { name: String, reason: String },

    /// Two runs of one batch map to the same output file
    #[error("output '{path}' for {run} was already written by {previous}")]
    OutputCollision {
        path: PathBuf,
        run: PathBuf,
        previous: PathBuf,
    },

    /// Experiment configuration is unusable
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for errors caused by a table's shape rather than its text
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Error::MissingColumn { .. }
                | Error::DuplicateColumn { .. }
                | Error::RowCountMismatch { .. }
                | Error::IndexMismatch { .. }
                | Error::EmptyDomain(_)
        )
    }
}
