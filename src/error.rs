//! Error handling for RAIS processing operations.
//!
//! Provides error types with context for bronze ingestion, column
//! normalization (schema drift) and silver partition writing failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RaisError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Bronze source not found at path: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("No input files found under bronze path: {path}")]
    EmptySource { path: PathBuf },

    #[error(
        "Schema drift: positional rule references column {position} but the input has only {column_count} columns"
    )]
    PositionOutOfBounds {
        position: usize,
        column_count: usize,
    },

    #[error("Schema drift: column '{column}' required by {required_by} is missing")]
    MissingColumn { column: String, required_by: String },

    #[error("Schema drift: renaming would produce duplicate column '{column}'")]
    DuplicateColumn { column: String },

    #[error("Schema drift: column '{column}' is claimed by both '{first}' and '{second}'")]
    AmbiguousColumn {
        column: String,
        first: String,
        second: String,
    },

    #[error("Invalid column mapping: {reason}")]
    InvalidMapping { reason: String },

    #[error("Header parsing failed for file: {path} - {reason}")]
    HeaderParsingFailed { path: PathBuf, reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Processing failed for file: {path} - {reason}")]
    ProcessingFailed { path: PathBuf, reason: String },
}

impl RaisError {
    /// Attach a path to a storage-layer I/O failure
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// True for the fatal family raised when the input no longer matches the mapping
    pub fn is_schema_drift(&self) -> bool {
        matches!(
            self,
            Self::PositionOutOfBounds { .. }
                | Self::MissingColumn { .. }
                | Self::DuplicateColumn { .. }
                | Self::AmbiguousColumn { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RaisError>;
