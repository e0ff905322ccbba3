//! Core data structures and types for RAIS processing.
//!
//! Defines the rule types that make up the static normalization tables
//! and the statistics reported by a run.

use polars::prelude::DataType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How a raw column is identified by a rename rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKey {
    /// Literal (sanitized) header text
    Header(&'static str),
    /// Zero-based column position in the input layout
    Position(usize),
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKey::Header(name) => write!(f, "header '{}'", name),
            ColumnKey::Position(index) => write!(f, "position {}", index),
        }
    }
}

/// One entry of the raw → canonical column mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenameRule {
    pub key: ColumnKey,
    pub canonical: &'static str,
}

impl RenameRule {
    pub const fn header(raw: &'static str, canonical: &'static str) -> Self {
        Self {
            key: ColumnKey::Header(raw),
            canonical,
        }
    }

    pub const fn position(index: usize, canonical: &'static str) -> Self {
        Self {
            key: ColumnKey::Position(index),
            canonical,
        }
    }
}

/// Target type of a cast rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CastTarget {
    /// Plain integer parse
    Int,
    /// Decimal comma replaced by a period, then parsed as a double
    DecimalComma,
}

impl CastTarget {
    /// Polars type the column ends up with
    pub fn data_type(&self) -> DataType {
        match self {
            CastTarget::Int => DataType::Int32,
            CastTarget::DecimalComma => DataType::Float64,
        }
    }
}

/// Coerces one canonical column to a numeric type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastRule {
    pub column: &'static str,
    pub target: CastTarget,
}

impl CastRule {
    pub const fn int(column: &'static str) -> Self {
        Self {
            column,
            target: CastTarget::Int,
        }
    }

    pub const fn decimal_comma(column: &'static str) -> Self {
        Self {
            column,
            target: CastTarget::DecimalComma,
        }
    }
}

/// Values of one cast column that parsed to null
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CastFailure {
    pub column: String,
    pub count: u64,
}

/// What a sink reports once all batches are written
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SinkSummary {
    pub partitions: usize,
    pub files_written: usize,
    pub rows_written: usize,
}

/// Processing statistics
#[derive(Debug, Default, Serialize)]
pub struct ProcessingStats {
    pub files_processed: usize,
    pub total_rows: usize,
    pub null_uf_rows: usize,
    pub values_nulled_by_cast: u64,
    pub partitions_written: usize,
    pub files_written: usize,
    pub output_path: PathBuf,
    pub processing_time_ms: u128,
}
