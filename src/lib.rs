//! RAIS Processor Library
//!
//! Normalizes the RAIS 2020 labor registry microdata from the bronze zone
//! (semicolon-delimited latin1 text) into a silver Parquet dataset
//! partitioned by state code.
//!
//! This library provides tools for:
//! - Discovering and transcoding the bronze text files
//! - Renaming raw columns to canonical snake_case names, by header text or position
//! - Deriving the `uf` state code from the municipality code
//! - Repairing decimal-comma remuneration values and casting them to numbers
//! - Writing the uf-partitioned Parquet output with overwrite semantics

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod header;
pub mod models;
pub mod normalizer;
pub mod processor;
pub mod schema;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::{CompressionAlgorithm, ParquetConfig, RaisConfig};
pub use error::{RaisError, Result};
pub use models::{CastRule, CastTarget, ColumnKey, ProcessingStats, RenameRule};
pub use normalizer::ColumnNormalizer;
pub use processor::JobProcessor;
pub use processor::pipeline::Pipeline;
pub use processor::source::{BronzeCsvSource, FrameSource, RecordSource};
pub use processor::writer::{PartitionedParquetWriter, RecordSink};
pub use schema::{ColumnMapping, RAIS_2020_CASTS, RAIS_2020_RENAMES};
