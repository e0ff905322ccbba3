//! Configuration management and validation.
//!
//! Provides the job configuration (storage zones, input format) and the
//! Parquet output settings. Defaults reproduce the fixed behaviour of the
//! batch job; a JSON file or CLI flags may override them.

use crate::constants::{
    DEFAULT_BRONZE_PATH, DEFAULT_DELIMITER, DEFAULT_ENCODING, DEFAULT_SILVER_PATH,
};
use crate::error::{RaisError, Result};
use encoding_rs::Encoding;
use polars::prelude::{ParquetCompression, StatisticsOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Supported compression algorithms for parquet files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionAlgorithm {
    /// Snappy compression - good balance of speed and compression
    Snappy,
    /// ZSTD compression - better compression ratio, slower
    Zstd,
    /// LZ4 compression - fastest, lower compression ratio
    Lz4,
    /// No compression
    Uncompressed,
}

impl CompressionAlgorithm {
    /// Convert to polars ParquetCompression type
    pub fn to_polars_compression(&self) -> ParquetCompression {
        match self {
            CompressionAlgorithm::Snappy => ParquetCompression::Snappy,
            CompressionAlgorithm::Zstd => ParquetCompression::Zstd(None),
            CompressionAlgorithm::Lz4 => ParquetCompression::Lz4Raw,
            CompressionAlgorithm::Uncompressed => ParquetCompression::Uncompressed,
        }
    }

    /// Parse a CLI compression name
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "snappy" => Ok(Self::Snappy),
            "zstd" => Ok(Self::Zstd),
            "lz4" => Ok(Self::Lz4),
            "none" | "uncompressed" => Ok(Self::Uncompressed),
            other => Err(RaisError::Configuration {
                message: format!(
                    "Unknown compression '{}' (expected snappy, zstd, lz4 or none)",
                    other
                ),
            }),
        }
    }
}

/// Parquet output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParquetConfig {
    /// Compression algorithm selection
    pub compression_algorithm: CompressionAlgorithm,

    /// Enable column statistics for query pruning
    pub enable_statistics: bool,

    /// Rows per row group (None = writer default)
    pub row_group_size: Option<usize>,
}

impl Default for ParquetConfig {
    fn default() -> Self {
        Self {
            compression_algorithm: CompressionAlgorithm::Snappy,
            enable_statistics: true,
            row_group_size: None,
        }
    }
}

impl ParquetConfig {
    pub fn statistics(&self) -> StatisticsOptions {
        if self.enable_statistics {
            StatisticsOptions::full()
        } else {
            StatisticsOptions::empty()
        }
    }
}

/// Global configuration for the RAIS job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RaisConfig {
    /// Bronze zone: a RAIS file or a directory of them
    pub source_path: PathBuf,

    /// Silver zone destination, replaced on every successful run
    pub output_path: PathBuf,

    /// Field delimiter of the bronze files
    pub delimiter: u8,

    /// Encoding label of the bronze files (WHATWG label, e.g. "latin1")
    pub encoding: String,

    /// Parquet output settings
    pub parquet: ParquetConfig,
}

impl Default for RaisConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from(DEFAULT_BRONZE_PATH),
            output_path: PathBuf::from(DEFAULT_SILVER_PATH),
            delimiter: DEFAULT_DELIMITER,
            encoding: DEFAULT_ENCODING.to_string(),
            parquet: ParquetConfig::default(),
        }
    }
}

impl RaisConfig {
    /// Load configuration from a JSON file; missing fields keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| RaisError::storage(path, e))?;
        let config: Self =
            serde_json::from_str(&contents).map_err(|e| RaisError::Configuration {
                message: format!("Invalid config file {}: {}", path.display(), e),
            })?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Set the bronze source path
    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = path.into();
        self
    }

    /// Set the silver output path
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    /// Set the input encoding label
    pub fn with_encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = label.into();
        self
    }

    /// Set the parquet compression algorithm
    pub fn with_compression(mut self, compression: CompressionAlgorithm) -> Self {
        self.parquet.compression_algorithm = compression;
        self
    }

    /// Resolve the configured encoding label
    pub fn resolve_encoding(&self) -> Result<&'static Encoding> {
        Encoding::for_label(self.encoding.trim().as_bytes()).ok_or_else(|| {
            RaisError::Configuration {
                message: format!("Unknown encoding '{}'", self.encoding),
            }
        })
    }

    /// Check the configuration before any I/O happens
    pub fn validate(&self) -> Result<()> {
        if !self.delimiter.is_ascii() || self.delimiter == b'\n' || self.delimiter == b'"' {
            return Err(RaisError::Configuration {
                message: format!("Invalid delimiter byte 0x{:02x}", self.delimiter),
            });
        }
        if self.output_path.as_os_str().is_empty() || self.output_path.parent().is_none() {
            return Err(RaisError::Configuration {
                message: format!(
                    "Output path '{}' must name a directory below a parent",
                    self.output_path.display()
                ),
            });
        }
        if self.output_path.starts_with(&self.source_path) {
            return Err(RaisError::Configuration {
                message: "Output path must not be inside the bronze source path".to_string(),
            });
        }
        self.resolve_encoding()?;
        Ok(())
    }
}
