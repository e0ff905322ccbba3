//! Parquet writing module for the silver zone
//!
//! Writes normalized batches as a Hive-style dataset partitioned by `uf`.
//! Files land in a staging directory next to the destination; the
//! destination is only replaced once every batch has been written, so a
//! failed run leaves the previous silver output untouched.

use crate::config::ParquetConfig;
use crate::constants::{NULL_PARTITION_VALUE, SUCCESS_MARKER, UF_COLUMN};
use crate::error::{RaisError, Result};
use crate::models::SinkSummary;

use polars::prelude::{AnyValue, DataFrame, ParquetWriter as PolarsParquetWriter};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Destination for normalized frames
pub trait RecordSink: Send {
    /// Persist one normalized batch, returning the rows written
    fn write_batch(&mut self, df: DataFrame) -> Result<usize>;

    /// Publish everything written so far
    fn finish(&mut self) -> Result<SinkSummary>;

    /// Discard everything written so far
    fn abort(&mut self);
}

/// Writes `uf=<value>/part-<batch>-<seq>.parquet` files with overwrite semantics
#[derive(Debug)]
pub struct PartitionedParquetWriter {
    output_path: PathBuf,
    staging_path: PathBuf,
    parquet: ParquetConfig,
    batches_written: usize,
    files_written: usize,
    rows_written: usize,
    partitions: HashSet<String>,
    staged: bool,
}

impl PartitionedParquetWriter {
    /// Create a writer targeting `output_path`; nothing touches disk yet
    pub fn new(output_path: PathBuf, parquet: ParquetConfig) -> Result<Self> {
        let staging_path = sibling_path(&output_path, "staging")?;
        Ok(Self {
            output_path,
            staging_path,
            parquet,
            batches_written: 0,
            files_written: 0,
            rows_written: 0,
            partitions: HashSet::new(),
            staged: false,
        })
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn staging_path(&self) -> &Path {
        &self.staging_path
    }

    fn ensure_staging(&mut self) -> Result<()> {
        if self.staged {
            return Ok(());
        }
        if self.staging_path.exists() {
            warn!(
                "Removing leftover staging directory {}",
                self.staging_path.display()
            );
            fs::remove_dir_all(&self.staging_path)
                .map_err(|e| RaisError::storage(&self.staging_path, e))?;
        }
        fs::create_dir_all(&self.staging_path)
            .map_err(|e| RaisError::storage(&self.staging_path, e))?;
        self.staged = true;
        Ok(())
    }

    /// Write one partition frame (still carrying `uf`) to its directory
    fn write_partition(&mut self, mut part: DataFrame, seq: usize) -> Result<usize> {
        let value = partition_value(&part)?;
        part = part.drop(UF_COLUMN)?;

        let dir = self.staging_path.join(format!("{}={}", UF_COLUMN, value));
        fs::create_dir_all(&dir).map_err(|e| RaisError::storage(&dir, e))?;

        let file_path = dir.join(format!(
            "part-{:05}-{:05}.parquet",
            self.batches_written, seq
        ));
        let file = fs::File::create(&file_path).map_err(|e| RaisError::storage(&file_path, e))?;

        PolarsParquetWriter::new(file)
            .with_compression(self.parquet.compression_algorithm.to_polars_compression())
            .with_statistics(self.parquet.statistics())
            .with_row_group_size(self.parquet.row_group_size)
            .finish(&mut part)
            .map_err(|e| RaisError::ProcessingFailed {
                path: file_path.clone(),
                reason: format!("Failed to write parquet partition: {}", e),
            })?;

        debug!("Wrote {} rows to {}", part.height(), file_path.display());
        self.partitions.insert(value);
        self.files_written += 1;
        Ok(part.height())
    }
}

impl RecordSink for PartitionedParquetWriter {
    fn write_batch(&mut self, df: DataFrame) -> Result<usize> {
        if df.get_column_index(UF_COLUMN).is_none() {
            return Err(RaisError::MissingColumn {
                column: UF_COLUMN.to_string(),
                required_by: "partitioned write".to_string(),
            });
        }

        self.ensure_staging()?;

        let mut rows = 0;
        if df.height() > 0 {
            let parts = df.partition_by_stable([UF_COLUMN], true)?;
            for (seq, part) in parts.into_iter().enumerate() {
                rows += self.write_partition(part, seq)?;
            }
        }

        self.batches_written += 1;
        self.rows_written += rows;
        Ok(rows)
    }

    fn finish(&mut self) -> Result<SinkSummary> {
        self.ensure_staging()?;

        let marker = self.staging_path.join(SUCCESS_MARKER);
        fs::File::create(&marker).map_err(|e| RaisError::storage(&marker, e))?;

        // Swap the previous output aside before publishing so the
        // destination is never left half-written
        let previous = sibling_path(&self.output_path, "previous")?;
        if previous.exists() {
            fs::remove_dir_all(&previous).map_err(|e| RaisError::storage(&previous, e))?;
        }
        if self.output_path.exists() {
            debug!("Replacing existing output {}", self.output_path.display());
            fs::rename(&self.output_path, &previous)
                .map_err(|e| RaisError::storage(&self.output_path, e))?;
        }

        if let Err(e) = fs::rename(&self.staging_path, &self.output_path) {
            if previous.exists() {
                restore_previous(&previous, &self.output_path);
            }
            return Err(RaisError::storage(&self.output_path, e));
        }
        self.staged = false;

        if previous.exists() {
            fs::remove_dir_all(&previous).map_err(|e| RaisError::storage(&previous, e))?;
        }

        let summary = SinkSummary {
            partitions: self.partitions.len(),
            files_written: self.files_written,
            rows_written: self.rows_written,
        };
        info!(
            "Published {} rows in {} partitions to {}",
            summary.rows_written,
            summary.partitions,
            self.output_path.display()
        );
        Ok(summary)
    }

    fn abort(&mut self) {
        if self.staging_path.exists() {
            if let Err(e) = fs::remove_dir_all(&self.staging_path) {
                warn!(
                    "Failed to remove staging directory {}: {}",
                    self.staging_path.display(),
                    e
                );
            }
        }
        self.staged = false;
    }
}

/// Partition directory value for a frame holding a single `uf`
fn partition_value(part: &DataFrame) -> Result<String> {
    let value = part.column(UF_COLUMN)?.get(0)?;
    match value {
        AnyValue::Null => Ok(NULL_PARTITION_VALUE.to_string()),
        other => {
            let code = other.try_extract::<i64>()?;
            Ok(code.to_string())
        }
    }
}

/// Move the set-aside output back into place, returning whether it worked
fn restore_previous(previous: &Path, output_path: &Path) -> bool {
    match fs::rename(previous, output_path) {
        Ok(()) => true,
        Err(e) => {
            warn!(
                "Failed to restore previous output from {} to {}: {}",
                previous.display(),
                output_path.display(),
                e
            );
            false
        }
    }
}

/// `<parent>/.<name>.<suffix>`, a hidden directory beside the output
fn sibling_path(output_path: &Path, suffix: &str) -> Result<PathBuf> {
    let name = output_path
        .file_name()
        .ok_or_else(|| RaisError::Configuration {
            message: format!(
                "Output path '{}' has no directory name",
                output_path.display()
            ),
        })?
        .to_string_lossy();
    let parent = output_path.parent().unwrap_or_else(|| Path::new("."));
    Ok(parent.join(format!(".{}.{}", name, suffix)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use tempfile::TempDir;

    fn create_test_writer(temp_dir: &TempDir) -> PartitionedParquetWriter {
        let output_path = temp_dir.path().join("silver").join("rais_2020");
        PartitionedParquetWriter::new(output_path, ParquetConfig::default()).unwrap()
    }

    fn sample_batch() -> DataFrame {
        df!(
            "municipio" => ["3550308", "3304557", "3509502", "1"],
            "idade" => [30, 41, 25, 60],
            "uf" => [Some(35), Some(33), Some(35), None]
        )
        .unwrap()
    }

    fn read_parquet(path: &Path) -> DataFrame {
        ParquetReader::new(fs::File::open(path).unwrap())
            .finish()
            .unwrap()
    }

    #[test]
    fn test_writes_one_directory_per_uf() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = create_test_writer(&temp_dir);

        let rows = writer.write_batch(sample_batch()).unwrap();
        let summary = writer.finish().unwrap();

        assert_eq!(rows, 4);
        assert_eq!(summary.partitions, 3);
        assert_eq!(summary.files_written, 3);
        assert_eq!(summary.rows_written, 4);

        let output = writer.output_path().to_path_buf();
        assert!(output.join(SUCCESS_MARKER).exists());
        assert!(!writer.staging_path().exists());

        let sp = read_parquet(&output.join("uf=35").join("part-00000-00000.parquet"));
        assert_eq!(sp.height(), 2);
        assert!(sp.get_column_index(UF_COLUMN).is_none());

        let null_dir = output.join(format!("uf={}", NULL_PARTITION_VALUE));
        let unknown = read_parquet(&null_dir.join("part-00000-00002.parquet"));
        assert_eq!(unknown.height(), 1);
    }

    #[test]
    fn test_later_batches_get_new_files() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = create_test_writer(&temp_dir);

        writer.write_batch(sample_batch()).unwrap();
        writer.write_batch(sample_batch()).unwrap();
        let summary = writer.finish().unwrap();

        assert_eq!(summary.partitions, 3);
        assert_eq!(summary.files_written, 6);
        let sp_dir = writer.output_path().join("uf=35");
        assert!(sp_dir.join("part-00000-00000.parquet").exists());
        assert!(sp_dir.join("part-00001-00000.parquet").exists());
    }

    #[test]
    fn test_finish_replaces_previous_output() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("silver").join("rais_2020");
        fs::create_dir_all(output.join("uf=99")).unwrap();
        fs::write(output.join("uf=99").join("stale.parquet"), "old").unwrap();

        let mut writer = create_test_writer(&temp_dir);
        writer.write_batch(sample_batch()).unwrap();
        writer.finish().unwrap();

        assert!(!output.join("uf=99").exists());
        assert!(output.join("uf=33").exists());
    }

    #[test]
    fn test_abort_keeps_previous_output() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("silver").join("rais_2020");
        fs::create_dir_all(output.join("uf=99")).unwrap();

        let mut writer = create_test_writer(&temp_dir);
        writer.write_batch(sample_batch()).unwrap();
        assert!(writer.staging_path().exists());
        writer.abort();

        assert!(!writer.staging_path().exists());
        assert!(output.join("uf=99").exists());
        assert!(!output.join("uf=35").exists());
    }

    #[test]
    fn test_missing_uf_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = create_test_writer(&temp_dir);

        let df = df!("municipio" => ["3550308"]).unwrap();
        let err = writer.write_batch(df).unwrap_err();
        assert!(matches!(err, RaisError::MissingColumn { .. }));
    }

    #[test]
    fn test_restore_previous_output() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("rais_2020");
        let previous = temp_dir.path().join(".rais_2020.previous");
        fs::create_dir_all(previous.join("uf=35")).unwrap();

        assert!(restore_previous(&previous, &output));
        assert!(output.join("uf=35").exists());
        assert!(!previous.exists());

        // Nothing left to restore: reported, not panicking
        assert!(!restore_previous(&previous, &output));
        assert!(output.join("uf=35").exists());
    }

    #[test]
    fn test_empty_run_publishes_marker_only() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = create_test_writer(&temp_dir);

        let summary = writer.finish().unwrap();
        assert_eq!(summary, SinkSummary::default());
        assert!(writer.output_path().join(SUCCESS_MARKER).exists());
    }
}
