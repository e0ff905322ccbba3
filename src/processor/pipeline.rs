//! Batch normalization pipeline
//!
//! Pulls raw frames from a [`RecordSource`], runs the column normalizer
//! over each and hands the result to a [`RecordSink`]. Any failure aborts
//! the sink, so nothing is published unless every batch succeeded.

use super::source::RecordSource;
use super::writer::RecordSink;
use crate::constants::UF_COLUMN;
use crate::error::Result;
use crate::models::ProcessingStats;
use crate::normalizer::ColumnNormalizer;

use indicatif::ProgressBar;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs the rename, derive and cast steps over every source batch
pub struct Pipeline {
    normalizer: ColumnNormalizer,
    progress: Option<ProgressBar>,
}

impl Pipeline {
    pub fn new(normalizer: ColumnNormalizer) -> Self {
        Self {
            normalizer,
            progress: None,
        }
    }

    /// Report per-batch progress on the given bar
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn normalizer(&self) -> &ColumnNormalizer {
        &self.normalizer
    }

    /// Process the whole source; the sink is published only on success
    pub fn run(
        &self,
        source: &mut dyn RecordSource,
        sink: &mut dyn RecordSink,
    ) -> Result<ProcessingStats> {
        let start_time = Instant::now();

        if let (Some(progress), Some(total)) = (&self.progress, source.len_hint()) {
            progress.set_length(total as u64);
        }

        let result = self.run_batches(source, sink);
        let mut stats = match result {
            Ok(stats) => stats,
            Err(e) => {
                warn!("Run failed, discarding partial output: {}", e);
                sink.abort();
                if let Some(progress) = &self.progress {
                    progress.abandon_with_message("Failed");
                }
                return Err(e);
            }
        };

        let summary = match sink.finish() {
            Ok(summary) => summary,
            Err(e) => {
                sink.abort();
                return Err(e);
            }
        };
        stats.partitions_written = summary.partitions;
        stats.files_written = summary.files_written;
        stats.processing_time_ms = start_time.elapsed().as_millis();

        if let Some(progress) = &self.progress {
            progress.finish_with_message("Done");
        }
        Ok(stats)
    }

    fn run_batches(
        &self,
        source: &mut dyn RecordSource,
        sink: &mut dyn RecordSink,
    ) -> Result<ProcessingStats> {
        let mut stats = ProcessingStats::default();

        info!("Reading bronze data");
        while let Some(batch) = source.next_batch()? {
            if let Some(progress) = &self.progress {
                progress.set_message(batch.label.clone());
            }

            info!("Fixing column names ({})", batch.label);
            let renamed = self.normalizer.rename(batch.frame)?;

            info!("Building uf column");
            let derived = self.normalizer.derive_uf(renamed)?;

            info!("Fixing remuneration columns");
            let failures = self.normalizer.count_cast_failures(derived.clone())?;
            for failure in &failures {
                warn!(
                    "{}: {} values in '{}' could not be parsed and were set to null",
                    batch.label, failure.count, failure.column
                );
                stats.values_nulled_by_cast += failure.count;
            }
            let df = self.normalizer.cast_numeric(derived)?.collect()?;

            let null_uf = df.column(UF_COLUMN)?.null_count();
            if null_uf > 0 {
                warn!(
                    "{}: {} rows have no usable municipio and go to the null uf partition",
                    batch.label, null_uf
                );
            }
            stats.null_uf_rows += null_uf;

            info!("Writing treated data");
            let rows = sink.write_batch(df)?;
            debug!("{}: {} rows written", batch.label, rows);

            stats.total_rows += rows;
            stats.files_processed += 1;
            if let Some(progress) = &self.progress {
                progress.inc(1);
            }
        }

        Ok(stats)
    }
}
