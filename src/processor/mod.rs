//! Main processing engine with modular architecture.
//!
//! Orchestrates the bronze → silver job: discover the bronze files,
//! normalize each through the [`pipeline::Pipeline`] and publish the
//! uf-partitioned Parquet dataset.

pub mod discovery;
pub mod pipeline;
pub mod source;
pub mod writer;

#[cfg(test)]
pub mod tests;

use self::{
    discovery::FileDiscovery, pipeline::Pipeline, source::BronzeCsvSource,
    writer::PartitionedParquetWriter,
};

use crate::config::RaisConfig;
use crate::error::{RaisError, Result};
use crate::models::ProcessingStats;
use crate::normalizer::ColumnNormalizer;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;
use tokio::task;
use tracing::debug;

/// Main processor for the RAIS 2020 bronze → silver job
#[derive(Debug)]
pub struct JobProcessor {
    config: RaisConfig,
    normalizer: ColumnNormalizer,
    show_progress: bool,
}

impl JobProcessor {
    /// Create a job processor from a validated configuration
    pub fn new(config: RaisConfig) -> Result<Self> {
        config.validate()?;

        if !config.source_path.exists() {
            return Err(RaisError::SourceNotFound {
                path: config.source_path.clone(),
            });
        }

        Ok(Self {
            config,
            normalizer: ColumnNormalizer::rais_2020()?,
            show_progress: true,
        })
    }

    /// Toggle the progress bar (off for tests and quiet runs)
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn config(&self) -> &RaisConfig {
        &self.config
    }

    /// Main processing entry point
    pub async fn process(&self) -> Result<ProcessingStats> {
        let start_time = Instant::now();
        println!("{}", "Starting RAIS 2020 processing".bright_green().bold());
        println!(
            "  {} {}",
            "Bronze:".bright_cyan(),
            self.config.source_path.display()
        );
        println!(
            "  {} {}",
            "Silver:".bright_cyan(),
            self.config.output_path.display()
        );

        // Step 1: Discover bronze files
        println!("\n{}", "Discovering bronze files...".bright_yellow());
        let files = FileDiscovery::new(self.config.source_path.clone()).discover_files()?;
        println!(
            "  {} {} bronze files",
            "Found".bright_green(),
            files.len().to_string().bright_white().bold()
        );

        // Step 2: Normalize and write on a blocking thread
        println!("\n{}", "Processing files...".bright_yellow());
        let mut source = BronzeCsvSource::new(files, &self.config)?;
        let mut sink = PartitionedParquetWriter::new(
            self.config.output_path.clone(),
            self.config.parquet.clone(),
        )?;

        let mut pipeline = Pipeline::new(self.normalizer.clone());
        if self.show_progress {
            pipeline = pipeline.with_progress(create_progress_bar());
        }

        let output_path = self.config.output_path.clone();
        let stats = task::spawn_blocking(move || pipeline.run(&mut source, &mut sink))
            .await
            .map_err(|e| RaisError::ProcessingFailed {
                path: output_path.clone(),
                reason: format!("Processing task failed: {}", e),
            })??;

        let total_time = start_time.elapsed().as_millis();
        print_summary(&stats, total_time);
        debug!("Run statistics: {:?}", stats);

        Ok(ProcessingStats {
            output_path,
            processing_time_ms: total_time,
            ..stats
        })
    }
}

fn create_progress_bar() -> ProgressBar {
    let progress_bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        progress_bar.set_style(style.progress_chars("#>-"));
    }
    progress_bar
}

fn print_summary(stats: &ProcessingStats, total_time: u128) {
    println!("\n{}", "Processing Summary".bright_green().bold());
    println!(
        "  {} {}ms",
        "Time elapsed:".bright_cyan(),
        total_time.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Files processed:".bright_cyan(),
        stats.files_processed.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Total rows:".bright_cyan(),
        stats.total_rows.to_string().bright_white().bold()
    );
    println!(
        "  {} {} ({} files)",
        "Partitions:".bright_cyan(),
        stats.partitions_written.to_string().bright_white(),
        stats.files_written
    );
    if stats.null_uf_rows > 0 {
        println!(
            "  {} {}",
            "Rows without uf:".bright_red(),
            stats.null_uf_rows.to_string().bright_red().bold()
        );
    }
    if stats.values_nulled_by_cast > 0 {
        println!(
            "  {} {}",
            "Values nulled by cast:".bright_red(),
            stats.values_nulled_by_cast.to_string().bright_red().bold()
        );
    }
}
