//! Command-line interface components.

use crate::config::{CompressionAlgorithm, RaisConfig};
use crate::error::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug, Clone)]
#[command(name = "rais_processor")]
#[command(about = "Normalize RAIS 2020 bronze text files into uf-partitioned silver Parquet")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Bronze input: a RAIS file or a directory of them (default: data/bronze)
    #[arg(value_name = "SOURCE_PATH")]
    pub source_path: Option<PathBuf>,

    /// Silver output directory, replaced on success (default: data/silver/rais_2020)
    #[arg(short, long)]
    pub output_path: Option<PathBuf>,

    /// JSON job configuration; flags given on the command line take precedence
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Parquet compression algorithm (snappy, zstd, lz4, none)
    #[arg(long)]
    pub compression: Option<String>,

    /// Encoding label of the bronze files (e.g. latin1, utf-8)
    #[arg(long)]
    pub encoding: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Log level implied by the verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }

    /// Build the job configuration: defaults, then the config file, then flags
    pub fn to_config(&self) -> Result<RaisConfig> {
        let mut config = match &self.config {
            Some(path) => RaisConfig::from_json_file(path)?,
            None => RaisConfig::default(),
        };

        if let Some(path) = &self.source_path {
            config = config.with_source_path(path);
        }
        if let Some(path) = &self.output_path {
            config = config.with_output_path(path);
        }
        if let Some(name) = &self.compression {
            config = config.with_compression(CompressionAlgorithm::from_name(name)?);
        }
        if let Some(label) = &self.encoding {
            config = config.with_encoding(label);
        }

        debug!("Effective configuration: {:?}", config);
        Ok(config)
    }
}

/// Set up structured logging on stderr
pub fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rais_processor={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    debug!("Logging initialized at level: {}", log_level);
}
