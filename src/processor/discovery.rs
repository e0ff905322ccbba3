//! File discovery module for the bronze zone
//!
//! Resolves the bronze path into the ordered list of RAIS text files to
//! ingest. The path may name a single file or a directory tree.

use crate::constants::BRONZE_FILE_EXTENSIONS;
use crate::error::{RaisError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// File discovery component for the bronze zone
#[derive(Debug)]
pub struct FileDiscovery {
    source_path: PathBuf,
}

impl FileDiscovery {
    /// Create a new file discovery instance
    pub fn new(source_path: PathBuf) -> Self {
        Self { source_path }
    }

    /// Discover all bronze files, sorted by path
    ///
    /// Spark-style bronze layouts are supported as-is:
    /// ```text
    /// bronze/
    ///   RAIS_VINC_PUB_SP.txt
    ///   RAIS_VINC_PUB_NORDESTE.txt
    ///   extra/
    ///     RAIS_VINC_PUB_NORTE.txt
    /// ```
    /// Hidden files and directories (leading `.` or `_`) are skipped.
    pub fn discover_files(&self) -> Result<Vec<PathBuf>> {
        if !self.source_path.exists() {
            return Err(RaisError::SourceNotFound {
                path: self.source_path.clone(),
            });
        }

        if self.source_path.is_file() {
            return Ok(vec![self.source_path.clone()]);
        }

        debug!("Searching for bronze files in: {}", self.source_path.display());

        let mut files = Vec::new();
        let walker = WalkDir::new(&self.source_path)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.path()));

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.source_path.clone());
                match e.into_io_error() {
                    Some(source) => RaisError::storage(path, source),
                    None => RaisError::ProcessingFailed {
                        path,
                        reason: "filesystem loop while walking bronze directory".to_string(),
                    },
                }
            })?;

            if entry.file_type().is_file() && is_bronze_file(entry.path()) {
                files.push(entry.into_path());
            }
        }

        files.sort();

        if files.is_empty() {
            return Err(RaisError::EmptySource {
                path: self.source_path.clone(),
            });
        }

        debug!("Found {} bronze files", files.len());
        Ok(files)
    }
}

/// Check if a path has one of the bronze file extensions
fn is_bronze_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            BRONZE_FILE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.') || name.starts_with('_'))
}
