//! Integration tests for the processor module
//!
//! Runs the complete job over small RAIS-shaped bronze directories.

pub mod error_handling;

use crate::config::RaisConfig;
use crate::test_support::{RAIS_2020_HEADER, rais_file_contents};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Encode text the way the bronze files are stored
pub fn latin1(text: &str) -> Vec<u8> {
    let (bytes, _, had_errors) = encoding_rs::WINDOWS_1252.encode(text);
    assert!(!had_errors);
    bytes.into_owned()
}

/// Write a latin1 RAIS file with the standard header
pub fn write_bronze_file(dir: &Path, name: &str, rows: &[Vec<String>]) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, latin1(&rais_file_contents(&RAIS_2020_HEADER, rows))).unwrap();
    path
}

/// Bronze and silver locations inside a temp dir
pub fn job_config(temp_dir: &TempDir) -> RaisConfig {
    RaisConfig::default()
        .with_source_path(temp_dir.path().join("bronze"))
        .with_output_path(temp_dir.path().join("silver").join("rais_2020"))
}
